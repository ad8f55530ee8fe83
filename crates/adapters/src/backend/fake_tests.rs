// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use flux_core::TaskId;
use std::time::Duration;

#[tokio::test]
async fn default_result_is_done() {
    let backend = FakeBackend::new("claude-cli");
    let result = backend
        .execute(ExecuteRequest::new(TaskId::new("t-1"), "go"))
        .await;
    assert!(result.ok());
    assert_eq!(backend.call_count(), 1);
    assert_eq!(backend.calls()[0].prompt, "go");
}

#[tokio::test]
async fn scripted_failure_is_returned() {
    let backend = FakeBackend::new("claude-cli");
    backend.fail_task("t-1", "scripted");
    let result = backend
        .execute(ExecuteRequest::new(TaskId::new("t-1"), "go"))
        .await;
    assert_eq!(result.status, ExecStatus::Failed);
    assert_eq!(result.output, "scripted");
}

#[tokio::test]
async fn held_execution_blocks_until_released() {
    let backend = FakeBackend::new("claude-cli");
    backend.hold_executions();

    let clone = backend.clone();
    let task = tokio::spawn(async move {
        clone
            .execute(ExecuteRequest::new(TaskId::new("t-1"), "go"))
            .await
    });

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!task.is_finished(), "execution should be held");

    backend.release("t-1");
    let result = tokio::time::timeout(Duration::from_secs(2), task)
        .await
        .unwrap()
        .unwrap();
    assert!(result.ok());
}

#[tokio::test]
async fn held_execution_honors_cancellation() {
    let backend = FakeBackend::new("claude-cli");
    backend.hold_executions();

    let req = ExecuteRequest::new(TaskId::new("t-1"), "go");
    let cancel = req.cancel.clone();
    let clone = backend.clone();
    let task = tokio::spawn(async move { clone.execute(req).await });

    tokio::time::sleep(Duration::from_millis(20)).await;
    cancel.cancel();
    let result = tokio::time::timeout(Duration::from_secs(2), task)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(result.status, ExecStatus::Cancelled);
}
