// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use flux_core::TaskId;
use std::path::PathBuf;
use std::time::Duration;

/// Write an executable shell script standing in for an agent CLI.
fn fake_agent(dir: &tempfile::TempDir, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;
    let path = dir.path().join("agent.sh");
    std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();
    path
}

fn request() -> ExecuteRequest {
    ExecuteRequest::new(TaskId::new("t-1"), "do the thing")
}

#[tokio::test]
async fn successful_run_parses_envelope() {
    let dir = tempfile::tempdir().unwrap();
    let bin = fake_agent(
        &dir,
        r#"echo '{"result":"{\"x\":1}","usage":{"input_tokens":1,"output_tokens":2},"total_cost_usd":0.5}'"#,
    );
    let backend = CliBackend::new("claude-cli", bin.display().to_string());

    let result = backend.execute(request()).await;
    assert_eq!(result.status, ExecStatus::Done);
    assert_eq!(result.output, r#"{"x":1}"#);
    assert_eq!(result.tokens_used, Some(3));
    assert_eq!(result.cost_usd, Some(0.5));
}

#[tokio::test]
async fn nonzero_exit_reports_stderr() {
    let dir = tempfile::tempdir().unwrap();
    let bin = fake_agent(&dir, "echo boom >&2; exit 3");
    let backend = CliBackend::new("claude-cli", bin.display().to_string());

    let result = backend.execute(request()).await;
    assert_eq!(result.status, ExecStatus::Failed);
    assert!(result.output.contains("boom"), "output: {}", result.output);
    assert!(result.output.contains('3'), "output: {}", result.output);
}

#[tokio::test]
async fn missing_binary_fails_cleanly() {
    let backend = CliBackend::new("claude-cli", "/nonexistent/agent-bin");
    let result = backend.execute(request()).await;
    assert_eq!(result.status, ExecStatus::Failed);
    assert!(result.output.contains("failed to spawn"));
}

#[tokio::test]
async fn cancellation_terminates_subprocess() {
    let dir = tempfile::tempdir().unwrap();
    let bin = fake_agent(&dir, "sleep 30");
    let backend = CliBackend::new("claude-cli", bin.display().to_string());

    let req = request();
    let cancel = req.cancel.clone();
    let exec = tokio::spawn(async move { backend.execute(req).await });

    tokio::time::sleep(Duration::from_millis(100)).await;
    cancel.cancel();

    let result = tokio::time::timeout(Duration::from_secs(5), exec)
        .await
        .expect("execution should end promptly after SIGTERM")
        .unwrap();
    assert_eq!(result.status, ExecStatus::Cancelled);
    assert_eq!(result.output, "Cancelled by user request");
}

#[tokio::test]
async fn timeout_fails_the_execution() {
    let dir = tempfile::tempdir().unwrap();
    let bin = fake_agent(&dir, "sleep 30");
    let backend = CliBackend::new("claude-cli", bin.display().to_string());

    let mut req = request();
    req.timeout = Duration::from_millis(100);

    let result = tokio::time::timeout(Duration::from_secs(5), backend.execute(req))
        .await
        .expect("execution should end promptly after timeout");
    assert_eq!(result.status, ExecStatus::Failed);
    assert!(result.output.contains("timed out"), "output: {}", result.output);
}
