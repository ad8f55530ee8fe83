// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use flux_core::{FeedbackTopic, Task};

fn todo_task(id: &str) -> Task {
    Task::new(TaskId::new(id), "claude-cli", "{}")
}

#[tokio::test]
async fn update_status_enforces_transition_graph() {
    let store = FakeStore::new();
    store.add_task(todo_task("t-1"));

    let err = store
        .update_task_status(&TaskId::new("t-1"), TaskStatus::Done)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::InvalidTransition(_)));

    store
        .update_task_status(&TaskId::new("t-1"), TaskStatus::Doing)
        .await
        .unwrap();
    let task = store.task(&TaskId::new("t-1")).unwrap();
    assert_eq!(task.status, TaskStatus::Doing);
    assert!(task.started_at_ms.is_some());
}

#[tokio::test]
async fn subscription_receives_ready_snapshots() {
    let store = FakeStore::new();
    let mut rx = store.subscribe_ready_tasks();

    store.create_task(todo_task("t-1")).await.unwrap();
    let snapshot = rx.recv().await.unwrap();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].id, "t-1");

    // Claiming the task shrinks the ready set and notifies again.
    store
        .update_task_status(&TaskId::new("t-1"), TaskStatus::Doing)
        .await
        .unwrap();
    let snapshot = rx.recv().await.unwrap();
    assert!(snapshot.is_empty());
}

#[tokio::test]
async fn scripted_failures_are_consumed() {
    let store = FakeStore::new();
    store.fail_times("streams.list", 2);
    assert!(store.list_streams().await.is_err());
    assert!(store.list_streams().await.is_err());
    assert!(store.list_streams().await.is_ok());
}

#[tokio::test]
async fn delivery_failure_dead_letters_after_budget() {
    let store = FakeStore::new().with_feedback_max_attempts(2);
    let id = FeedbackEventId::new("f-1");
    store.add_feedback(FeedbackEvent {
        id: id.clone(),
        topic: FeedbackTopic::Task,
        event_type: "task.status_changed".to_string(),
        payload_json: "{}".to_string(),
        delivery: DeliveryStatus::Pending,
        attempts: 0,
        task_id: None,
        integration_id: None,
    });

    let status = store.mark_delivery_failure(&id, "boom").await.unwrap();
    assert_eq!(status, DeliveryStatus::Failed);
    let status = store.mark_delivery_failure(&id, "boom").await.unwrap();
    assert_eq!(status, DeliveryStatus::DeadLetter);

    // Dead-lettered events are no longer listed as pending.
    let pending = store.list_pending_feedback(10).await.unwrap();
    assert!(pending.is_empty());
}

#[tokio::test]
async fn create_and_await_returns_settled_task() {
    let store = FakeStore::new();
    let waiter = {
        let store = store.clone();
        tokio::spawn(async move {
            crate::client::create_and_await_task(
                &store,
                todo_task("t-1"),
                std::time::Duration::from_secs(5),
                std::time::Duration::from_millis(10),
            )
            .await
        })
    };

    // Let the create land, then drive the task to done.
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    store
        .update_task_status(&TaskId::new("t-1"), TaskStatus::Doing)
        .await
        .unwrap();
    store
        .update_task_status(&TaskId::new("t-1"), TaskStatus::Done)
        .await
        .unwrap();

    let task = waiter.await.unwrap().unwrap();
    assert_eq!(task.status, TaskStatus::Done);
}

#[tokio::test]
async fn create_and_await_times_out() {
    let store = FakeStore::new();
    let result = crate::client::create_and_await_task(
        &store,
        todo_task("t-1"),
        std::time::Duration::from_millis(50),
        std::time::Duration::from_millis(10),
    )
    .await;
    assert!(matches!(result, Err(StoreError::AwaitTimeout(_))));
}

#[tokio::test]
async fn playbook_lookup_prefers_stream_scope() {
    let store = FakeStore::new();
    let stream = StreamId::new("s-1");
    store.add_playbook(Playbook {
        id: "p-global".to_string(),
        slug: "triage".to_string(),
        stream_id: None,
        status: "active".to_string(),
    });
    store.add_playbook(Playbook {
        id: "p-scoped".to_string(),
        slug: "triage".to_string(),
        stream_id: Some(stream.clone()),
        status: "active".to_string(),
    });

    let scoped = store
        .get_playbook_by_slug("triage", Some(&stream))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(scoped.id, "p-scoped");

    let global = store
        .get_playbook_by_slug("triage", Some(&StreamId::new("other")))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(global.id, "p-global");
}
