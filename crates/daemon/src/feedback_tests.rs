// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use flux_core::{DeliveryStatus, FeedbackEventId, IntegrationId, TaskId};
use flux_store::{FakeStore, RepoContext};

fn github_integration(enabled: bool) -> Integration {
    Integration {
        id: IntegrationId::new("int-1"),
        kind: "github".to_string(),
        config: serde_json::json!({"owner": "acme", "repo": "api"}),
        intake_cursor: None,
        enabled,
        last_error: None,
    }
}

fn status_event(payload: Value) -> FeedbackEvent {
    FeedbackEvent {
        id: FeedbackEventId::new("fb-1"),
        topic: FeedbackTopic::Task,
        event_type: "task.status_changed".to_string(),
        payload_json: payload.to_string(),
        delivery: DeliveryStatus::Pending,
        attempts: 0,
        task_id: Some(TaskId::new("t-1")),
        integration_id: Some(IntegrationId::new("int-1")),
    }
}

fn opted_in_repo() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join(".flux")).unwrap();
    std::fs::write(
        dir.path().join(".flux/golden-path.yaml"),
        "feedback:\n  github:\n    postTaskStatusComments: true\n",
    )
    .unwrap();
    dir
}

fn worker(store: &FakeStore) -> FeedbackWorker<FakeStore> {
    FeedbackWorker::new(
        Arc::new(store.clone()),
        // Unroutable: any actual post attempt fails fast.
        Arc::new(GatewayClient::new("http://127.0.0.1:1", "test-token")),
        None,
        FeedbackWorkerConfig::default(),
    )
}

#[test]
fn target_prefers_payload_resource_id() {
    let payload: FeedbackPayload = serde_json::from_value(serde_json::json!({
        "resourceId": "acme/api#12",
        "issueNumber": 99
    }))
    .unwrap();
    let target = resolve_target(&payload, None, &github_integration(true)).unwrap();
    assert_eq!(target, ("acme".to_string(), "api".to_string(), 12));
}

#[test]
fn target_uses_payload_issue_number_when_rid_has_none() {
    let payload: FeedbackPayload = serde_json::from_value(serde_json::json!({
        "resourceId": "acme/api",
        "issueNumber": 7
    }))
    .unwrap();
    let target = resolve_target(&payload, None, &github_integration(true)).unwrap();
    assert_eq!(target.2, 7);
}

#[test]
fn target_falls_back_to_task_input() {
    let payload = FeedbackPayload::default();
    let input = r#"{"intake":{"resourceId":"acme/api#33"}}"#;
    let target = resolve_target(&payload, Some(input), &github_integration(true)).unwrap();
    assert_eq!(target, ("acme".to_string(), "api".to_string(), 33));
}

#[test]
fn target_falls_back_to_integration_config() {
    let payload: FeedbackPayload =
        serde_json::from_value(serde_json::json!({"issueNumber": 5})).unwrap();
    let target = resolve_target(&payload, None, &github_integration(true)).unwrap();
    assert_eq!(target, ("acme".to_string(), "api".to_string(), 5));
}

#[test]
fn target_unresolvable_without_issue_number() {
    let payload = FeedbackPayload::default();
    assert!(resolve_target(&payload, None, &github_integration(true)).is_none());
}

#[tokio::test]
async fn non_status_events_are_skipped() {
    let store = FakeStore::new();
    store.add_integration(github_integration(true));
    let worker = worker(&store);

    let mut event = status_event(serde_json::json!({}));
    event.topic = FeedbackTopic::Run;
    let outcome = worker.deliver(&event).await.unwrap();
    assert!(matches!(outcome, Delivery::Skipped(_)));
}

#[tokio::test]
async fn disabled_integration_is_skipped() {
    let store = FakeStore::new();
    store.add_integration(github_integration(false));
    let worker = worker(&store);

    let event = status_event(serde_json::json!({"toStatus": "done", "issueNumber": 1}));
    let outcome = worker.deliver(&event).await.unwrap();
    assert_eq!(
        outcome,
        Delivery::Skipped("integration disabled or unsupported")
    );
}

#[tokio::test]
async fn repo_without_opt_in_is_skipped() {
    let store = FakeStore::new();
    store.add_integration(github_integration(true));
    let worker = worker(&store);

    // No repo context and no workspace root: gate stays closed.
    let event = status_event(serde_json::json!({"toStatus": "done", "issueNumber": 1}));
    let outcome = worker.deliver(&event).await.unwrap();
    assert_eq!(outcome, Delivery::Skipped("repo not opted in"));
}

#[tokio::test]
async fn doing_transitions_are_noise_filtered() {
    let store = FakeStore::new();
    store.add_integration(github_integration(true));
    let repo = opted_in_repo();
    store.set_repo_context(
        TaskId::new("t-1"),
        RepoContext {
            repo_path: Some(repo.path().to_path_buf()),
            owner: None,
            repo: None,
        },
    );
    let worker = worker(&store);

    let event = status_event(serde_json::json!({
        "status": "doing",
        "toStatus": "doing",
        "issueNumber": 1
    }));
    let outcome = worker.deliver(&event).await.unwrap();
    assert_eq!(
        outcome,
        Delivery::Skipped("doing transitions are not posted")
    );
}

#[tokio::test]
async fn skipped_events_are_marked_sent() {
    let store = FakeStore::new();
    store.add_integration(github_integration(true));
    store.add_feedback(status_event(
        serde_json::json!({"toStatus": "done", "issueNumber": 1}),
    ));
    let worker = worker(&store);

    assert!(worker.process_batch().await);
    let event = store.feedback_event(&FeedbackEventId::new("fb-1")).unwrap();
    assert_eq!(event.delivery, DeliveryStatus::Sent);
}

#[tokio::test]
async fn repeated_failures_reach_dead_letter() {
    let store = FakeStore::new().with_feedback_max_attempts(3);
    store.add_integration(github_integration(true));
    let repo = opted_in_repo();
    store.set_repo_context(
        TaskId::new("t-1"),
        RepoContext {
            repo_path: Some(repo.path().to_path_buf()),
            owner: None,
            repo: None,
        },
    );
    // Posting will hit the unroutable gateway and fail each time.
    store.add_feedback(status_event(
        serde_json::json!({"toStatus": "done", "issueNumber": 1, "output": "logs"}),
    ));
    let worker = worker(&store);

    for _ in 0..3 {
        worker.process_batch().await;
    }

    let event = store.feedback_event(&FeedbackEventId::new("fb-1")).unwrap();
    assert_eq!(event.delivery, DeliveryStatus::DeadLetter);
    assert_eq!(event.attempts, 3);
}
