// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Feedback worker.
//!
//! Delivers pending task-status notifications to external systems,
//! at-least-once. Every pending event ends in exactly one terminal state:
//! `sent` (delivered, or skipped on purpose) or `dead_letter` (the store
//! exhausted the retry budget after repeated failures).

use flux_adapters::{format_status_comment, GatewayClient, GoldenPathConfig};
use flux_core::{FeedbackEvent, FeedbackPayload, FeedbackTopic, Integration, Task};
use flux_store::Store;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Tunables for the feedback worker.
#[derive(Debug, Clone)]
pub struct FeedbackWorkerConfig {
    pub poll_every: Duration,
    pub batch_limit: usize,
    pub max_backoff: Duration,
}

impl Default for FeedbackWorkerConfig {
    fn default() -> Self {
        Self {
            poll_every: Duration::from_secs(30),
            batch_limit: 20,
            max_backoff: Duration::from_secs(15 * 60),
        }
    }
}

/// Why an event did not produce an outbound post.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Delivery {
    Posted,
    Skipped(&'static str),
}

/// Periodic deliverer of pending feedback events. Cheap to clone; clones
/// share all state.
pub struct FeedbackWorker<S> {
    store: Arc<S>,
    gateway: Arc<GatewayClient>,
    repo_workspace_root: Option<PathBuf>,
    config: FeedbackWorkerConfig,
    failures: Arc<AtomicU32>,
    cancel: CancellationToken,
}

impl<S> Clone for FeedbackWorker<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            gateway: Arc::clone(&self.gateway),
            repo_workspace_root: self.repo_workspace_root.clone(),
            config: self.config.clone(),
            failures: Arc::clone(&self.failures),
            cancel: self.cancel.clone(),
        }
    }
}

/// Resolve `(owner, repo, issue_number)` for a feedback event.
///
/// Order: payload resource id, the task input's `intake.resourceId`, then
/// the integration's configured owner/repo with the payload issue number.
pub(crate) fn resolve_target(
    payload: &FeedbackPayload,
    task_input: Option<&str>,
    integration: &Integration,
) -> Option<(String, String, u64)> {
    if let Some(rid) = &payload.resource_id {
        if let Some(target) = parse_resource_id(rid, payload.issue_number) {
            return Some(target);
        }
    }

    if let Some(input) = task_input {
        if let Ok(value) = serde_json::from_str::<Value>(input) {
            if let Some(rid) = value.pointer("/intake/resourceId").and_then(Value::as_str) {
                if let Some(target) = parse_resource_id(rid, payload.issue_number) {
                    return Some(target);
                }
            }
        }
    }

    let owner = integration.config_str("owner")?;
    let repo = integration.config_str("repo")?;
    Some((owner.to_string(), repo.to_string(), payload.issue_number?))
}

/// Parse `owner/repo#N` (the `#N` may instead come from the payload).
fn parse_resource_id(rid: &str, fallback_issue: Option<u64>) -> Option<(String, String, u64)> {
    let (repo_part, issue_from_rid) = match rid.split_once('#') {
        Some((repo_part, n)) => (repo_part, n.parse::<u64>().ok()),
        None => (rid, None),
    };
    let (owner, repo) = repo_part.split_once('/')?;
    let issue = issue_from_rid.or(fallback_issue)?;
    Some((owner.to_string(), repo.to_string(), issue))
}

impl<S: Store> FeedbackWorker<S> {
    pub fn new(
        store: Arc<S>,
        gateway: Arc<GatewayClient>,
        repo_workspace_root: Option<PathBuf>,
        config: FeedbackWorkerConfig,
    ) -> Self {
        Self {
            store,
            gateway,
            repo_workspace_root,
            config,
            failures: Arc::new(AtomicU32::new(0)),
            cancel: CancellationToken::new(),
        }
    }

    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// Run the delivery loop until stopped.
    pub fn start(&self) {
        let worker = self.clone();
        tokio::spawn(async move {
            loop {
                let failures = worker.failures.load(Ordering::Relaxed);
                let delay = crate::intake::backoff_delay(
                    worker.config.poll_every,
                    failures,
                    worker.config.max_backoff,
                );
                tokio::select! {
                    _ = worker.cancel.cancelled() => break,
                    _ = tokio::time::sleep(delay) => {}
                }
                let clean = worker.process_batch().await;
                if clean {
                    worker.failures.store(0, Ordering::Relaxed);
                } else {
                    worker.failures.fetch_add(1, Ordering::Relaxed);
                }
            }
        });
    }

    /// Process one batch of pending events. Returns `true` when the batch
    /// itself was processed (individual deliveries may still have failed
    /// and been marked for retry).
    pub async fn process_batch(&self) -> bool {
        let events = match self
            .store
            .list_pending_feedback(self.config.batch_limit)
            .await
        {
            Ok(events) => events,
            Err(e) => {
                tracing::warn!(error = %e, "failed to list pending feedback");
                return false;
            }
        };

        let mut clean = true;
        for event in &events {
            match self.deliver(event).await {
                Ok(outcome) => {
                    if let Delivery::Skipped(reason) = &outcome {
                        tracing::debug!(event = %event.id, reason, "feedback skipped");
                    }
                    if let Err(e) = self.store.process_feedback_by_id(&event.id).await {
                        tracing::warn!(event = %event.id, error = %e, "failed to mark sent");
                        clean = false;
                    }
                }
                Err(message) => {
                    tracing::warn!(event = %event.id, error = %message, "delivery failed");
                    match self.store.mark_delivery_failure(&event.id, &message).await {
                        Ok(status) => {
                            tracing::debug!(event = %event.id, status = ?status, "failure recorded");
                        }
                        Err(e) => {
                            tracing::warn!(event = %event.id, error = %e, "failed to record failure");
                            clean = false;
                        }
                    }
                }
            }
        }
        clean
    }

    /// Attempt one delivery. `Ok` outcomes are terminal (`sent`); `Err`
    /// feeds the retry/dead-letter bookkeeping.
    pub(crate) async fn deliver(&self, event: &FeedbackEvent) -> Result<Delivery, String> {
        let payload = event.payload();

        if event.topic != FeedbackTopic::Task || payload.to_status.is_none() {
            return Ok(Delivery::Skipped("not a task status change"));
        }

        let Some(integration_id) = &event.integration_id else {
            return Ok(Delivery::Skipped("no integration"));
        };
        let integration = self
            .store
            .get_integration(integration_id)
            .await
            .map_err(|e| e.to_string())?;
        let Some(integration) = integration else {
            return Ok(Delivery::Skipped("integration missing"));
        };
        if !integration.enabled || integration.kind != "github" {
            return Ok(Delivery::Skipped("integration disabled or unsupported"));
        }

        let task: Option<Task> = match &event.task_id {
            Some(task_id) => self
                .store
                .get_task(task_id)
                .await
                .map_err(|e| e.to_string())?,
            None => None,
        };

        let Some((owner, repo, issue_number)) = resolve_target(
            &payload,
            task.as_ref().map(|t| t.input.as_str()),
            &integration,
        ) else {
            return Ok(Delivery::Skipped("no issue target"));
        };

        // Per-repo opt-in gate.
        let repo_root = match &event.task_id {
            Some(task_id) => self
                .store
                .get_execution_repo_context(task_id)
                .await
                .map_err(|e| e.to_string())?
                .and_then(|ctx| ctx.repo_path),
            None => None,
        };
        let repo_root = repo_root.or_else(|| {
            self.repo_workspace_root
                .as_ref()
                .map(|root| root.join(&repo))
        });
        let opted_in = repo_root
            .as_deref()
            .and_then(GoldenPathConfig::load)
            .map(|config| config.post_task_status_comments())
            .unwrap_or(false);
        if !opted_in {
            return Ok(Delivery::Skipped("repo not opted in"));
        }

        // `doing` transitions are noise.
        if payload.status.as_deref() == Some("doing") {
            return Ok(Delivery::Skipped("doing transitions are not posted"));
        }

        let task_label = payload
            .goal
            .clone()
            .or_else(|| task.as_ref().and_then(|t| t.goal.clone()))
            .or_else(|| event.task_id.as_ref().map(|id| id.to_string()))
            .unwrap_or_else(|| event.id.to_string());
        let to_status = payload.to_status.clone().unwrap_or_default();
        let body = format_status_comment(
            &task_label,
            payload.from_status.as_deref(),
            &to_status,
            event.id.as_str(),
            payload.output.as_deref(),
        );

        self.gateway
            .invoke(
                "github.postIssueComment",
                json!({
                    "owner": owner,
                    "repo": repo,
                    "issueNumber": issue_number,
                    "body": body,
                }),
            )
            .await
            .map_err(|e| e.to_string())?;

        Ok(Delivery::Posted)
    }
}

#[cfg(test)]
#[path = "feedback_tests.rs"]
mod tests;
