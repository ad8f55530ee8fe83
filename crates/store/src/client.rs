// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `Store` trait: one method per endpoint the runtime uses.
//!
//! The live `ready-tasks` relationship is modeled as a channel of ready-task
//! snapshots with a single reader; implementations decide how snapshots are
//! produced (the HTTP client polls, the fake pushes on mutation).

use crate::error::StoreError;
use crate::types::{
    CronTrigger, IntegrationPatch, NewRun, PacketFilter, Playbook, RepoContext, StatusCounts,
    Stream,
};
use async_trait::async_trait;
use flux_core::{
    DeliveryStatus, FeedbackEvent, FeedbackEventId, Integration, IntegrationId, NewIntakeEvent,
    RunId, StreamId, Task, TaskId, TaskPacket, TaskStatus,
};
use tokio::sync::mpsc;

/// Typed access to the remote state store.
#[async_trait]
pub trait Store: Send + Sync + 'static {
    // -- tasks --
    async fn get_ready_tasks(&self) -> Result<Vec<Task>, StoreError>;
    async fn count_by_status(&self) -> Result<StatusCounts, StoreError>;
    async fn get_task(&self, id: &TaskId) -> Result<Option<Task>, StoreError>;
    async fn create_task(&self, task: Task) -> Result<TaskId, StoreError>;
    /// Apply a status transition. Implementations enforce the allowed
    /// transition graph and reject anything else.
    async fn update_task_status(&self, id: &TaskId, to: TaskStatus) -> Result<(), StoreError>;
    async fn get_execution_repo_context(
        &self,
        id: &TaskId,
    ) -> Result<Option<RepoContext>, StoreError>;
    /// Page of todo tasks in packet format, for the drain loop.
    async fn list_todo_packets(&self, filter: &PacketFilter)
        -> Result<Vec<TaskPacket>, StoreError>;

    // -- streams / playbooks / runs --
    async fn list_streams(&self) -> Result<Vec<Stream>, StoreError>;
    /// Stream-scoped playbook first, then global.
    async fn get_playbook_by_slug(
        &self,
        slug: &str,
        stream_id: Option<&StreamId>,
    ) -> Result<Option<Playbook>, StoreError>;
    async fn get_enabled_cron_triggers(&self) -> Result<Vec<CronTrigger>, StoreError>;
    async fn create_run(&self, run: NewRun) -> Result<RunId, StoreError>;

    // -- scoped + admin key/value --
    async fn memory_kv_get(
        &self,
        stream_id: &StreamId,
        namespace: &str,
        key: &str,
    ) -> Result<Option<String>, StoreError>;
    async fn memory_kv_upsert(
        &self,
        stream_id: &StreamId,
        namespace: &str,
        key: &str,
        value: &str,
    ) -> Result<(), StoreError>;
    async fn admin_get_value(&self, key: &str) -> Result<Option<String>, StoreError>;
    async fn admin_set_value(&self, key: &str, value: &str) -> Result<(), StoreError>;

    // -- integrations / intake --
    async fn list_integrations(&self, only_enabled: bool) -> Result<Vec<Integration>, StoreError>;
    async fn get_integration(
        &self,
        id: &IntegrationId,
    ) -> Result<Option<Integration>, StoreError>;
    async fn update_integration(
        &self,
        id: &IntegrationId,
        patch: IntegrationPatch,
    ) -> Result<(), StoreError>;
    /// Ingest an external item; returns the new intake event id.
    async fn ingest_intake_event(&self, event: NewIntakeEvent) -> Result<String, StoreError>;
    /// Route a previously-ingested event to an agent task.
    async fn route_intake_event(&self, event_id: &str) -> Result<(), StoreError>;

    // -- feedback --
    async fn list_pending_feedback(&self, limit: usize)
        -> Result<Vec<FeedbackEvent>, StoreError>;
    /// Mark an event delivered.
    async fn process_feedback_by_id(&self, id: &FeedbackEventId) -> Result<(), StoreError>;
    /// Record a delivery failure; the store decides between `failed`
    /// (retry later) and `dead_letter` (budget exhausted).
    async fn mark_delivery_failure(
        &self,
        id: &FeedbackEventId,
        error: &str,
    ) -> Result<DeliveryStatus, StoreError>;

    // -- live subscription --
    /// Subscribe to ready-task snapshots. Dropping the receiver ends the
    /// subscription.
    fn subscribe_ready_tasks(&self) -> mpsc::Receiver<Vec<Task>>;
}

/// Default deadline for [`create_and_await_task`].
pub const TASK_AWAIT_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(300);

/// Default poll interval for [`create_and_await_task`].
pub const TASK_AWAIT_POLL_INTERVAL: std::time::Duration = std::time::Duration::from_secs(2);

/// Create a task and poll until it settles (`done`, `failed`, or
/// `cancelled`), or the deadline passes.
pub async fn create_and_await_task<S: Store>(
    store: &S,
    task: Task,
    timeout: std::time::Duration,
    poll_interval: std::time::Duration,
) -> Result<Task, StoreError> {
    let id = store.create_task(task).await?;
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if let Some(task) = store.get_task(&id).await? {
            if matches!(
                task.status,
                TaskStatus::Done | TaskStatus::Failed | TaskStatus::Cancelled
            ) {
                return Ok(task);
            }
        }
        if tokio::time::Instant::now() >= deadline {
            return Err(StoreError::AwaitTimeout(id.to_string()));
        }
        tokio::time::sleep(poll_interval).await;
    }
}
