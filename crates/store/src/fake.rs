// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory store for tests.
//!
//! Holds packets as the single source of truth (the task row is the packet's
//! `task` field), records every mutation, and pushes ready-task snapshots to
//! subscribers whenever the ready set changes. Individual endpoints can be
//! scripted to fail a number of times to exercise retry paths.

use crate::client::Store;
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
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;

#[derive(Default)]
struct FakeState {
    packets: Vec<TaskPacket>,
    counts_override: Option<StatusCounts>,
    streams: Vec<Stream>,
    playbooks: Vec<Playbook>,
    triggers: Vec<CronTrigger>,
    kv: HashMap<(StreamId, String, String), String>,
    admin: HashMap<String, String>,
    integrations: Vec<Integration>,
    intake_events: Vec<(String, NewIntakeEvent)>,
    routed_events: Vec<String>,
    feedback: Vec<FeedbackEvent>,
    repo_contexts: HashMap<TaskId, RepoContext>,
    runs: Vec<NewRun>,
    transitions: Vec<(TaskId, TaskStatus, TaskStatus)>,
    fail_remaining: HashMap<String, u32>,
    now_ms: u64,
    next_id: u64,
}

/// Scripted in-memory store.
#[derive(Clone)]
pub struct FakeStore {
    state: Arc<Mutex<FakeState>>,
    subscribers: Arc<Mutex<Vec<mpsc::Sender<Vec<Task>>>>>,
    feedback_max_attempts: u32,
}

impl FakeStore {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(FakeState {
                now_ms: 1_000_000,
                ..FakeState::default()
            })),
            subscribers: Arc::new(Mutex::new(Vec::new())),
            feedback_max_attempts: 3,
        }
    }

    /// Retry budget before a feedback event dead-letters (default 3).
    pub fn with_feedback_max_attempts(mut self, attempts: u32) -> Self {
        self.feedback_max_attempts = attempts;
        self
    }

    // -- scripting helpers --

    pub fn set_now_ms(&self, now_ms: u64) {
        self.state.lock().now_ms = now_ms;
    }

    pub fn add_task(&self, task: Task) {
        self.state.lock().packets.push(TaskPacket::bare(task));
    }

    pub fn add_packet(&self, packet: TaskPacket) {
        self.state.lock().packets.push(packet);
    }

    pub fn add_stream(&self, stream: Stream) {
        self.state.lock().streams.push(stream);
    }

    pub fn add_playbook(&self, playbook: Playbook) {
        self.state.lock().playbooks.push(playbook);
    }

    pub fn add_trigger(&self, trigger: CronTrigger) {
        self.state.lock().triggers.push(trigger);
    }

    pub fn add_integration(&self, integration: Integration) {
        self.state.lock().integrations.push(integration);
    }

    pub fn add_feedback(&self, event: FeedbackEvent) {
        self.state.lock().feedback.push(event);
    }

    pub fn set_repo_context(&self, task_id: TaskId, context: RepoContext) {
        self.state.lock().repo_contexts.insert(task_id, context);
    }

    /// Override `count_by_status` (otherwise computed from stored tasks).
    pub fn set_counts(&self, counts: StatusCounts) {
        self.state.lock().counts_override = Some(counts);
    }

    pub fn clear_counts_override(&self) {
        self.state.lock().counts_override = None;
    }

    /// Make the next `times` calls hitting `endpoint` fail with a
    /// transport error. Endpoint names match the store paths, e.g.
    /// `"integrations.list"`.
    pub fn fail_times(&self, endpoint: &str, times: u32) {
        self.state
            .lock()
            .fail_remaining
            .insert(endpoint.to_string(), times);
    }

    // -- inspection helpers --

    pub fn task(&self, id: &TaskId) -> Option<Task> {
        self.state
            .lock()
            .packets
            .iter()
            .find(|p| &p.task.id == id)
            .map(|p| p.task.clone())
    }

    pub fn created_runs(&self) -> Vec<NewRun> {
        self.state.lock().runs.clone()
    }

    pub fn transitions(&self) -> Vec<(TaskId, TaskStatus, TaskStatus)> {
        self.state.lock().transitions.clone()
    }

    pub fn kv_value(&self, stream_id: &StreamId, namespace: &str, key: &str) -> Option<String> {
        self.state
            .lock()
            .kv
            .get(&(stream_id.clone(), namespace.to_string(), key.to_string()))
            .cloned()
    }

    pub fn admin_value(&self, key: &str) -> Option<String> {
        self.state.lock().admin.get(key).cloned()
    }

    pub fn integration(&self, id: &IntegrationId) -> Option<Integration> {
        self.state
            .lock()
            .integrations
            .iter()
            .find(|i| &i.id == id)
            .cloned()
    }

    pub fn ingested_events(&self) -> Vec<(String, NewIntakeEvent)> {
        self.state.lock().intake_events.clone()
    }

    pub fn routed_events(&self) -> Vec<String> {
        self.state.lock().routed_events.clone()
    }

    pub fn feedback_event(&self, id: &FeedbackEventId) -> Option<FeedbackEvent> {
        self.state
            .lock()
            .feedback
            .iter()
            .find(|f| &f.id == id)
            .cloned()
    }

    /// Push the current ready set to all subscribers.
    pub fn notify_ready(&self) {
        let snapshot = self.ready_snapshot();
        self.broadcast(snapshot);
    }

    fn ready_snapshot(&self) -> Vec<Task> {
        self.state
            .lock()
            .packets
            .iter()
            .filter(|p| p.task.status == TaskStatus::Todo)
            .map(|p| p.task.clone())
            .collect()
    }

    fn broadcast(&self, snapshot: Vec<Task>) {
        let mut subs = self.subscribers.lock();
        subs.retain(|tx| {
            let _ = tx.try_send(snapshot.clone());
            !tx.is_closed()
        });
    }

    fn check_fail(&self, endpoint: &str) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        if let Some(remaining) = state.fail_remaining.get_mut(endpoint) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(StoreError::Transport(format!(
                    "{}: scripted failure",
                    endpoint
                )));
            }
        }
        Ok(())
    }

    fn next_id(&self, prefix: &str) -> String {
        let mut state = self.state.lock();
        state.next_id += 1;
        format!("{}-{}", prefix, state.next_id)
    }
}

#[async_trait]
impl Store for FakeStore {
    async fn get_ready_tasks(&self) -> Result<Vec<Task>, StoreError> {
        self.check_fail("tasks.getReady")?;
        Ok(self.ready_snapshot())
    }

    async fn count_by_status(&self) -> Result<StatusCounts, StoreError> {
        self.check_fail("tasks.countByStatus")?;
        let state = self.state.lock();
        if let Some(counts) = state.counts_override {
            return Ok(counts);
        }
        let mut counts = StatusCounts::default();
        for packet in &state.packets {
            match packet.task.status {
                TaskStatus::Todo => counts.todo += 1,
                TaskStatus::Doing => counts.doing += 1,
                TaskStatus::Blocked => counts.blocked += 1,
                TaskStatus::Review => counts.review += 1,
                TaskStatus::Done => counts.done += 1,
                TaskStatus::Failed => counts.failed += 1,
                TaskStatus::Cancelled => counts.cancelled += 1,
            }
        }
        Ok(counts)
    }

    async fn get_task(&self, id: &TaskId) -> Result<Option<Task>, StoreError> {
        self.check_fail("tasks.get")?;
        Ok(self.task(id))
    }

    async fn create_task(&self, task: Task) -> Result<TaskId, StoreError> {
        self.check_fail("tasks.create")?;
        let id = task.id.clone();
        self.state.lock().packets.push(TaskPacket::bare(task));
        self.notify_ready();
        Ok(id)
    }

    async fn update_task_status(&self, id: &TaskId, to: TaskStatus) -> Result<(), StoreError> {
        self.check_fail("tasks.updateStatus")?;
        {
            let mut state = self.state.lock();
            let now_ms = state.now_ms;
            let packet = state
                .packets
                .iter_mut()
                .find(|p| &p.task.id == id)
                .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
            let from = packet.task.status;
            packet.task.apply_status(to, now_ms)?;
            state.transitions.push((id.clone(), from, to));
        }
        self.notify_ready();
        Ok(())
    }

    async fn get_execution_repo_context(
        &self,
        id: &TaskId,
    ) -> Result<Option<RepoContext>, StoreError> {
        self.check_fail("tasks.getExecutionRepoContext")?;
        Ok(self.state.lock().repo_contexts.get(id).cloned())
    }

    async fn list_todo_packets(
        &self,
        filter: &PacketFilter,
    ) -> Result<Vec<TaskPacket>, StoreError> {
        self.check_fail("tasks.list")?;
        let state = self.state.lock();
        Ok(state
            .packets
            .iter()
            .filter(|p| p.task.status == TaskStatus::Todo)
            .filter(|p| {
                filter
                    .stream_id
                    .as_ref()
                    .map(|s| p.task.stream_id.as_ref() == Some(s))
                    .unwrap_or(true)
            })
            .filter(|p| {
                filter
                    .backend
                    .as_deref()
                    .map(|b| p.resolve_backend(None) == b)
                    .unwrap_or(true)
            })
            .filter(|p| {
                filter
                    .cost_class
                    .as_deref()
                    .map(|c| p.execution.cost_class.as_deref() == Some(c))
                    .unwrap_or(true)
            })
            .take(filter.limit)
            .cloned()
            .collect())
    }

    async fn list_streams(&self) -> Result<Vec<Stream>, StoreError> {
        self.check_fail("streams.list")?;
        Ok(self.state.lock().streams.clone())
    }

    async fn get_playbook_by_slug(
        &self,
        slug: &str,
        stream_id: Option<&StreamId>,
    ) -> Result<Option<Playbook>, StoreError> {
        self.check_fail("playbooks.getBySlug")?;
        let state = self.state.lock();
        let scoped = stream_id.and_then(|sid| {
            state
                .playbooks
                .iter()
                .find(|p| p.slug == slug && p.stream_id.as_ref() == Some(sid))
        });
        let found = scoped.or_else(|| {
            state
                .playbooks
                .iter()
                .find(|p| p.slug == slug && p.stream_id.is_none())
        });
        Ok(found.cloned())
    }

    async fn get_enabled_cron_triggers(&self) -> Result<Vec<CronTrigger>, StoreError> {
        self.check_fail("playbook_triggers.getEnabledCrons")?;
        Ok(self.state.lock().triggers.clone())
    }

    async fn create_run(&self, run: NewRun) -> Result<RunId, StoreError> {
        self.check_fail("runs.create")?;
        let id = self.next_id("run");
        self.state.lock().runs.push(run);
        Ok(RunId::new(id))
    }

    async fn memory_kv_get(
        &self,
        stream_id: &StreamId,
        namespace: &str,
        key: &str,
    ) -> Result<Option<String>, StoreError> {
        self.check_fail("memory_kv.get")?;
        Ok(self.kv_value(stream_id, namespace, key))
    }

    async fn memory_kv_upsert(
        &self,
        stream_id: &StreamId,
        namespace: &str,
        key: &str,
        value: &str,
    ) -> Result<(), StoreError> {
        self.check_fail("memory_kv.upsert")?;
        self.state.lock().kv.insert(
            (stream_id.clone(), namespace.to_string(), key.to_string()),
            value.to_string(),
        );
        Ok(())
    }

    async fn admin_get_value(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.check_fail("admin.getValue")?;
        Ok(self.admin_value(key))
    }

    async fn admin_set_value(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.check_fail("admin.setValue")?;
        self.state
            .lock()
            .admin
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn list_integrations(&self, only_enabled: bool) -> Result<Vec<Integration>, StoreError> {
        self.check_fail("integrations.list")?;
        Ok(self
            .state
            .lock()
            .integrations
            .iter()
            .filter(|i| !only_enabled || i.enabled)
            .cloned()
            .collect())
    }

    async fn get_integration(
        &self,
        id: &IntegrationId,
    ) -> Result<Option<Integration>, StoreError> {
        self.check_fail("integrations.get")?;
        Ok(self.integration(id))
    }

    async fn update_integration(
        &self,
        id: &IntegrationId,
        patch: IntegrationPatch,
    ) -> Result<(), StoreError> {
        self.check_fail("integrations.update")?;
        let mut state = self.state.lock();
        let row = state
            .integrations
            .iter_mut()
            .find(|i| &i.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        if let Some(cursor) = patch.intake_cursor {
            row.intake_cursor = Some(cursor);
        }
        if let Some(error) = patch.last_error {
            row.last_error = Some(error);
        } else if patch.clear_last_error {
            row.last_error = None;
        }
        Ok(())
    }

    async fn ingest_intake_event(&self, event: NewIntakeEvent) -> Result<String, StoreError> {
        self.check_fail("intake_events.ingest")?;
        let id = self.next_id("intake");
        self.state.lock().intake_events.push((id.clone(), event));
        Ok(id)
    }

    async fn route_intake_event(&self, event_id: &str) -> Result<(), StoreError> {
        self.check_fail("intake_events.routeAgentic")?;
        self.state.lock().routed_events.push(event_id.to_string());
        Ok(())
    }

    async fn list_pending_feedback(
        &self,
        limit: usize,
    ) -> Result<Vec<FeedbackEvent>, StoreError> {
        self.check_fail("integration_feedback.listPending")?;
        Ok(self
            .state
            .lock()
            .feedback
            .iter()
            .filter(|f| {
                matches!(f.delivery, DeliveryStatus::Pending | DeliveryStatus::Failed)
            })
            .take(limit)
            .cloned()
            .collect())
    }

    async fn process_feedback_by_id(&self, id: &FeedbackEventId) -> Result<(), StoreError> {
        self.check_fail("integration_feedback.processById")?;
        let mut state = self.state.lock();
        let event = state
            .feedback
            .iter_mut()
            .find(|f| &f.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        event.delivery = DeliveryStatus::Sent;
        Ok(())
    }

    async fn mark_delivery_failure(
        &self,
        id: &FeedbackEventId,
        _error: &str,
    ) -> Result<DeliveryStatus, StoreError> {
        self.check_fail("integration_feedback.markDeliveryFailure")?;
        let max_attempts = self.feedback_max_attempts;
        let mut state = self.state.lock();
        let event = state
            .feedback
            .iter_mut()
            .find(|f| &f.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        event.attempts += 1;
        event.delivery = if event.attempts >= max_attempts {
            DeliveryStatus::DeadLetter
        } else {
            DeliveryStatus::Failed
        };
        Ok(event.delivery)
    }

    fn subscribe_ready_tasks(&self) -> mpsc::Receiver<Vec<Task>> {
        let (tx, rx) = mpsc::channel(32);
        self.subscribers.lock().push(tx);
        rx
    }
}

impl std::fmt::Debug for FakeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("FakeStore")
            .field("packets", &state.packets.len())
            .field("feedback", &state.feedback.len())
            .finish()
    }
}

impl Default for FakeStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
