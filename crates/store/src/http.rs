// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP implementation of the store client.
//!
//! Talks to the store's function endpoints: `POST /api/query` and
//! `POST /api/mutation` with body `{path, args}` and a bearer token. The
//! live `ready-tasks` subscription is realized as a polling loop that
//! pushes snapshots into a channel whenever the ready set changes.

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
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tokio::sync::mpsc;

/// Default interval between subscription polls.
const SUBSCRIBE_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Store function response envelope.
#[derive(Debug, Deserialize)]
struct Envelope {
    status: String,
    #[serde(default)]
    value: Value,
    #[serde(default, rename = "errorMessage")]
    error_message: Option<String>,
}

/// HTTP store client.
#[derive(Clone)]
pub struct HttpStore {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
    poll_interval: Duration,
}

impl HttpStore {
    /// Create a client for the store at `base_url` (no trailing slash).
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            token,
            poll_interval: SUBSCRIBE_POLL_INTERVAL,
        }
    }

    /// Override the subscription poll interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    async fn call<T: DeserializeOwned>(
        &self,
        kind: &str,
        path: &str,
        args: Value,
    ) -> Result<T, StoreError> {
        let url = format!("{}/api/{}", self.base_url, kind);
        let mut request = self
            .client
            .post(&url)
            .json(&json!({"path": path, "args": args}));
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;
        let envelope: Envelope = response
            .json()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        if envelope.status != "success" {
            return Err(StoreError::Api {
                endpoint: path.to_string(),
                message: envelope
                    .error_message
                    .unwrap_or_else(|| "unknown store error".to_string()),
            });
        }
        serde_json::from_value(envelope.value).map_err(|e| StoreError::Decode(e.to_string()))
    }

    async fn query<T: DeserializeOwned>(&self, path: &str, args: Value) -> Result<T, StoreError> {
        self.call("query", path, args).await
    }

    async fn mutation<T: DeserializeOwned>(
        &self,
        path: &str,
        args: Value,
    ) -> Result<T, StoreError> {
        self.call("mutation", path, args).await
    }
}

#[async_trait]
impl Store for HttpStore {
    async fn get_ready_tasks(&self) -> Result<Vec<Task>, StoreError> {
        self.query("tasks.getReady", json!({})).await
    }

    async fn count_by_status(&self) -> Result<StatusCounts, StoreError> {
        self.query("tasks.countByStatus", json!({})).await
    }

    async fn get_task(&self, id: &TaskId) -> Result<Option<Task>, StoreError> {
        self.query("tasks.get", json!({"id": id})).await
    }

    async fn create_task(&self, task: Task) -> Result<TaskId, StoreError> {
        self.mutation("tasks.create", json!({"task": task})).await
    }

    async fn update_task_status(&self, id: &TaskId, to: TaskStatus) -> Result<(), StoreError> {
        self.mutation::<Value>("tasks.updateStatus", json!({"id": id, "status": to}))
            .await?;
        Ok(())
    }

    async fn get_execution_repo_context(
        &self,
        id: &TaskId,
    ) -> Result<Option<RepoContext>, StoreError> {
        self.query("tasks.getExecutionRepoContext", json!({"id": id}))
            .await
    }

    async fn list_todo_packets(
        &self,
        filter: &PacketFilter,
    ) -> Result<Vec<TaskPacket>, StoreError> {
        self.query(
            "tasks.list",
            json!({"status": "todo", "format": "packet", "filter": filter}),
        )
        .await
    }

    async fn list_streams(&self) -> Result<Vec<Stream>, StoreError> {
        self.query("streams.list", json!({})).await
    }

    async fn get_playbook_by_slug(
        &self,
        slug: &str,
        stream_id: Option<&StreamId>,
    ) -> Result<Option<Playbook>, StoreError> {
        self.query(
            "playbooks.getBySlug",
            json!({"slug": slug, "streamId": stream_id}),
        )
        .await
    }

    async fn get_enabled_cron_triggers(&self) -> Result<Vec<CronTrigger>, StoreError> {
        self.query("playbook_triggers.getEnabledCrons", json!({}))
            .await
    }

    async fn create_run(&self, run: NewRun) -> Result<RunId, StoreError> {
        self.mutation(
            "runs.create",
            json!({
                "playbookId": run.playbook_id,
                "threadId": run.thread_id,
                "paramsJson": run.params_json,
            }),
        )
        .await
    }

    async fn memory_kv_get(
        &self,
        stream_id: &StreamId,
        namespace: &str,
        key: &str,
    ) -> Result<Option<String>, StoreError> {
        self.query(
            "memory_kv.get",
            json!({"scope": "stream", "streamId": stream_id, "namespace": namespace, "key": key}),
        )
        .await
    }

    async fn memory_kv_upsert(
        &self,
        stream_id: &StreamId,
        namespace: &str,
        key: &str,
        value: &str,
    ) -> Result<(), StoreError> {
        self.mutation::<Value>(
            "memory_kv.upsert",
            json!({
                "scope": "stream",
                "streamId": stream_id,
                "namespace": namespace,
                "key": key,
                "value": value,
            }),
        )
        .await?;
        Ok(())
    }

    async fn admin_get_value(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.query("admin.getValue", json!({"key": key})).await
    }

    async fn admin_set_value(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.mutation::<Value>("admin.setValue", json!({"key": key, "value": value}))
            .await?;
        Ok(())
    }

    async fn list_integrations(&self, only_enabled: bool) -> Result<Vec<Integration>, StoreError> {
        self.query("integrations.list", json!({"enabled": only_enabled}))
            .await
    }

    async fn get_integration(
        &self,
        id: &IntegrationId,
    ) -> Result<Option<Integration>, StoreError> {
        self.query("integrations.get", json!({"id": id})).await
    }

    async fn update_integration(
        &self,
        id: &IntegrationId,
        patch: IntegrationPatch,
    ) -> Result<(), StoreError> {
        self.mutation::<Value>("integrations.update", json!({"id": id, "patch": patch}))
            .await?;
        Ok(())
    }

    async fn ingest_intake_event(&self, event: NewIntakeEvent) -> Result<String, StoreError> {
        self.mutation("intake_events.ingest", json!({"event": event}))
            .await
    }

    async fn route_intake_event(&self, event_id: &str) -> Result<(), StoreError> {
        self.mutation::<Value>("intake_events.routeAgentic", json!({"eventId": event_id}))
            .await?;
        Ok(())
    }

    async fn list_pending_feedback(
        &self,
        limit: usize,
    ) -> Result<Vec<FeedbackEvent>, StoreError> {
        self.query("integration_feedback.listPending", json!({"limit": limit}))
            .await
    }

    async fn process_feedback_by_id(&self, id: &FeedbackEventId) -> Result<(), StoreError> {
        self.mutation::<Value>("integration_feedback.processById", json!({"id": id}))
            .await?;
        Ok(())
    }

    async fn mark_delivery_failure(
        &self,
        id: &FeedbackEventId,
        error: &str,
    ) -> Result<DeliveryStatus, StoreError> {
        self.mutation(
            "integration_feedback.markDeliveryFailure",
            json!({"id": id, "error": error}),
        )
        .await
    }

    fn subscribe_ready_tasks(&self) -> mpsc::Receiver<Vec<Task>> {
        let (tx, rx) = mpsc::channel(8);
        let store = self.clone();
        tokio::spawn(async move {
            let mut last_ids: Vec<TaskId> = Vec::new();
            let mut ticker = tokio::time::interval(store.poll_interval);
            loop {
                ticker.tick().await;
                let tasks = match store.get_ready_tasks().await {
                    Ok(tasks) => tasks,
                    Err(e) => {
                        tracing::debug!(error = %e, "ready-tasks poll failed");
                        continue;
                    }
                };
                let ids: Vec<TaskId> = tasks.iter().map(|t| t.id.clone()).collect();
                if ids == last_ids {
                    continue;
                }
                last_ids = ids;
                if tx.send(tasks).await.is_err() {
                    // Receiver dropped; subscription over.
                    break;
                }
            }
        });
        rx
    }
}
