// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task execution.
//!
//! The executor claims a task (todo → doing), materializes its prompt,
//! resolves the backend, runs it under a session entry, and reports the
//! terminal status back to the store. Every dispatch path — supervisor and
//! drain loop — funnels through here, so session accounting happens in
//! exactly one place.

use crate::sessions::SessionRegistry;
use flux_adapters::backend::{BackendRegistry, ExecStatus, ExecuteRequest};
use flux_core::{AgentSession, Clock, IdGen, SessionId, Task, TaskPacket, TaskStatus, UuidIdGen};
use flux_store::Store;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Default per-task execution timeout (5 minutes).
pub const DEFAULT_TASK_TIMEOUT: Duration = Duration::from_secs(300);

/// Outcome of one executor invocation, surfaced to the supervisor.
#[derive(Debug, Clone)]
pub struct ExecutionReport {
    pub ok: bool,
    pub status: ExecStatus,
    pub output: String,
}

impl ExecutionReport {
    fn skipped(reason: impl Into<String>) -> Self {
        Self {
            ok: false,
            status: ExecStatus::Failed,
            output: reason.into(),
        }
    }
}

/// Executes tasks through registered backends.
pub struct TaskExecutor<S, C> {
    store: Arc<S>,
    registry: BackendRegistry,
    sessions: Arc<SessionRegistry>,
    clock: C,
    /// Runner-level backend fallback (`FLUX_BACKEND`).
    runner_backend: Option<String>,
    timeout: Duration,
}

impl<S: Store, C: Clock> TaskExecutor<S, C> {
    pub fn new(
        store: Arc<S>,
        registry: BackendRegistry,
        sessions: Arc<SessionRegistry>,
        clock: C,
    ) -> Self {
        Self {
            store,
            registry,
            sessions,
            clock,
            runner_backend: None,
            timeout: DEFAULT_TASK_TIMEOUT,
        }
    }

    pub fn with_runner_backend(mut self, backend: Option<String>) -> Self {
        self.runner_backend = backend;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn sessions(&self) -> &Arc<SessionRegistry> {
        &self.sessions
    }

    /// Execute a bare task (supervisor path).
    pub async fn execute_task(&self, task: Task) -> ExecutionReport {
        self.execute_packet(&TaskPacket::bare(task)).await
    }

    /// Claim and execute a task from its packet.
    ///
    /// Claiming is the todo → doing transition; a task someone else already
    /// claimed fails the transition and is skipped without touching it.
    pub async fn execute_packet(&self, packet: &TaskPacket) -> ExecutionReport {
        let task_id = packet.task.id.clone();

        if self.sessions.contains(&task_id) {
            return ExecutionReport::skipped("task already has an active session");
        }

        if let Err(e) = self
            .store
            .update_task_status(&task_id, TaskStatus::Doing)
            .await
        {
            tracing::debug!(task_id = %task_id, error = %e, "claim failed, skipping");
            return ExecutionReport::skipped(format!("claim failed: {}", e));
        }

        let backend_id = packet.resolve_backend(self.runner_backend.as_deref());
        let backend = match self.registry.resolve(&backend_id) {
            Ok(backend) => backend,
            Err(e) => {
                tracing::error!(task_id = %task_id, backend = %backend_id, error = %e, "no backend");
                self.report_status(&task_id, TaskStatus::Failed).await;
                return ExecutionReport::skipped(format!("backend unavailable: {}", e));
            }
        };

        let cancel = CancellationToken::new();
        let session = AgentSession::new(
            SessionId::new(UuidIdGen.next()),
            task_id.clone(),
            backend_id.clone(),
            self.clock.epoch_ms(),
        );
        if !self.sessions.insert(session, cancel.clone()) {
            return ExecutionReport::skipped("task already has an active session");
        }

        let timeout = packet
            .execution
            .timeout_ms
            .map(Duration::from_millis)
            .unwrap_or(self.timeout);
        let request = ExecuteRequest {
            task_id: task_id.clone(),
            prompt: packet.materialize_prompt(),
            model: packet.prompt.model.clone(),
            allowed_tools: packet.prompt.allowed_tools.clone(),
            cwd: None,
            timeout,
            cancel,
        };

        tracing::info!(task_id = %task_id, backend = %backend_id, "executing task");
        let result = backend.execute(request).await;
        self.sessions.remove(&task_id);

        let terminal = match result.status {
            ExecStatus::Done => TaskStatus::Done,
            ExecStatus::Failed => TaskStatus::Failed,
            ExecStatus::Cancelled => TaskStatus::Cancelled,
        };
        self.report_status(&task_id, terminal).await;

        tracing::info!(
            task_id = %task_id,
            status = %terminal,
            tokens = ?result.tokens_used,
            "task execution finished"
        );

        ExecutionReport {
            ok: result.ok(),
            status: result.status,
            output: result.output,
        }
    }

    async fn report_status(&self, task_id: &flux_core::TaskId, status: TaskStatus) {
        if let Err(e) = self.store.update_task_status(task_id, status).await {
            tracing::error!(task_id = %task_id, status = %status, error = %e, "failed to report status");
        }
    }
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
