// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Supervisor: reactive task dispatch with global guards.
//!
//! Reacts to the store's ready-task subscription and dispatches through the
//! executor while enforcing three guards: the work-in-progress cap, review
//! queue backpressure, and a rolling-window failure budget per task kind.
//! A single dispatch pass runs at a time; wake-ups arriving mid-pass set a
//! recheck flag instead of racing.

use crate::executor::TaskExecutor;
use crate::scheduler::CadenceScheduler;
use crate::sessions::SessionRegistry;
use flux_adapters::backend::ExecStatus;
use flux_core::{Clock, Task, TaskId};
use flux_store::{Store, StoreError};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Admin key holding the heartbeat timestamp.
pub const HEARTBEAT_KEY: &str = "supervisorHeartbeat";

/// Rolling window for the per-kind failure budget.
const FAILURE_WINDOW_MS: u64 = 30 * 60 * 1000;

/// Hard cap on retained failure entries.
const FAILURE_LOG_CAP: usize = 5_000;

/// Tunables for the supervisor.
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    pub max_concurrent: usize,
    pub max_pending_review: u64,
    pub auto_pause_threshold: usize,
    pub heartbeat_interval: Duration,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 4,
            max_pending_review: 5,
            auto_pause_threshold: 5,
            heartbeat_interval: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone)]
struct FailureEntry {
    kind: String,
    at_ms: u64,
}

#[derive(Default)]
struct State {
    running: bool,
    paused: bool,
    pause_reason: Option<String>,
    dispatching: bool,
    pending_recheck: bool,
    heartbeat_running: bool,
    pending_dispatch: HashSet<TaskId>,
    failure_log: Vec<FailureEntry>,
}

impl State {
    fn record_failure(&mut self, kind: String, now_ms: u64) {
        self.failure_log.push(FailureEntry {
            kind,
            at_ms: now_ms,
        });
        self.failure_log
            .retain(|e| now_ms.saturating_sub(e.at_ms) <= FAILURE_WINDOW_MS);
        if self.failure_log.len() > FAILURE_LOG_CAP {
            let excess = self.failure_log.len() - FAILURE_LOG_CAP;
            self.failure_log.drain(..excess);
        }
    }

    fn recent_failures(&self, kind: &str, now_ms: u64) -> usize {
        self.failure_log
            .iter()
            .filter(|e| e.kind == kind && now_ms.saturating_sub(e.at_ms) <= FAILURE_WINDOW_MS)
            .count()
    }
}

/// Reactive dispatcher. Cheap to clone; clones share all state.
pub struct Supervisor<S, C> {
    store: Arc<S>,
    executor: Arc<TaskExecutor<S, C>>,
    scheduler: Arc<CadenceScheduler<S, C>>,
    sessions: Arc<SessionRegistry>,
    clock: C,
    config: SupervisorConfig,
    state: Arc<Mutex<State>>,
    cancel: Arc<Mutex<Option<CancellationToken>>>,
}

impl<S, C: Clock> Clone for Supervisor<S, C> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            executor: Arc::clone(&self.executor),
            scheduler: Arc::clone(&self.scheduler),
            sessions: Arc::clone(&self.sessions),
            clock: self.clock.clone(),
            config: self.config.clone(),
            state: Arc::clone(&self.state),
            cancel: Arc::clone(&self.cancel),
        }
    }
}

impl<S, C> Supervisor<S, C>
where
    S: Store,
    C: Clock + 'static,
{
    pub fn new(
        store: Arc<S>,
        executor: Arc<TaskExecutor<S, C>>,
        scheduler: Arc<CadenceScheduler<S, C>>,
        sessions: Arc<SessionRegistry>,
        clock: C,
        config: SupervisorConfig,
    ) -> Self {
        Self {
            store,
            executor,
            scheduler,
            sessions,
            clock,
            config,
            state: Arc::new(Mutex::new(State::default())),
            cancel: Arc::new(Mutex::new(None)),
        }
    }

    /// Subscribe and begin the heartbeat ticker. Idempotent.
    pub fn start(&self) {
        {
            let mut st = self.state.lock();
            if st.running {
                return;
            }
            st.running = true;
            st.paused = false;
            st.pause_reason = None;
        }
        let token = CancellationToken::new();
        *self.cancel.lock() = Some(token.clone());

        // Subscription reader: single consumer of ready-task snapshots.
        let sup = self.clone();
        let sub_token = token.clone();
        tokio::spawn(async move {
            let mut rx = sup.store.subscribe_ready_tasks();
            loop {
                tokio::select! {
                    _ = sub_token.cancelled() => break,
                    snapshot = rx.recv() => match snapshot {
                        Some(tasks) => sup.handle_ready(tasks).await,
                        None => break,
                    },
                }
            }
        });

        // Heartbeat ticker.
        let sup = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(sup.config.heartbeat_interval);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => sup.run_heartbeat().await,
                }
            }
        });

        tracing::info!("supervisor started");
    }

    /// Unsubscribe, cancel all active sessions, zero the heartbeat marker.
    /// Idempotent.
    pub async fn stop(&self) {
        {
            let mut st = self.state.lock();
            if !st.running {
                return;
            }
            st.running = false;
        }
        if let Some(token) = self.cancel.lock().take() {
            token.cancel();
        }
        self.sessions
            .kill_all(self.clock.epoch_ms(), "supervisor stopped");
        if let Err(e) = self.store.admin_set_value(HEARTBEAT_KEY, "0").await {
            tracing::warn!(error = %e, "failed to zero heartbeat marker");
        }
        tracing::info!("supervisor stopped");
    }

    /// One-shot synchronous sweep; returns the number of tasks dispatched.
    pub async fn process_ready_tasks(&self) -> Result<usize, StoreError> {
        let tasks = self.store.get_ready_tasks().await?;
        {
            let mut st = self.state.lock();
            if st.paused {
                return Ok(0);
            }
            if st.dispatching {
                st.pending_recheck = true;
                return Ok(0);
            }
            st.dispatching = true;
        }
        let dispatched = self.dispatch_pass(&tasks).await;
        {
            let mut st = self.state.lock();
            st.dispatching = false;
            st.pending_recheck = false;
        }
        Ok(dispatched)
    }

    /// Seed a failure observation (also used by tests to preload budgets).
    pub fn record_failure(&self, kind: &str) {
        let now = self.clock.epoch_ms();
        self.state.lock().record_failure(kind.to_string(), now);
    }

    pub fn is_paused(&self) -> bool {
        self.state.lock().paused
    }

    pub fn pause_reason(&self) -> Option<String> {
        self.state.lock().pause_reason.clone()
    }

    pub fn is_running(&self) -> bool {
        self.state.lock().running
    }

    /// Handle a ready-task snapshot from the subscription.
    async fn handle_ready(&self, mut tasks: Vec<Task>) {
        loop {
            {
                let mut st = self.state.lock();
                if !st.running || st.paused {
                    return;
                }
                if st.dispatching {
                    st.pending_recheck = true;
                    return;
                }
                st.dispatching = true;
            }

            self.dispatch_pass(&tasks).await;

            let recheck = {
                let mut st = self.state.lock();
                st.dispatching = false;
                std::mem::take(&mut st.pending_recheck)
            };
            if !recheck {
                return;
            }
            match self.store.get_ready_tasks().await {
                Ok(next) => tasks = next,
                Err(e) => {
                    tracing::warn!(error = %e, "ready-task requery failed");
                    return;
                }
            }
        }
    }

    /// One guarded pass over a snapshot. Caller holds the dispatching flag.
    async fn dispatch_pass(&self, tasks: &[Task]) -> usize {
        let counts = match self.store.count_by_status().await {
            Ok(counts) => counts,
            Err(e) => {
                tracing::warn!(error = %e, "countByStatus failed, skipping pass");
                return 0;
            }
        };
        if counts.review >= self.config.max_pending_review {
            self.pause(format!("review queue full ({} pending)", counts.review));
            return 0;
        }

        let now = self.clock.epoch_ms();
        let mut dispatched = 0;
        for task in tasks {
            if self.is_in_flight(&task.id) {
                continue;
            }
            if self.in_flight_count() >= self.config.max_concurrent {
                break;
            }

            let recent = self.state.lock().recent_failures(&task.kind, now);
            if recent >= self.config.auto_pause_threshold {
                self.pause(format!("{}: {} failures in 30 min", task.kind, recent));
                break;
            }

            self.state.lock().pending_dispatch.insert(task.id.clone());
            let sup = self.clone();
            let task = task.clone();
            tokio::spawn(async move {
                let report = sup.executor.execute_task(task.clone()).await;
                sup.on_execution_complete(&task, report.status).await;
            });
            dispatched += 1;
        }
        dispatched
    }

    /// A task is in flight if it is pending dispatch or has a session.
    fn is_in_flight(&self, task_id: &TaskId) -> bool {
        self.state.lock().pending_dispatch.contains(task_id) || self.sessions.contains(task_id)
    }

    /// Size of `pending_dispatch ∪ activeSessions`.
    fn in_flight_count(&self) -> usize {
        let st = self.state.lock();
        let mut union: HashSet<TaskId> = st.pending_dispatch.clone();
        union.extend(self.sessions.task_ids());
        union.len()
    }

    fn on_execution_complete<'a>(
        &'a self,
        task: &'a Task,
        status: ExecStatus,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send + 'a>> {
        Box::pin(async move {
            {
                let mut st = self.state.lock();
                st.pending_dispatch.remove(&task.id);
                // Cancellations are not failures; they must not trip auto-pause.
                if status == ExecStatus::Failed {
                    let now = self.clock.epoch_ms();
                    st.record_failure(task.kind.clone(), now);
                }
                if !st.running || st.paused {
                    return;
                }
            }
            match self.store.get_ready_tasks().await {
                Ok(tasks) => self.handle_ready(tasks).await,
                Err(e) => tracing::warn!(error = %e, "post-completion requery failed"),
            }
        })
    }

    fn pause(&self, reason: String) {
        tracing::warn!(reason = %reason, "supervisor paused");
        let mut st = self.state.lock();
        st.paused = true;
        st.pause_reason = Some(reason);
    }

    /// Heartbeat: persist liveness, run the cadence scheduler, and
    /// auto-resume a review-full pause once the queue drains.
    pub async fn run_heartbeat(&self) {
        {
            let mut st = self.state.lock();
            if st.heartbeat_running || !st.running {
                return;
            }
            st.heartbeat_running = true;
        }

        let now = self.clock.epoch_ms();
        if let Err(e) = self
            .store
            .admin_set_value(HEARTBEAT_KEY, &now.to_string())
            .await
        {
            tracing::warn!(error = %e, "failed to write heartbeat marker");
        }

        self.scheduler.check_cadences().await;

        let review_paused = {
            let st = self.state.lock();
            st.paused
                && st
                    .pause_reason
                    .as_deref()
                    .map(|r| r.starts_with("review queue full"))
                    .unwrap_or(false)
        };
        if review_paused {
            if let Ok(counts) = self.store.count_by_status().await {
                if counts.review < self.config.max_pending_review {
                    let mut st = self.state.lock();
                    st.paused = false;
                    st.pause_reason = None;
                    tracing::info!("review queue drained, dispatch resumed");
                }
            }
        }

        self.state.lock().heartbeat_running = false;
    }
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
