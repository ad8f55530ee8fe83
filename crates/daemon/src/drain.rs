// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Drain loop — runner-side queue consumer.
//!
//! A periodic ticker and push wake-ups both funnel into `tick()`. At most
//! one drain runs per instance: a wake-up landing mid-drain sets a rerun
//! flag instead of starting a second drain, and the flag schedules exactly
//! one follow-up when the current drain finishes. No wake-up is dropped.

use crate::executor::TaskExecutor;
use flux_core::Clock;
use flux_store::{PacketFilter, Store};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

/// Minimum tick interval.
const MIN_INTERVAL: Duration = Duration::from_secs(1);

/// Tunables for the drain loop.
#[derive(Debug, Clone)]
pub struct DrainLoopConfig {
    pub interval: Duration,
    /// Page size per listing (the handshake's batch hint).
    pub limit: usize,
    pub stream_id: Option<flux_core::StreamId>,
    pub backend: Option<String>,
    pub cost_class: Option<String>,
}

impl Default for DrainLoopConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(15),
            limit: 10,
            stream_id: None,
            backend: None,
            cost_class: None,
        }
    }
}

#[derive(Default)]
struct TickState {
    ticking: bool,
    rerun_requested: bool,
}

/// Drain-paginate queue consumer. Cheap to clone; clones share all state.
pub struct DrainLoop<S, C> {
    store: Arc<S>,
    executor: Arc<TaskExecutor<S, C>>,
    config: DrainLoopConfig,
    state: Arc<Mutex<TickState>>,
    wake: Arc<Notify>,
    stopped: CancellationToken,
}

impl<S, C> Clone for DrainLoop<S, C> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            executor: Arc::clone(&self.executor),
            config: self.config.clone(),
            state: Arc::clone(&self.state),
            wake: Arc::clone(&self.wake),
            stopped: self.stopped.clone(),
        }
    }
}

impl<S, C> DrainLoop<S, C>
where
    S: Store,
    C: Clock + 'static,
{
    pub fn new(store: Arc<S>, executor: Arc<TaskExecutor<S, C>>, config: DrainLoopConfig) -> Self {
        Self {
            store,
            executor,
            config,
            state: Arc::new(Mutex::new(TickState::default())),
            wake: Arc::new(Notify::new()),
            stopped: CancellationToken::new(),
        }
    }

    /// Begin ticking. The loop runs until `stop()`.
    pub fn start(&self) {
        let drain = self.clone();
        tokio::spawn(async move {
            let interval = drain.config.interval.max(MIN_INTERVAL);
            loop {
                tokio::select! {
                    _ = drain.stopped.cancelled() => break,
                    _ = tokio::time::sleep(interval) => {}
                    _ = drain.wake.notified() => {}
                }
                drain.tick().await;
            }
        });
    }

    /// Stop ticking; an in-flight drain exits after its current page.
    pub fn stop(&self) {
        self.stopped.cancel();
    }

    /// Request an immediate tick (called on push `task.available`).
    pub fn trigger_now(&self) {
        self.wake.notify_one();
    }

    /// Reentrant-safe tick: a concurrent call coalesces into one rerun.
    pub async fn tick(&self) {
        {
            let mut st = self.state.lock();
            if st.ticking {
                st.rerun_requested = true;
                return;
            }
            st.ticking = true;
        }

        loop {
            self.drain_once().await;
            let mut st = self.state.lock();
            if std::mem::take(&mut st.rerun_requested) {
                continue;
            }
            st.ticking = false;
            return;
        }
    }

    /// Page through todo tasks, executing each, until a short page or stop.
    async fn drain_once(&self) {
        let filter = PacketFilter {
            stream_id: self.config.stream_id.clone(),
            backend: self.config.backend.clone(),
            cost_class: self.config.cost_class.clone(),
            limit: self.config.limit,
        };
        loop {
            if self.stopped.is_cancelled() {
                return;
            }
            let page = match self.store.list_todo_packets(&filter).await {
                Ok(page) => page,
                Err(e) => {
                    tracing::warn!(error = %e, "todo listing failed, ending drain");
                    return;
                }
            };
            let page_len = page.len();
            for packet in &page {
                if self.stopped.is_cancelled() {
                    return;
                }
                self.executor.execute_packet(packet).await;
            }
            if page_len < self.config.limit {
                return;
            }
        }
    }
}

#[cfg(test)]
#[path = "drain_tests.rs"]
mod tests;
