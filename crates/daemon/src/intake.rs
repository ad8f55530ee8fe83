// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Intake worker.
//!
//! Polls all enabled integrations on a fixed cadence, dispatching each to
//! the adapter matching its kind. Integrations are polled independently
//! (bounded parallelism, per-poll deadline); a failing integration records
//! its own `last_error` and never blocks the others. Worker-level failures
//! back off exponentially up to a cap.

use flux_adapters::intake::{IntakeAdapterRegistry, IntakeContext};
use flux_core::Integration;
use flux_store::{IntegrationPatch, Store};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

/// Tunables for the intake worker.
#[derive(Debug, Clone)]
pub struct IntakeWorkerConfig {
    pub poll_every: Duration,
    pub poll_timeout: Duration,
    pub poll_concurrency: usize,
    pub max_backoff: Duration,
}

impl Default for IntakeWorkerConfig {
    fn default() -> Self {
        Self {
            poll_every: Duration::from_secs(60),
            poll_timeout: Duration::from_secs(30),
            poll_concurrency: 4,
            max_backoff: Duration::from_secs(15 * 60),
        }
    }
}

/// Delay until the next poll: the base interval on a clean pass, else
/// `min(max_backoff, poll_every * 2^(failures-1))`.
pub fn backoff_delay(poll_every: Duration, failures: u32, max_backoff: Duration) -> Duration {
    if failures == 0 {
        return poll_every;
    }
    let multiplier = 2u32.saturating_pow(failures - 1);
    poll_every.saturating_mul(multiplier).min(max_backoff)
}

/// Periodic poller over all enabled integrations. Cheap to clone; clones
/// share all state.
pub struct IntakeWorker<S> {
    store: Arc<S>,
    adapters: IntakeAdapterRegistry,
    ctx: IntakeContext,
    config: IntakeWorkerConfig,
    failures: Arc<AtomicU32>,
    cancel: CancellationToken,
}

impl<S> Clone for IntakeWorker<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            adapters: self.adapters.clone(),
            ctx: self.ctx.clone(),
            config: self.config.clone(),
            failures: Arc::clone(&self.failures),
            cancel: self.cancel.clone(),
        }
    }
}

impl<S: Store> IntakeWorker<S> {
    pub fn new(
        store: Arc<S>,
        adapters: IntakeAdapterRegistry,
        ctx: IntakeContext,
        config: IntakeWorkerConfig,
    ) -> Self {
        Self {
            store,
            adapters,
            ctx,
            config,
            failures: Arc::new(AtomicU32::new(0)),
            cancel: CancellationToken::new(),
        }
    }

    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// Run the poll loop until stopped.
    pub fn start(&self) {
        let worker = self.clone();
        tokio::spawn(async move {
            loop {
                let failures = worker.failures.load(Ordering::Relaxed);
                let delay = backoff_delay(
                    worker.config.poll_every,
                    failures,
                    worker.config.max_backoff,
                );
                tokio::select! {
                    _ = worker.cancel.cancelled() => break,
                    _ = tokio::time::sleep(delay) => {}
                }
                let clean = worker.poll_all().await;
                if clean {
                    worker.failures.store(0, Ordering::Relaxed);
                } else {
                    worker.failures.fetch_add(1, Ordering::Relaxed);
                }
            }
        });
    }

    /// One pass over all enabled integrations. Returns `true` when every
    /// poll succeeded.
    pub async fn poll_all(&self) -> bool {
        let integrations = match self.store.list_integrations(true).await {
            Ok(integrations) => integrations,
            Err(e) => {
                tracing::warn!(error = %e, "failed to list integrations");
                return false;
            }
        };

        let semaphore = Arc::new(Semaphore::new(self.config.poll_concurrency.max(1)));
        let mut handles = Vec::with_capacity(integrations.len());
        for integration in integrations {
            let worker = self.clone();
            let semaphore = Arc::clone(&semaphore);
            handles.push(tokio::spawn(async move {
                let Ok(_permit) = semaphore.acquire().await else {
                    return false;
                };
                worker.poll_one(&integration).await
            }));
        }

        let mut clean = true;
        for handle in handles {
            clean &= handle.await.unwrap_or(false);
        }
        clean
    }

    /// Poll a single integration with a deadline. Returns `true` on success.
    async fn poll_one(&self, integration: &Integration) -> bool {
        let Some(adapter) = self.adapters.get(&integration.kind) else {
            tracing::debug!(
                integration = %integration.id,
                kind = %integration.kind,
                "no intake adapter for kind, skipping"
            );
            return true;
        };

        let poll = adapter.poll(integration, &self.ctx);
        match tokio::time::timeout(self.config.poll_timeout, poll).await {
            Ok(Ok(outcome)) => {
                let mut patch = IntegrationPatch::clear_error();
                patch.intake_cursor = outcome.cursor;
                if let Err(e) = self.store.update_integration(&integration.id, patch).await {
                    tracing::warn!(integration = %integration.id, error = %e, "cursor update failed");
                    return false;
                }
                tracing::debug!(
                    integration = %integration.id,
                    ingested = outcome.ingested,
                    "poll complete"
                );
                true
            }
            Ok(Err(e)) => {
                self.record_error(integration, &e.to_string()).await;
                false
            }
            Err(_) => {
                let message = format!(
                    "{} poll timed out after {} ms",
                    integration.kind,
                    self.config.poll_timeout.as_millis()
                );
                self.record_error(integration, &message).await;
                false
            }
        }
    }

    async fn record_error(&self, integration: &Integration, message: &str) {
        tracing::warn!(integration = %integration.id, error = %message, "integration poll failed");
        let patch = IntegrationPatch::error(message);
        if let Err(e) = self.store.update_integration(&integration.id, patch).await {
            tracing::warn!(integration = %integration.id, error = %e, "failed to record lastError");
        }
    }
}

#[cfg(test)]
#[path = "intake_tests.rs"]
mod tests;
