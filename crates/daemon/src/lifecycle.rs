// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon startup: lock acquisition, identity, handshake, composition.
//!
//! Startup is the only place that wires components together. A failed
//! gateway handshake is fatal; a missing gateway URL merely disables the
//! push client and the intake/feedback workers (the supervisor, scheduler,
//! and drain loop run on the store alone).

use crate::config::{Config, ConfigError};
use crate::drain::{DrainLoop, DrainLoopConfig};
use crate::executor::TaskExecutor;
use crate::feedback::{FeedbackWorker, FeedbackWorkerConfig};
use crate::identity::{load_or_create_identity, IdentityError};
use crate::intake::{IntakeWorker, IntakeWorkerConfig};
use crate::scheduler::CadenceScheduler;
use crate::sessions::SessionRegistry;
use crate::supervisor::{Supervisor, SupervisorConfig};
use flux_adapters::backend::{BackendRegistry, CliBackend};
use flux_adapters::intake::{IntakeAdapterRegistry, IntakeContext};
use flux_adapters::{GatewayClient, GithubIntakeAdapter, PushClient, PushClientConfig};
use flux_core::SystemClock;
use flux_store::HttpStore;
use fs2::FileExt;
use std::fs::File;
use std::io::Write;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("another daemon holds the lock")]
    LockFailed(String),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Identity(#[from] IdentityError),
    #[error("gateway handshake failed: {0}")]
    Handshake(String),
    #[error("no execution backend registered")]
    NoBackend,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Everything `main` needs to run and later shut down the daemon.
pub struct StartupResult {
    pub supervisor: Arc<Supervisor<HttpStore, SystemClock>>,
    pub drain: Arc<DrainLoop<HttpStore, SystemClock>>,
    pub push: Option<PushClient>,
    pub intake: Option<Arc<IntakeWorker<HttpStore>>>,
    pub feedback: Option<Arc<FeedbackWorker<HttpStore>>>,
    pub device_id: String,
    /// Held for the daemon's lifetime; dropping releases the lock.
    pub lock_file: File,
}

/// Acquire the exclusive daemon lock, writing our pid into it.
fn acquire_lock(config: &Config) -> Result<File, LifecycleError> {
    std::fs::create_dir_all(&config.state_dir)?;
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .open(&config.lock_path)?;
    file.try_lock_exclusive()
        .map_err(|_| LifecycleError::LockFailed(config.lock_path.display().to_string()))?;
    file.set_len(0)?;
    writeln!(file, "{}", std::process::id())?;
    Ok(file)
}

/// Start the daemon: lock, identity, handshake, component composition.
pub async fn startup(config: &Config) -> Result<StartupResult, LifecycleError> {
    let lock_file = acquire_lock(config)?;
    let (_identity, device_id) = load_or_create_identity(&config.state_dir)?;

    let clock = SystemClock;
    let store = Arc::new(HttpStore::new(
        config.convex_url.clone(),
        config.flux_token.clone(),
    ));

    // Gateway + handshake: push configuration and batch hints.
    let gateway = config.gateway_url.as_ref().map(|url| {
        Arc::new(GatewayClient::new(
            url.clone(),
            config.gateway_token.clone().unwrap_or_default(),
        ))
    });
    let handshake = match &gateway {
        Some(gateway) => Some(
            gateway
                .handshake(&device_id)
                .await
                .map_err(|e| LifecycleError::Handshake(e.to_string()))?,
        ),
        None => {
            tracing::warn!("no gateway configured; push, intake, and feedback disabled");
            None
        }
    };

    // Execution backends. Direct CLI spawning is an opt-in
    // (FLUX_ALLOW_DIRECT_CLI); with no backend registered the daemon
    // cannot do useful work and exits.
    let mut registry = BackendRegistry::new();
    if config.allow_direct_cli {
        registry.register(Arc::new(CliBackend::claude()));
        registry.register(Arc::new(CliBackend::new("codex-cli", "codex")));
    }
    if registry.is_empty() {
        return Err(LifecycleError::NoBackend);
    }

    let sessions = Arc::new(SessionRegistry::new());
    let executor = Arc::new(
        TaskExecutor::new(
            Arc::clone(&store),
            registry,
            Arc::clone(&sessions),
            clock.clone(),
        )
        .with_runner_backend(config.backend.clone()),
    );
    let scheduler = Arc::new(CadenceScheduler::new(Arc::clone(&store), clock.clone()));
    let supervisor = Arc::new(Supervisor::new(
        Arc::clone(&store),
        Arc::clone(&executor),
        scheduler,
        Arc::clone(&sessions),
        clock.clone(),
        SupervisorConfig {
            max_concurrent: config.max_concurrent,
            max_pending_review: config.max_pending_review,
            auto_pause_threshold: config.auto_pause_after_n_fails,
            ..SupervisorConfig::default()
        },
    ));

    let batch_limit = handshake.as_ref().and_then(|h| h.batch_limit).unwrap_or(10);
    let drain = Arc::new(DrainLoop::new(
        Arc::clone(&store),
        Arc::clone(&executor),
        DrainLoopConfig {
            limit: batch_limit,
            backend: config.backend.clone(),
            ..DrainLoopConfig::default()
        },
    ));

    let push = match (&gateway, handshake.as_ref().and_then(|h| h.ws_url.clone())) {
        (Some(gateway), Some(ws_url)) => Some(PushClient::new(
            (**gateway).clone(),
            PushClientConfig::new(ws_url),
        )),
        _ => None,
    };

    let (intake, feedback) = match &gateway {
        Some(gateway) => {
            let mut adapters = IntakeAdapterRegistry::new();
            adapters.register(Arc::new(GithubIntakeAdapter::new()));
            let ctx = IntakeContext {
                store: Arc::clone(&store) as Arc<dyn flux_store::Store>,
                gateway: Arc::clone(gateway),
                repo_workspace_root: config.repo_workspace_root.clone(),
            };
            let intake = Arc::new(IntakeWorker::new(
                Arc::clone(&store),
                adapters,
                ctx,
                IntakeWorkerConfig::default(),
            ));
            let feedback = Arc::new(FeedbackWorker::new(
                Arc::clone(&store),
                Arc::clone(gateway),
                config.repo_workspace_root.clone(),
                FeedbackWorkerConfig::default(),
            ));
            (Some(intake), Some(feedback))
        }
        None => (None, None),
    };

    tracing::info!(device_id = %device_id, "startup complete");
    Ok(StartupResult {
        supervisor,
        drain,
        push,
        intake,
        feedback,
        device_id,
        lock_file,
    })
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
