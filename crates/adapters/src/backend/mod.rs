// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Execution backends.
//!
//! A backend turns a materialized prompt into agent output. Backends are
//! registered under normalized ids; selection happens in the packet
//! (`execution.backend` → `prompt.backend` → runner fallback → default).

mod cli;
mod output;

pub use cli::CliBackend;
pub use output::parse_agent_output;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub mod fake;

use async_trait::async_trait;
use flux_core::{normalize_backend, TaskId};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Default per-execution timeout.
pub const DEFAULT_EXECUTE_TIMEOUT: Duration = Duration::from_secs(300);

/// A request to execute one task.
#[derive(Debug, Clone)]
pub struct ExecuteRequest {
    pub task_id: TaskId,
    pub prompt: String,
    pub model: Option<String>,
    pub allowed_tools: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub timeout: Duration,
    /// Cancelling this token aborts the execution (SIGTERM to subprocesses).
    pub cancel: CancellationToken,
}

impl ExecuteRequest {
    pub fn new(task_id: TaskId, prompt: impl Into<String>) -> Self {
        Self {
            task_id,
            prompt: prompt.into(),
            model: None,
            allowed_tools: Vec::new(),
            cwd: None,
            timeout: DEFAULT_EXECUTE_TIMEOUT,
            cancel: CancellationToken::new(),
        }
    }
}

/// Terminal status of an execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecStatus {
    Done,
    Failed,
    Cancelled,
}

/// Outcome of an execution. Failures are a status, not an error: the
/// backend always produces a result the supervisor can classify.
#[derive(Debug, Clone)]
pub struct ExecuteResult {
    pub status: ExecStatus,
    pub output: String,
    pub tokens_used: Option<u64>,
    pub cost_usd: Option<f64>,
}

impl ExecuteResult {
    pub fn done(output: impl Into<String>) -> Self {
        Self {
            status: ExecStatus::Done,
            output: output.into(),
            tokens_used: None,
            cost_usd: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: ExecStatus::Failed,
            output: message.into(),
            tokens_used: None,
            cost_usd: None,
        }
    }

    pub fn cancelled() -> Self {
        Self {
            status: ExecStatus::Cancelled,
            output: "Cancelled by user request".to_string(),
            tokens_used: None,
            cost_usd: None,
        }
    }

    pub fn ok(&self) -> bool {
        self.status == ExecStatus::Done
    }
}

/// An execution backend.
#[async_trait]
pub trait Backend: Send + Sync + 'static {
    /// Backend id (normalized form, e.g. `"claude-cli"`).
    fn id(&self) -> &str;

    /// Execute a task to completion, honoring timeout and cancellation.
    async fn execute(&self, req: ExecuteRequest) -> ExecuteResult;
}

/// Errors from backend resolution.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("no execution backend registered")]
    Empty,
    #[error("unknown backend: {0}")]
    Unknown(String),
}

/// Maps normalized backend ids to executors.
#[derive(Clone, Default)]
pub struct BackendRegistry {
    backends: HashMap<String, Arc<dyn Backend>>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a backend under its normalized id. Last registration wins.
    pub fn register(&mut self, backend: Arc<dyn Backend>) {
        let id = normalize_backend(backend.id());
        self.backends.insert(id, backend);
    }

    /// Resolve a backend id (alias-normalized) to its executor.
    pub fn resolve(&self, id: &str) -> Result<Arc<dyn Backend>, RegistryError> {
        if self.backends.is_empty() {
            return Err(RegistryError::Empty);
        }
        let normalized = normalize_backend(id);
        self.backends
            .get(&normalized)
            .cloned()
            .ok_or(RegistryError::Unknown(normalized))
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    /// Registered ids, sorted.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.backends.keys().cloned().collect();
        ids.sort();
        ids
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
