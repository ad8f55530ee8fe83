// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake backend for testing.
//!
//! Records every execution and returns scripted results. In held mode each
//! execution blocks until the test releases it, which is how concurrency
//! bounds are exercised without real subprocesses.

use super::{Backend, ExecStatus, ExecuteRequest, ExecuteResult};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Notify;

/// One recorded call to `execute`.
#[derive(Debug, Clone)]
pub struct RecordedExecution {
    pub task_id: String,
    pub prompt: String,
    pub model: Option<String>,
}

#[derive(Default)]
struct Inner {
    results: HashMap<String, ExecuteResult>,
    calls: Vec<RecordedExecution>,
    held: bool,
    gates: HashMap<String, Arc<Notify>>,
}

/// Scripted backend.
#[derive(Clone)]
pub struct FakeBackend {
    id: String,
    inner: Arc<Mutex<Inner>>,
}

impl FakeBackend {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            inner: Arc::new(Mutex::new(Inner::default())),
        }
    }

    /// Hold every execution until [`FakeBackend::release`] is called for it.
    pub fn hold_executions(&self) {
        self.inner.lock().held = true;
    }

    /// Release a held execution for the given task.
    pub fn release(&self, task_id: &str) {
        let gate = self.gate(task_id);
        gate.notify_one();
    }

    /// Script the result returned for a task (default: `done` with "ok").
    pub fn set_result(&self, task_id: &str, result: ExecuteResult) {
        self.inner
            .lock()
            .results
            .insert(task_id.to_string(), result);
    }

    /// Script a failure for a task.
    pub fn fail_task(&self, task_id: &str, message: &str) {
        self.set_result(task_id, ExecuteResult::failed(message));
    }

    pub fn calls(&self) -> Vec<RecordedExecution> {
        self.inner.lock().calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.inner.lock().calls.len()
    }

    /// Task ids executed, in call order.
    pub fn executed_task_ids(&self) -> Vec<String> {
        self.inner
            .lock()
            .calls
            .iter()
            .map(|c| c.task_id.clone())
            .collect()
    }

    fn gate(&self, task_id: &str) -> Arc<Notify> {
        let mut inner = self.inner.lock();
        Arc::clone(
            inner
                .gates
                .entry(task_id.to_string())
                .or_insert_with(|| Arc::new(Notify::new())),
        )
    }
}

#[async_trait]
impl Backend for FakeBackend {
    fn id(&self) -> &str {
        &self.id
    }

    async fn execute(&self, req: ExecuteRequest) -> ExecuteResult {
        let held = {
            let mut inner = self.inner.lock();
            inner.calls.push(RecordedExecution {
                task_id: req.task_id.to_string(),
                prompt: req.prompt.clone(),
                model: req.model.clone(),
            });
            inner.held
        };

        if held {
            let gate = self.gate(req.task_id.as_str());
            tokio::select! {
                _ = gate.notified() => {}
                _ = req.cancel.cancelled() => return ExecuteResult::cancelled(),
            }
        } else if req.cancel.is_cancelled() {
            return ExecuteResult::cancelled();
        }

        let scripted = self.inner.lock().results.get(req.task_id.as_str()).cloned();
        scripted.unwrap_or_else(|| ExecuteResult {
            status: ExecStatus::Done,
            output: "ok".to_string(),
            tokens_used: None,
            cost_usd: None,
        })
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
