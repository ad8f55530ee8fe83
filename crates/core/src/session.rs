// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory record of an executing backend session.
//!
//! Sessions are ephemeral: created when the executor spawns a backend for a
//! task, destroyed on natural exit or cancellation. The remote store never
//! sees them; they exist to bound work-in-progress.

use crate::task::TaskId;
use serde::{Deserialize, Serialize};
use std::fmt;

crate::define_id! {
    /// Unique identifier for an agent session.
    pub struct SessionId;
}

/// Status of a running agent session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Running,
    Idle,
    Failed,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionStatus::Running => write!(f, "running"),
            SessionStatus::Idle => write!(f, "idle"),
            SessionStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Per-task execution record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentSession {
    pub id: SessionId,
    pub task_id: TaskId,
    pub backend_id: String,
    pub status: SessionStatus,
    pub last_heartbeat_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens_used: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_usd: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub killed_at_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kill_reason: Option<String>,
}

impl AgentSession {
    /// Create a running session for a task.
    pub fn new(id: SessionId, task_id: TaskId, backend_id: impl Into<String>, now_ms: u64) -> Self {
        Self {
            id,
            task_id,
            backend_id: backend_id.into(),
            status: SessionStatus::Running,
            last_heartbeat_ms: now_ms,
            tokens_used: None,
            cost_usd: None,
            killed_at_ms: None,
            kill_reason: None,
        }
    }

    /// Record a heartbeat.
    pub fn touch(&mut self, now_ms: u64) {
        self.last_heartbeat_ms = now_ms;
    }

    /// Mark the session killed. First reason wins.
    pub fn mark_killed(&mut self, now_ms: u64, reason: impl Into<String>) {
        if self.killed_at_ms.is_none() {
            self.killed_at_ms = Some(now_ms);
            self.kill_reason = Some(reason.into());
        }
        self.status = SessionStatus::Failed;
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
