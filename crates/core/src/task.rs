// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task identity and status state machine.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

crate::define_id! {
    /// Unique identifier for a task.
    ///
    /// Each task gets a store-assigned ID used to track its status,
    /// reference it in sessions, and correlate feedback events.
    pub struct TaskId;
}

crate::define_id! {
    /// Identifier for a stream (a logical grouping of related tasks).
    pub struct StreamId;
}

/// Status of a task.
///
/// Transitions are only valid along the graph encoded in
/// [`TaskStatus::can_transition`]; `done` and `cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Todo,
    Doing,
    Blocked,
    Review,
    Done,
    Failed,
    Cancelled,
}

impl TaskStatus {
    /// All statuses, in declaration order.
    pub const ALL: [TaskStatus; 7] = [
        TaskStatus::Todo,
        TaskStatus::Doing,
        TaskStatus::Blocked,
        TaskStatus::Review,
        TaskStatus::Done,
        TaskStatus::Failed,
        TaskStatus::Cancelled,
    ];

    /// Statuses reachable from `self` in a single transition.
    pub fn allowed_transitions(self) -> &'static [TaskStatus] {
        use TaskStatus::*;
        match self {
            Todo => &[Doing, Blocked, Failed, Cancelled],
            Doing => &[Review, Done, Blocked, Failed, Cancelled],
            Blocked => &[Todo, Doing, Failed, Cancelled],
            Review => &[Done, Doing, Failed, Cancelled],
            Failed => &[Todo, Cancelled],
            Done | Cancelled => &[],
        }
    }

    /// Check whether a transition from `self` to `to` is allowed.
    pub fn can_transition(self, to: TaskStatus) -> bool {
        self.allowed_transitions().contains(&to)
    }

    /// Check if this status is terminal (no further transitions).
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Done | TaskStatus::Cancelled)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskStatus::Todo => "todo",
            TaskStatus::Doing => "doing",
            TaskStatus::Blocked => "blocked",
            TaskStatus::Review => "review",
            TaskStatus::Done => "done",
            TaskStatus::Failed => "failed",
            TaskStatus::Cancelled => "cancelled",
        };
        write!(f, "{}", s)
    }
}

/// Rejected status transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid task transition: {from} -> {to}")]
pub struct TransitionError {
    pub from: TaskStatus,
    pub to: TaskStatus,
}

/// A unit of agent work.
///
/// The remote store owns the persistent row; this is the wire shape the
/// runtime reads and mutates through the typed client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub status: TaskStatus,
    /// Agent backend class (immutable after creation).
    pub kind: String,
    /// Opaque input, typically JSON.
    #[serde(default)]
    pub input: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream_id: Option<StreamId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<TaskId>,
    #[serde(default)]
    pub retry_count: u32,
    /// Epoch milliseconds of the first transition to `doing`. Set once.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at_ms: Option<u64>,
    /// Human-readable goal, when the creator supplied one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal: Option<String>,
}

impl Task {
    /// Create a new `todo` task of the given backend kind.
    pub fn new(id: TaskId, kind: impl Into<String>, input: impl Into<String>) -> Self {
        Self {
            id,
            status: TaskStatus::Todo,
            kind: kind.into(),
            input: input.into(),
            stream_id: None,
            agent_id: None,
            dependencies: Vec::new(),
            retry_count: 0,
            started_at_ms: None,
            goal: None,
        }
    }

    /// Attach a stream.
    pub fn with_stream(mut self, stream_id: StreamId) -> Self {
        self.stream_id = Some(stream_id);
        self
    }

    /// Apply a status transition, enforcing the allowed graph.
    ///
    /// `started_at_ms` is set exactly once, on the first transition to
    /// `doing`; later transitions leave it untouched.
    pub fn apply_status(&mut self, to: TaskStatus, now_ms: u64) -> Result<(), TransitionError> {
        if !self.status.can_transition(to) {
            return Err(TransitionError {
                from: self.status,
                to,
            });
        }
        if to == TaskStatus::Doing && self.started_at_ms.is_none() {
            self.started_at_ms = Some(now_ms);
        }
        self.status = to;
        Ok(())
    }
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;
