// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Active-session registry.
//!
//! One entry per executing backend subprocess. Every dispatch path consults
//! the same registry, which is what bounds work-in-progress: a task cannot
//! be dispatched while it has a live session, and the session count caps
//! concurrency.

use flux_core::{AgentSession, TaskId};
use parking_lot::Mutex;
use std::collections::HashMap;
use tokio_util::sync::CancellationToken;

struct Entry {
    session: AgentSession,
    cancel: CancellationToken,
}

/// Shared registry of active sessions.
#[derive(Default)]
pub struct SessionRegistry {
    entries: Mutex<HashMap<TaskId, Entry>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session for a task. Returns `false` (and leaves the
    /// existing entry untouched) if the task already has one.
    pub fn insert(&self, session: AgentSession, cancel: CancellationToken) -> bool {
        let mut entries = self.entries.lock();
        if entries.contains_key(&session.task_id) {
            return false;
        }
        entries.insert(session.task_id.clone(), Entry { session, cancel });
        true
    }

    /// Remove and return the session for a task.
    pub fn remove(&self, task_id: &TaskId) -> Option<AgentSession> {
        self.entries.lock().remove(task_id).map(|e| e.session)
    }

    pub fn contains(&self, task_id: &TaskId) -> bool {
        self.entries.lock().contains_key(task_id)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Task ids with live sessions.
    pub fn task_ids(&self) -> Vec<TaskId> {
        self.entries.lock().keys().cloned().collect()
    }

    /// Cancel every active session, recording the kill reason.
    pub fn kill_all(&self, now_ms: u64, reason: &str) {
        let mut entries = self.entries.lock();
        for entry in entries.values_mut() {
            entry.session.mark_killed(now_ms, reason);
            entry.cancel.cancel();
        }
    }

    /// Cancel one session. Returns `false` when the task has none.
    pub fn kill(&self, task_id: &TaskId, now_ms: u64, reason: &str) -> bool {
        let mut entries = self.entries.lock();
        match entries.get_mut(task_id) {
            Some(entry) => {
                entry.session.mark_killed(now_ms, reason);
                entry.cancel.cancel();
                true
            }
            None => false,
        }
    }

    /// Snapshot of a task's session, if any.
    pub fn get(&self, task_id: &TaskId) -> Option<AgentSession> {
        self.entries.lock().get(task_id).map(|e| e.session.clone())
    }
}

#[cfg(test)]
#[path = "sessions_tests.rs"]
mod tests;
