// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event-sourced run state.
//!
//! A run's state is never stored directly; it is reconstructed by folding an
//! ordered sequence of run events. The fold is pure and deterministic: events
//! are sorted by `seq` before application, so any permutation of the same
//! event set reduces to the same state.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

crate::define_id! {
    /// Unique identifier for a run (an instance of a playbook).
    pub struct RunId;
}

/// Status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Pending,
    Running,
    Paused,
    Completed,
    Failed,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::Pending => write!(f, "pending"),
            RunStatus::Running => write!(f, "running"),
            RunStatus::Paused => write!(f, "paused"),
            RunStatus::Completed => write!(f, "completed"),
            RunStatus::Failed => write!(f, "failed"),
        }
    }
}

/// One event in a run's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunEvent {
    pub run_id: RunId,
    pub seq: u64,
    pub created_at_ms: u64,
    #[serde(flatten)]
    pub kind: RunEventKind,
}

/// Kind + payload of a run event. Unknown type tags deserialize to
/// `Unknown` and are ignored by the reducer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunEventKind {
    RunStarted {
        #[serde(default = "empty_object")]
        initial_state: Value,
    },
    StepStarted {
        step: String,
    },
    StateDeltaApplied {
        #[serde(default)]
        step: Option<String>,
        #[serde(default = "empty_object")]
        delta: Value,
    },
    StepCompleted {
        step: String,
    },
    StepFailed {
        step: String,
        error: String,
    },
    RunPaused,
    RunResumed,
    RunCompleted,
    RunFailed {
        error: String,
    },
    #[serde(other)]
    Unknown,
}

fn empty_object() -> Value {
    Value::Object(serde_json::Map::new())
}

/// Reconstructed state of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunState {
    pub run_id: RunId,
    pub status: RunStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_step: Option<String>,
    pub state_version: u64,
    pub data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RunState {
    /// Fresh pending state with empty data.
    pub fn new(run_id: RunId) -> Self {
        Self {
            run_id,
            status: RunStatus::Pending,
            current_step: None,
            state_version: 0,
            data: Value::Object(serde_json::Map::new()),
            started_at_ms: None,
            updated_at_ms: None,
            completed_at_ms: None,
            error: None,
        }
    }
}

/// Recursively merge `patch` into `base`.
///
/// Objects merge key-wise; arrays and primitives replace. A key present only
/// in the patch is inserted.
pub fn deep_merge(base: Value, patch: Value) -> Value {
    match (base, patch) {
        (Value::Object(mut base_map), Value::Object(patch_map)) => {
            for (key, patch_value) in patch_map {
                let merged = match base_map.remove(&key) {
                    Some(base_value) => deep_merge(base_value, patch_value),
                    None => patch_value,
                };
                base_map.insert(key, merged);
            }
            Value::Object(base_map)
        }
        (_, patch) => patch,
    }
}

/// Apply one event to a state. Unknown events are no-ops.
fn apply_event(mut state: RunState, event: &RunEvent) -> RunState {
    match &event.kind {
        RunEventKind::RunStarted { initial_state } => {
            state.status = RunStatus::Running;
            state.data = deep_merge(state.data, initial_state.clone());
            state.state_version += 1;
            if state.started_at_ms.is_none() {
                state.started_at_ms = Some(event.created_at_ms);
            }
        }
        RunEventKind::StepStarted { step } => {
            state.current_step = Some(step.clone());
        }
        RunEventKind::StateDeltaApplied { step, delta } => {
            if let Some(step) = step {
                state.current_step = Some(step.clone());
            }
            state.data = deep_merge(state.data, delta.clone());
            state.state_version += 1;
        }
        RunEventKind::StepCompleted { step } => {
            state.current_step = Some(step.clone());
        }
        RunEventKind::StepFailed { step, error } => {
            state.status = RunStatus::Failed;
            state.current_step = Some(step.clone());
            state.error = Some(error.clone());
        }
        RunEventKind::RunPaused => {
            state.status = RunStatus::Paused;
        }
        RunEventKind::RunResumed => {
            state.status = RunStatus::Running;
        }
        RunEventKind::RunCompleted => {
            state.status = RunStatus::Completed;
            state.completed_at_ms = Some(event.created_at_ms);
        }
        RunEventKind::RunFailed { error } => {
            state.status = RunStatus::Failed;
            state.error = Some(error.clone());
        }
        RunEventKind::Unknown => return state,
    }
    state.updated_at_ms = Some(event.created_at_ms);
    state
}

/// Fold events over an initial state, sorted by `seq` ascending.
pub fn reduce_run_events(initial: RunState, events: &[RunEvent]) -> RunState {
    let mut ordered: Vec<&RunEvent> = events.iter().collect();
    ordered.sort_by_key(|e| e.seq);
    ordered.into_iter().fold(initial, |state, event| {
        apply_event(state, event)
    })
}

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;
