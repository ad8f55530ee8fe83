// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Row and argument shapes for store endpoints.

use flux_core::{StreamId, TaskStatus};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Per-status task counts, as returned by `tasks.countByStatus`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusCounts {
    pub todo: u64,
    pub doing: u64,
    pub blocked: u64,
    pub review: u64,
    pub done: u64,
    pub failed: u64,
    pub cancelled: u64,
}

impl StatusCounts {
    pub fn get(&self, status: TaskStatus) -> u64 {
        match status {
            TaskStatus::Todo => self.todo,
            TaskStatus::Doing => self.doing,
            TaskStatus::Blocked => self.blocked,
            TaskStatus::Review => self.review,
            TaskStatus::Done => self.done,
            TaskStatus::Failed => self.failed,
            TaskStatus::Cancelled => self.cancelled,
        }
    }
}

/// A stream row, as returned by `streams.list`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stream {
    pub id: StreamId,
    pub name: String,
    #[serde(default)]
    pub active: bool,
    /// JSON array of cadence entries; parsed leniently by the scheduler.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cadence_config_json: Option<String>,
}

/// A playbook row.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Playbook {
    pub id: String,
    pub slug: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream_id: Option<StreamId>,
    /// `"active"` playbooks are runnable; anything else is skipped.
    pub status: String,
}

/// A legacy cron-type trigger row, as returned by
/// `playbook_triggers.getEnabledCrons`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CronTrigger {
    pub id: String,
    pub playbook_slug: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream_id: Option<StreamId>,
    /// JSON object carrying a `schedule` cadence.
    #[serde(default)]
    pub config_json: String,
}

/// Arguments to `runs.create`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRun {
    pub playbook_id: String,
    pub thread_id: String,
    pub params_json: String,
}

/// Filter for the compact/packet todo-task listing used by the drain loop.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PacketFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream_id: Option<StreamId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_class: Option<String>,
    pub limit: usize,
}

/// Execution-repo context for a task, as returned by
/// `tasks.getExecutionRepoContext`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo: Option<String>,
}

/// A scoped key-value entry (`memory_kv` table).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KvEntry {
    pub stream_id: StreamId,
    pub namespace: String,
    pub key: String,
    pub value: String,
}

/// Partial update for an integration row.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrationPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intake_cursor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    /// When true, a `None` in `last_error` clears the stored value.
    #[serde(default)]
    pub clear_last_error: bool,
}

impl IntegrationPatch {
    pub fn cursor(cursor: impl Into<String>) -> Self {
        Self {
            intake_cursor: Some(cursor.into()),
            ..Self::default()
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            last_error: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn clear_error() -> Self {
        Self {
            clear_last_error: true,
            ..Self::default()
        }
    }
}
