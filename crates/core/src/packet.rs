// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Server-formed task packet.
//!
//! The store hands out tasks in a compact "packet" format bundling the task
//! row with its prompt material and execution hints. The runtime never
//! renders templates itself; it prefers the server-rendered prompt and only
//! assembles the raw pieces as a fallback.

use crate::backend::{normalize_backend, DEFAULT_BACKEND};
use crate::task::Task;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Prompt material for a task.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rendered: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub vars: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allowed_tools: Vec<String>,
}

/// Execution hints for a task.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_class: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

/// The bundle describing a task, its prompt, and its execution hints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskPacket {
    pub task: Task,
    #[serde(default)]
    pub prompt: PromptSpec,
    #[serde(default)]
    pub execution: ExecutionSpec,
}

impl TaskPacket {
    /// Packet with no prompt material beyond the task itself.
    pub fn bare(task: Task) -> Self {
        Self {
            task,
            prompt: PromptSpec::default(),
            execution: ExecutionSpec::default(),
        }
    }

    /// Materialize the prompt text for this packet.
    ///
    /// The server-rendered prompt wins when non-empty; otherwise the raw
    /// pieces (template, vars, context, task input) are concatenated.
    pub fn materialize_prompt(&self) -> String {
        if let Some(rendered) = &self.prompt.rendered {
            if !rendered.trim().is_empty() {
                return rendered.clone();
            }
        }

        let mut sections: Vec<String> = Vec::new();
        if let Some(template) = &self.prompt.template {
            if !template.is_empty() {
                sections.push(template.clone());
            }
        }
        if !self.prompt.vars.is_null() {
            sections.push(self.prompt.vars.to_string());
        }
        if let Some(context) = &self.prompt.context {
            if !context.is_empty() {
                sections.push(context.clone());
            }
        }
        if !self.task.input.is_empty() {
            sections.push(format!("Task: {}", self.task.input));
        }
        sections.join("\n\n")
    }

    /// Resolve the backend id for this packet.
    ///
    /// Order: execution hint, prompt hint, runner fallback, default. The
    /// winner is alias-normalized.
    pub fn resolve_backend(&self, runner_fallback: Option<&str>) -> String {
        let raw = self
            .execution
            .backend
            .as_deref()
            .or(self.prompt.backend.as_deref())
            .or(runner_fallback)
            .unwrap_or(DEFAULT_BACKEND);
        normalize_backend(raw)
    }
}

#[cfg(test)]
#[path = "packet_tests.rs"]
mod tests;
