// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Repo-local policy file.
//!
//! Repositories opt into runner behavior through `.flux/golden-path.yaml`.
//! Loading is lenient: a missing or malformed file yields `None` and the
//! caller falls back to integration-level configuration.

use serde::Deserialize;
use std::path::Path;

/// Relative path of the policy file inside a repository.
pub const GOLDEN_PATH_FILE: &str = ".flux/golden-path.yaml";

/// Parsed `.flux/golden-path.yaml`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GoldenPathConfig {
    pub feedback: FeedbackSection,
    pub lifecycle: Vec<LifecycleStage>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FeedbackSection {
    pub github: GithubFeedback,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GithubFeedback {
    #[serde(rename = "postTaskStatusComments")]
    pub post_task_status_comments: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LifecycleStage {
    pub statuses: Vec<LifecycleStatus>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LifecycleStatus {
    pub name: String,
}

impl GoldenPathConfig {
    /// Load the policy file from a repository root. `None` when the file is
    /// absent or unreadable as YAML.
    pub fn load(repo_root: &Path) -> Option<Self> {
        let content = std::fs::read_to_string(repo_root.join(GOLDEN_PATH_FILE)).ok()?;
        Self::parse(&content)
    }

    /// Parse policy YAML.
    pub fn parse(content: &str) -> Option<Self> {
        serde_yaml::from_str(content).ok()
    }

    /// Whether the repo opted into task-status comments.
    pub fn post_task_status_comments(&self) -> bool {
        self.feedback.github.post_task_status_comments
    }

    /// All lifecycle status names, flattened in declaration order.
    pub fn lifecycle_status_names(&self) -> Vec<String> {
        self.lifecycle
            .iter()
            .flat_map(|stage| stage.statuses.iter().map(|s| s.name.clone()))
            .collect()
    }
}

#[cfg(test)]
#[path = "golden_path_tests.rs"]
mod tests;
