// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! GitHub intake adapter.
//!
//! Lists issues through the gateway's GitHub capability, ingests the ones
//! the cursor has not covered yet, and routes each ingested event to an
//! agent task. Poll statuses come from the repo's golden-path lifecycle
//! when present, else from the integration's configured stages.

use super::{IntakeAdapter, IntakeContext, IntakeError, IntakePollOutcome};
use crate::golden_path::GoldenPathConfig;
use async_trait::async_trait;
use flux_core::{Integration, NewIntakeEvent};
use flux_store::Store;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;

/// GitHub issue poller.
#[derive(Debug, Clone, Default)]
pub struct GithubIntakeAdapter;

impl GithubIntakeAdapter {
    pub fn new() -> Self {
        Self
    }
}

/// Statuses worth polling: golden-path lifecycle first, configured stages
/// as the fallback.
fn select_statuses(golden: Option<&GoldenPathConfig>, integration: &Integration) -> Vec<String> {
    if let Some(config) = golden {
        let names = config.lifecycle_status_names();
        if !names.is_empty() {
            return names;
        }
    }
    integration
        .config
        .get("stages")
        .and_then(Value::as_array)
        .map(|stages| {
            stages
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Issue number carried by a raw issue payload.
fn issue_number(issue: &Value) -> Option<u64> {
    issue.get("number").and_then(Value::as_u64)
}

/// Issues the cursor has not covered yet, in listing order.
fn issues_after_cursor<'a>(issues: &'a [Value], cursor: Option<u64>) -> Vec<&'a Value> {
    issues
        .iter()
        .filter(|issue| match (issue_number(issue), cursor) {
            (Some(number), Some(last_seen)) => number > last_seen,
            (Some(_), None) => true,
            (None, _) => false,
        })
        .collect()
}

/// Highest issue number in a listing.
fn max_issue_number(issues: &[Value]) -> Option<u64> {
    issues.iter().filter_map(issue_number).max()
}

/// Ingest issues as intake events and route each to an agent task.
async fn ingest_issues(
    store: &Arc<dyn Store>,
    integration: &Integration,
    owner: &str,
    repo: &str,
    issues: &[&Value],
) -> Result<usize, IntakeError> {
    let mut ingested = 0;
    for issue in issues {
        let Some(number) = issue_number(issue) else {
            continue;
        };
        let event_id = store
            .ingest_intake_event(NewIntakeEvent {
                integration_id: integration.id.clone(),
                resource_type: "issue".to_string(),
                resource_id: format!("{}/{}#{}", owner, repo, number),
                payload: (*issue).clone(),
                auto_route: false,
            })
            .await?;
        store.route_intake_event(&event_id).await?;
        ingested += 1;
    }
    Ok(ingested)
}

#[async_trait]
impl IntakeAdapter for GithubIntakeAdapter {
    fn kind(&self) -> &str {
        "github"
    }

    async fn poll(
        &self,
        integration: &Integration,
        ctx: &IntakeContext,
    ) -> Result<IntakePollOutcome, IntakeError> {
        let owner = integration
            .config_str("owner")
            .ok_or_else(|| IntakeError::Config("missing owner".to_string()))?
            .to_string();
        let repo = integration
            .config_str("repo")
            .ok_or_else(|| IntakeError::Config("missing repo".to_string()))?
            .to_string();

        // Repo-local policy, when a checkout exists.
        let repo_root: Option<PathBuf> = integration
            .config_str("repoPath")
            .map(PathBuf::from)
            .or_else(|| ctx.repo_workspace_root.as_ref().map(|root| root.join(&repo)));
        let golden = repo_root.as_deref().and_then(GoldenPathConfig::load);

        let statuses = select_statuses(golden.as_ref(), integration);

        let result = ctx
            .gateway
            .invoke(
                "github.listIssues",
                json!({"owner": owner, "repo": repo, "statuses": statuses}),
            )
            .await?;
        let issues: Vec<Value> = result
            .content
            .as_array()
            .cloned()
            .unwrap_or_default();

        let cursor = integration
            .intake_cursor
            .as_deref()
            .and_then(|c| c.parse::<u64>().ok());
        let fresh = issues_after_cursor(&issues, cursor);

        let ingested = ingest_issues(&ctx.store, integration, &owner, &repo, &fresh).await?;

        tracing::debug!(
            integration = %integration.id,
            ingested,
            total = issues.len(),
            "github poll complete"
        );

        Ok(IntakePollOutcome {
            ingested,
            cursor: max_issue_number(&issues).map(|n| n.to_string()),
        })
    }
}

#[cfg(test)]
#[path = "github_tests.rs"]
mod tests;
