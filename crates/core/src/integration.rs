// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Configured external sources of work.

use serde::{Deserialize, Serialize};
use serde_json::Value;

crate::define_id! {
    /// Unique identifier for an integration.
    pub struct IntegrationId;
}

/// A configured external source, e.g. a GitHub repository.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Integration {
    pub id: IntegrationId,
    /// Adapter kind, e.g. `"github"`.
    pub kind: String,
    /// Adapter-specific configuration, opaque to the runtime.
    #[serde(default)]
    pub config: Value,
    /// Adapter-private cursor marking how far polling has progressed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intake_cursor: Option<String>,
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl Integration {
    /// Read a string field out of the adapter config.
    pub fn config_str(&self, key: &str) -> Option<&str> {
        self.config.get(key).and_then(|v| v.as_str())
    }
}

/// A canonical record of an ingested external item, ready for the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewIntakeEvent {
    pub integration_id: IntegrationId,
    pub resource_type: String,
    pub resource_id: String,
    pub payload: Value,
    /// When false, routing to a task is a separate explicit step.
    pub auto_route: bool,
}
