// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Intake adapters.
//!
//! An intake adapter polls one kind of external source (matched by
//! `integration.kind`), ingests new items as intake events, and reports an
//! updated cursor. Adapters are independent: one failing poll never blocks
//! another integration.

mod github;

pub use github::GithubIntakeAdapter;

use crate::gateway::{CapabilityError, GatewayClient};
use async_trait::async_trait;
use flux_core::Integration;
use flux_store::{Store, StoreError};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// Errors from a single integration poll.
#[derive(Debug, Error)]
pub enum IntakeError {
    #[error(transparent)]
    Provider(#[from] CapabilityError),
    #[error(transparent)]
    Store(#[from] Box<StoreError>),
    #[error("invalid integration config: {0}")]
    Config(String),
}

impl From<StoreError> for IntakeError {
    fn from(e: StoreError) -> Self {
        IntakeError::Store(Box::new(e))
    }
}

/// Shared handles an adapter needs to do its work.
#[derive(Clone)]
pub struct IntakeContext {
    pub store: Arc<dyn Store>,
    pub gateway: Arc<GatewayClient>,
    /// Root under which execution repos are checked out.
    pub repo_workspace_root: Option<PathBuf>,
}

/// Result of one poll.
#[derive(Debug, Clone, Default)]
pub struct IntakePollOutcome {
    pub ingested: usize,
    /// New cursor to persist on the integration, when it advanced.
    pub cursor: Option<String>,
}

/// Polls one kind of external source.
#[async_trait]
pub trait IntakeAdapter: Send + Sync + 'static {
    /// Integration kind this adapter serves, e.g. `"github"`.
    fn kind(&self) -> &str;

    /// Poll one integration for new items.
    async fn poll(
        &self,
        integration: &Integration,
        ctx: &IntakeContext,
    ) -> Result<IntakePollOutcome, IntakeError>;
}

/// Maps integration kinds to adapters.
#[derive(Clone, Default)]
pub struct IntakeAdapterRegistry {
    adapters: HashMap<String, Arc<dyn IntakeAdapter>>,
}

impl IntakeAdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, adapter: Arc<dyn IntakeAdapter>) {
        self.adapters.insert(adapter.kind().to_string(), adapter);
    }

    pub fn get(&self, kind: &str) -> Option<Arc<dyn IntakeAdapter>> {
        self.adapters.get(kind).cloned()
    }
}
