// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for store access

use flux_core::TransitionError;
use thiserror::Error;

/// Errors that can occur talking to the remote state store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Network-level failure; callers may retry with backoff.
    #[error("store transport error: {0}")]
    Transport(String),
    /// The store rejected the call.
    #[error("store error on {endpoint}: {message}")]
    Api { endpoint: String, message: String },
    /// Response did not match the expected shape.
    #[error("store response decode error: {0}")]
    Decode(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("timed out waiting for task {0} to settle")]
    AwaitTimeout(String),
    #[error(transparent)]
    InvalidTransition(#[from] TransitionError),
}

impl StoreError {
    /// Whether a retry with backoff is reasonable.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Transport(_))
    }
}
