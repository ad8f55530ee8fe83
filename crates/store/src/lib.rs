// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! flux-store: Typed client for the remote state store.
//!
//! The store is a black box: a key/value + live-subscription service reached
//! over HTTP. This crate owns the endpoint surface the runtime uses and
//! nothing else; task state persistence lives entirely on the other side.

pub mod client;
pub mod error;
pub mod http;
pub mod types;

#[cfg(any(test, feature = "test-support"))]
pub mod fake;

pub use client::{
    create_and_await_task, Store, TASK_AWAIT_POLL_INTERVAL, TASK_AWAIT_TIMEOUT,
};
pub use error::StoreError;
pub use http::HttpStore;
pub use types::{
    CronTrigger, IntegrationPatch, KvEntry, NewRun, PacketFilter, Playbook, RepoContext,
    StatusCounts, Stream,
};

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeStore;
