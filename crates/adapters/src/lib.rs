// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! flux-adapters: Everything that touches the outside world.
//!
//! Backends execute tasks (subprocess CLIs, the gateway), the push client
//! listens for server wake-ups, intake adapters poll external sources, and
//! the gateway client carries capability calls.

pub mod backend;
pub mod env;
pub mod feedback;
pub mod gateway;
pub mod golden_path;
pub mod intake;
pub mod push;

pub use backend::{
    Backend, BackendRegistry, ExecStatus, ExecuteRequest, ExecuteResult, RegistryError,
};
pub use feedback::format_status_comment;
pub use gateway::{CapabilityError, ErrorCategory, GatewayClient, GatewayResult, Handshake};
pub use golden_path::GoldenPathConfig;
pub use intake::{
    GithubIntakeAdapter, IntakeAdapter, IntakeAdapterRegistry, IntakeContext, IntakeError,
    IntakePollOutcome,
};
pub use push::{PushClient, PushClientConfig, PushEvent, TaskAvailable};

#[cfg(any(test, feature = "test-support"))]
pub use backend::fake::{FakeBackend, RecordedExecution};
