// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! flux-daemon: the runner (`fluxd`).
//!
//! Background process that pulls, schedules, dispatches, and supervises
//! agent tasks. Components run as independent tokio tasks:
//!
//! - Supervisor: reactive dispatch on the store's ready-task subscription
//! - Cadence scheduler: rides the supervisor heartbeat
//! - Intake / feedback workers: periodic pollers with backoff
//! - Drain loop: queue consumer woken by push events and a ticker

pub mod config;
pub mod drain;
pub mod executor;
pub mod feedback;
pub mod identity;
pub mod intake;
pub mod lifecycle;
pub mod scheduler;
pub mod sessions;
pub mod supervisor;

pub use config::{Config, ConfigError};
pub use drain::{DrainLoop, DrainLoopConfig};
pub use executor::{ExecutionReport, TaskExecutor};
pub use feedback::{FeedbackWorker, FeedbackWorkerConfig};
pub use identity::{load_or_create_identity, DeviceIdentity};
pub use intake::{backoff_delay, IntakeWorker, IntakeWorkerConfig};
pub use lifecycle::{LifecycleError, StartupResult};
pub use scheduler::CadenceScheduler;
pub use sessions::SessionRegistry;
pub use supervisor::{Supervisor, SupervisorConfig};
