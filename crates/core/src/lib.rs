// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! flux-core: Domain model for the flux agent-task runtime

pub mod backend;
pub mod cadence;
pub mod clock;
pub mod feedback;
pub mod id;
pub mod integration;
pub mod packet;
pub mod run;
pub mod session;
pub mod task;

pub use backend::{normalize_backend, DEFAULT_BACKEND};
pub use cadence::{
    cadence_to_ms, is_due, parse_cadence_config, Cadence, CadenceEntry, CadenceUnit,
    CADENCE_NAMESPACE,
};
pub use clock::{Clock, FakeClock, SystemClock};
pub use feedback::{DeliveryStatus, FeedbackEvent, FeedbackEventId, FeedbackPayload, FeedbackTopic};
pub use id::{IdGen, SequentialIdGen, ShortId, UuidIdGen};
pub use integration::{Integration, IntegrationId, NewIntakeEvent};
pub use packet::{ExecutionSpec, PromptSpec, TaskPacket};
pub use run::{deep_merge, reduce_run_events, RunEvent, RunEventKind, RunId, RunState, RunStatus};
pub use session::{AgentSession, SessionId, SessionStatus};
pub use task::{StreamId, Task, TaskId, TaskStatus, TransitionError};
