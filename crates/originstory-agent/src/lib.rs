// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # originstory-agent
//!
//! Local OriginStory agent: authenticates a user against the coordination
//! server, binds to a meeting and streams `(p1, p2)` probability telemetry
//! while the server asks for it.
//!
//! ## Components
//!
//! - [`session::SessionStateMachine`]: pure transition logic returning actions
//! - [`streaming::StreamingLoop`]: periodic sampler with generation-tagged output
//! - [`dispatcher::EventDispatcher`]: ordered delivery of [`StatusEvent`]s
//! - [`client::LocalClient`]: handle to the single-writer actor that owns the
//!   session and executes actions against the transport
//!
//! ## Flow
//!
//! `login` → connect → VALIDATE_USER → USER_VALID → REGISTER_LOCAL →
//! MEETING_INFO → BEGIN_DATA → DATA_TRANSMISSION every interval → END_DATA or
//! `sign_out` (END_DATA, UNREGISTER_LOCAL, disconnect).

pub mod client;
pub mod dispatcher;
pub mod error;
pub mod protocol;
pub mod session;
pub mod source;
pub mod streaming;

pub use client::{AgentConfig, LocalClient, StepOutcome, TeardownReport};
pub use dispatcher::{EventDispatcher, StatusEvent};
pub use error::{AgentError, Result};
pub use session::{SessionPhase, SessionStatus};
pub use source::{FixedSource, ProbabilitySource, RandomSource};
pub use streaming::StreamingConfig;

pub mod prelude {
    pub use crate::client::{AgentConfig, LocalClient, TeardownReport};
    pub use crate::dispatcher::{EventDispatcher, StatusEvent};
    pub use crate::error::{AgentError, Result};
    pub use crate::session::SessionStatus;
    pub use crate::source::{FixedSource, ProbabilitySource, RandomSource};
    pub use crate::streaming::StreamingConfig;
}
