// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Session state: phases, the pure state machine, the pending-login slot and
//! the status snapshot.

pub mod pending_login;
pub mod state_machine;
pub mod status;

pub use pending_login::PendingLogin;
pub use state_machine::{SessionAction, SessionEvent, SessionPhase, SessionStateMachine};
pub use status::SessionStatus;
