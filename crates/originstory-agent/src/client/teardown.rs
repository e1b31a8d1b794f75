// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

use crate::protocol::OutboundMessage;
use crate::session::SessionAction;
use std::fmt;
use tracing::{info, warn};

/// Outcome of one best-effort teardown step
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum StepOutcome {
    /// Nothing to do (not connected, no meeting, loop not running, ...)
    #[default]
    Skipped,
    Done,
    Failed(String),
}

impl StepOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, StepOutcome::Failed(_))
    }
}

impl fmt::Display for StepOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepOutcome::Skipped => f.write_str("skipped"),
            StepOutcome::Done => f.write_str("done"),
            StepOutcome::Failed(reason) => write!(f, "failed ({})", reason),
        }
    }
}

/// Per-step record of a sign-out or shutdown
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TeardownReport {
    pub end_data: StepOutcome,
    pub unregister: StepOutcome,
    pub stop_streaming: StepOutcome,
    pub disconnect: StepOutcome,
}

impl TeardownReport {
    /// Attribute `outcome` to the step `action` belongs to
    pub(crate) fn record(&mut self, action: &SessionAction, outcome: StepOutcome) {
        let slot = match action {
            SessionAction::Emit(OutboundMessage::EndData { .. }) => &mut self.end_data,
            SessionAction::Emit(OutboundMessage::UnregisterLocal { .. }) => &mut self.unregister,
            SessionAction::StopStreaming => &mut self.stop_streaming,
            SessionAction::Disconnect => &mut self.disconnect,
            _ => return,
        };
        *slot = outcome;
    }

    /// True when no step failed
    pub fn is_clean(&self) -> bool {
        !(self.end_data.is_failed()
            || self.unregister.is_failed()
            || self.stop_streaming.is_failed()
            || self.disconnect.is_failed())
    }

    pub(crate) fn log(&self, what: &str) {
        if self.is_clean() {
            info!("[CLIENT] {} complete: {}", what, self);
        } else {
            warn!("[CLIENT] {} finished with failures: {}", what, self);
        }
    }
}

impl fmt::Display for TeardownReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "end_data={}, unregister={}, stop_streaming={}, disconnect={}",
            self.end_data, self.unregister, self.stop_streaming, self.disconnect
        )
    }
}
