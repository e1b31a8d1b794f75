// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

use crate::protocol::Credentials;

/// Single-slot register for a login requested while disconnected.
///
/// A second `replace` before the slot is taken overwrites the first.
#[derive(Debug, Default, Clone)]
pub struct PendingLogin {
    slot: Option<Credentials>,
}

impl PendingLogin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `credentials`, returning whatever was pending before
    pub fn replace(&mut self, credentials: Credentials) -> Option<Credentials> {
        self.slot.replace(credentials)
    }

    pub fn take(&mut self) -> Option<Credentials> {
        self.slot.take()
    }

    pub fn clear(&mut self) {
        self.slot = None;
    }

    pub fn is_pending(&self) -> bool {
        self.slot.is_some()
    }
}
