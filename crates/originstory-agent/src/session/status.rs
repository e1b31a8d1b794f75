// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};

/// Snapshot published after every session transition
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStatus {
    pub connected: bool,
    pub user_id: Option<String>,
    pub meeting_id: Option<String>,
    pub ready_to_send: bool,
}

impl SessionStatus {
    pub fn signed_out() -> Self {
        Self::default()
    }
}
