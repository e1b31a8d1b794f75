// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Common configuration types for transports

use super::error::{TransportError, TransportResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default Socket.IO event carrying protocol packets
pub const DEFAULT_EVENT_NAME: &str = "os_packet";

/// Client-side transport configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Socket.IO event name carrying `{cmd, data}` envelopes
    pub event_name: String,

    /// Retry automatically after an unexpected drop
    pub auto_reconnect: bool,

    /// First reconnect delay; doubles on every failed attempt
    pub reconnect_delay: Duration,

    /// Maximum reconnect attempts (0 = infinite)
    pub max_reconnect_attempts: u32,

    /// Upper bound for TCP connect plus Socket.IO handshake
    pub connect_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            event_name: DEFAULT_EVENT_NAME.to_string(),
            auto_reconnect: true,
            reconnect_delay: Duration::from_millis(1000),
            max_reconnect_attempts: 0,
            connect_timeout: Duration::from_secs(10),
        }
    }
}

impl ClientConfig {
    /// Create a config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the Socket.IO event name
    pub fn with_event_name(mut self, event_name: impl Into<String>) -> Self {
        self.event_name = event_name.into();
        self
    }

    /// Enable or disable automatic reconnection
    pub fn with_auto_reconnect(mut self, enabled: bool) -> Self {
        self.auto_reconnect = enabled;
        self
    }

    /// Set base reconnect delay and attempt limit
    pub fn with_reconnect(mut self, base_delay: Duration, max_attempts: u32) -> Self {
        self.reconnect_delay = base_delay;
        self.max_reconnect_attempts = max_attempts;
        self
    }

    /// Set connect timeout
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> TransportResult<()> {
        if self.event_name.trim().is_empty() {
            return Err(TransportError::InvalidConfig(
                "event name cannot be empty".to_string(),
            ));
        }
        if self.connect_timeout.is_zero() {
            return Err(TransportError::InvalidConfig(
                "connect timeout must be greater than zero".to_string(),
            ));
        }
        if self.auto_reconnect && self.reconnect_delay.is_zero() {
            return Err(TransportError::InvalidConfig(
                "reconnect delay must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
