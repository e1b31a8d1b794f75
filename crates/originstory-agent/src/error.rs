// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Error types for the OriginStory agent

use crate::protocol::{ProtocolError, SampleError};
use originstory_transports::common::TransportError;

/// Result type alias using AgentError
pub type Result<T> = std::result::Result<T, AgentError>;

#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// Transport-level failure
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Probability pair rejected before sending
    #[error("Invalid sample: {0}")]
    InvalidSample(#[from] SampleError),

    /// Inbound packet could not be interpreted
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The client actor is no longer running
    #[error("Client has shut down")]
    ClientClosed,

    /// Called outside a tokio runtime
    #[error("No tokio runtime available: {0}")]
    NoRuntime(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl AgentError {
    /// Check if error is retryable (for reconnection logic)
    pub fn is_retryable(&self) -> bool {
        match self {
            AgentError::Transport(e) => e.is_retryable(),
            _ => false,
        }
    }
}
