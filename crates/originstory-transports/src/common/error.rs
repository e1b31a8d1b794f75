// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Common error types for all transports

use thiserror::Error;

/// Result type alias for transport operations
pub type TransportResult<T> = Result<T, TransportError>;

/// Transport-agnostic error type
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Failed to connect (handshake, DNS, TCP or connect-error from server)
    #[error("Connect failed: {0}")]
    ConnectFailed(String),

    /// Failed to send message
    #[error("Send failed: {0}")]
    SendFailed(String),

    /// Emit attempted while no connection is established
    #[error("Not connected")]
    NotConnected,

    /// Timeout occurred
    #[error("Operation timed out")]
    Timeout,

    /// Connection closed
    #[error("Connection closed: {0}")]
    ConnectionClosed(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Invalid message format
    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Other error
    #[error("Transport error: {0}")]
    Other(String),
}

impl TransportError {
    /// Whether retrying the same operation later could succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ConnectFailed(_) | Self::Timeout | Self::ConnectionClosed(_) | Self::SendFailed(_)
        )
    }
}

impl From<serde_json::Error> for TransportError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(feature = "websocket-client")]
impl From<tokio_tungstenite::tungstenite::Error> for TransportError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        use tokio_tungstenite::tungstenite::Error as WsError;
        match err {
            WsError::ConnectionClosed | WsError::AlreadyClosed => {
                Self::ConnectionClosed(err.to_string())
            }
            other => Self::Other(other.to_string()),
        }
    }
}
