// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # OriginStory local agent
//!
//! Signs a user in to the OriginStory coordination server, registers the
//! local socket, waits to be bound to a meeting and then streams a pair of
//! probabilities `(p1, p2)` while the server asks for data.
//!
//! ## Quick Start
//!
//! ```toml
//! [dependencies]
//! originstory = "0.1"  # Default: agent + websocket transport + config + observability
//! ```
//!
//! ```rust,no_run
//! use originstory::prelude::*;
//!
//! # async fn run() -> std::result::Result<(), Box<dyn std::error::Error>> {
//! let dispatcher = EventDispatcher::with_callback(|event| {
//!     println!("{} {}", event.action(), event.payload());
//! });
//! let client = LocalClient::spawn_websocket(
//!     AgentConfig::new("http://localhost:3000"),
//!     RandomSource::new(),
//!     dispatcher,
//! )?;
//! client.login("alice", "secret")?;
//! // ... later
//! client.sign_out().await?;
//! client.shutdown().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature Flags
//!
//! - **`agent`** (default): session state machine, streaming loop, dispatcher
//! - **`transport-websocket`** (default): Socket.IO over WebSocket
//! - **`config`** (default): TOML configuration loader
//! - **`observability`** (default): logging initialisation and debug flags
//! - **`file-logging`**: JSON log files with retention
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  Foundation: originstory-config, originstory-observability │
//! └─────────────────────────────────────────────────────────┘
//!                         ↓
//! ┌─────────────────────────────────────────────────────────┐
//! │  I/O: originstory-transports                            │
//! │  (Transport trait, Socket.IO client, in-memory double)  │
//! └─────────────────────────────────────────────────────────┘
//!                         ↓
//! ┌─────────────────────────────────────────────────────────┐
//! │  Session: originstory-agent                             │
//! │  (state machine, streaming loop, client actor)          │
//! └─────────────────────────────────────────────────────────┘
//! ```

// Re-export I/O layer
pub use originstory_transports as transports;

#[cfg(feature = "agent")]
pub use originstory_agent as agent;

#[cfg(feature = "config")]
pub use originstory_config as config;

#[cfg(feature = "observability")]
pub use originstory_observability as observability;

/// Prelude - commonly used types and traits
pub mod prelude {
    pub use crate::transports::prelude::*;

    #[cfg(feature = "agent")]
    pub use crate::agent::prelude::*;

    #[cfg(feature = "config")]
    pub use crate::config::{load_config_or_default, validate_config, OriginStoryConfig};

    #[cfg(feature = "observability")]
    pub use crate::observability::{init_logging, CrateDebugFlags, LoggingOptions};
}
