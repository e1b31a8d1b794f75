// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # originstory-transports
//!
//! Transport abstraction layer for OriginStory agents.
//!
//! A transport wraps one persistent bidirectional channel to the coordination
//! server and exposes four primitives: `connect`, `disconnect`, `emit` and
//! `on` (event subscription). Connection-state changes and inbound packets are
//! delivered through registered handlers; exactly one handler is kept per
//! event kind.
//!
//! ## Implementations
//!
//! - [`websocket::WsClient`] (feature `websocket-client`): Socket.IO v5 /
//!   Engine.IO v4 text framing over a WebSocket, with optional automatic
//!   reconnection.
//! - [`memory::MemoryTransport`]: in-process transport that records emitted
//!   packets and lets the host inject connection events and inbound packets.
//!
//! ## Feature Flags
//!
//! ```toml
//! [dependencies]
//! originstory-transports = { version = "0.1", features = ["websocket-client"] }
//! ```
//!
//! - `websocket-client`: Socket.IO over WebSocket client (default)
//! - `client` / `all`: aliases for everything
//!
//! ## Example
//!
//! ```no_run
//! use originstory_transports::memory::MemoryTransport;
//! use originstory_transports::traits::Transport;
//! use originstory_transports::common::{Packet, TransportEventKind};
//! use std::sync::Arc;
//!
//! let transport = MemoryTransport::new();
//! transport.on(TransportEventKind::Connected, Arc::new(|_event| {
//!     println!("connected");
//! }));
//! transport.connect("http://localhost:3000");
//! transport.complete_connect();
//! transport.emit(&Packet::new(2, serde_json::json!({}))).ok();
//! ```

pub mod common;
pub mod memory;
pub mod reconnect;
pub mod traits;

#[cfg(feature = "websocket-client")]
pub mod websocket;

pub mod prelude {
    pub use crate::common::{
        ClientConfig, EventHandler, HandlerTable, Packet, TransportError, TransportEvent,
        TransportEventKind, TransportResult,
    };
    pub use crate::memory::MemoryTransport;
    pub use crate::reconnect::ReconnectionStrategy;
    pub use crate::traits::Transport;

    #[cfg(feature = "websocket-client")]
    pub use crate::websocket::WsClient;
}
