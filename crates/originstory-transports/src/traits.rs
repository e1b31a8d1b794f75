// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Transport trait definitions
//!
//! A transport owns one persistent bidirectional channel. All methods take
//! `&self`: implementations keep their mutable state behind interior
//! mutability so a single instance can be shared between the session actor
//! and the transport's own I/O task.

use crate::common::{EventHandler, Packet, TransportEventKind, TransportResult};

/// Base transport trait - implemented by all transports
pub trait Transport: Send + Sync {
    /// Begin connecting to `url`.
    ///
    /// Returns immediately. Eventually fires exactly one of
    /// `Connected` / `ConnectionError`. Calling again while a connection is
    /// established or in progress is a no-op.
    fn connect(&self, url: &str);

    /// Close the channel. Safe to call when not connected.
    fn disconnect(&self);

    /// Send a packet.
    ///
    /// Fails with `NotConnected` when no channel is established; callers log
    /// and carry on.
    fn emit(&self, packet: &Packet) -> TransportResult<()>;

    /// Register the handler for `kind`, replacing any previous one
    fn on(&self, kind: TransportEventKind, handler: EventHandler);

    /// Check if the channel is currently established
    fn is_connected(&self) -> bool;

    /// Get transport name/type
    fn transport_type(&self) -> &str;
}

impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    fn connect(&self, url: &str) {
        (**self).connect(url)
    }

    fn disconnect(&self) {
        (**self).disconnect()
    }

    fn emit(&self, packet: &Packet) -> TransportResult<()> {
        (**self).emit(packet)
    }

    fn on(&self, kind: TransportEventKind, handler: EventHandler) {
        (**self).on(kind, handler)
    }

    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }

    fn transport_type(&self) -> &str {
        (**self).transport_type()
    }
}
