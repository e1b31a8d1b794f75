// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Transport notifications and the one-handler-per-event registry.

use super::packet::Packet;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Notification raised by a transport
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// Channel established and handshake complete
    Connected,
    /// A connect attempt failed
    ConnectionError(String),
    /// An established channel closed
    Disconnected(String),
    /// Inbound protocol packet
    Packet(Packet),
}

impl TransportEvent {
    pub fn kind(&self) -> TransportEventKind {
        match self {
            Self::Connected => TransportEventKind::Connected,
            Self::ConnectionError(_) => TransportEventKind::ConnectionError,
            Self::Disconnected(_) => TransportEventKind::Disconnected,
            Self::Packet(_) => TransportEventKind::Packet,
        }
    }
}

/// Event name a handler is registered under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportEventKind {
    Connected,
    ConnectionError,
    Disconnected,
    Packet,
}

impl TransportEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connected => "connect",
            Self::ConnectionError => "connect_error",
            Self::Disconnected => "disconnect",
            Self::Packet => "packet",
        }
    }
}

impl fmt::Display for TransportEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Callback invoked from the transport's own execution context
pub type EventHandler = Arc<dyn Fn(TransportEvent) + Send + Sync>;

/// Registry holding at most one handler per event kind.
///
/// Registering again for the same kind replaces the previous handler.
#[derive(Default)]
pub struct HandlerTable {
    handlers: RwLock<HashMap<TransportEventKind, EventHandler>>,
}

impl HandlerTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `kind`, returning true if one was replaced
    pub fn set(&self, kind: TransportEventKind, handler: EventHandler) -> bool {
        self.handlers.write().insert(kind, handler).is_some()
    }

    pub fn remove(&self, kind: TransportEventKind) {
        self.handlers.write().remove(&kind);
    }

    pub fn contains(&self, kind: TransportEventKind) -> bool {
        self.handlers.read().contains_key(&kind)
    }

    /// Invoke the handler for the event's kind, if any.
    ///
    /// The handler runs outside the registry lock so it may re-register.
    pub fn fire(&self, event: TransportEvent) -> bool {
        let handler = self.handlers.read().get(&event.kind()).cloned();
        match handler {
            Some(handler) => {
                handler(event);
                true
            }
            None => {
                tracing::trace!("[TRANSPORT] No handler for {}", event.kind());
                false
            }
        }
    }
}

impl fmt::Debug for HandlerTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kinds: Vec<_> = self.handlers.read().keys().copied().collect();
        f.debug_struct("HandlerTable").field("kinds", &kinds).finish()
    }
}
