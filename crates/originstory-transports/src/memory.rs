// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! In-process transport.
//!
//! `MemoryTransport` never touches the network. `connect` only records the
//! request; the host decides the outcome with [`MemoryTransport::complete_connect`]
//! or [`MemoryTransport::fail_connect`], injects inbound packets with
//! [`MemoryTransport::inject`], and inspects everything the client emitted.
//! Clones share state, so a test keeps one clone while the client owns another.

use crate::common::{
    EventHandler, HandlerTable, Packet, TransportError, TransportEvent, TransportEventKind,
    TransportResult,
};
use crate::traits::Transport;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::debug;

#[derive(Default)]
struct MemoryInner {
    handlers: HandlerTable,
    connected: AtomicBool,
    connecting: AtomicBool,
    auto_connect: AtomicBool,
    fail_emits: AtomicBool,
    emitted: Mutex<Vec<Packet>>,
    connect_requests: Mutex<Vec<String>>,
    disconnect_requests: AtomicUsize,
}

/// Shared-state in-memory transport
#[derive(Clone, Default)]
pub struct MemoryTransport {
    inner: Arc<MemoryInner>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Transport that reports `Connected` as soon as `connect` is called
    pub fn auto_connecting() -> Self {
        let transport = Self::new();
        transport.inner.auto_connect.store(true, Ordering::SeqCst);
        transport
    }

    /// Resolve a pending connect as successful
    pub fn complete_connect(&self) {
        self.inner.connecting.store(false, Ordering::SeqCst);
        if !self.inner.connected.swap(true, Ordering::SeqCst) {
            debug!("[TRANSPORT] memory: connected");
            self.inner.handlers.fire(TransportEvent::Connected);
        }
    }

    /// Resolve a pending connect as failed
    pub fn fail_connect(&self, message: impl Into<String>) {
        self.inner.connecting.store(false, Ordering::SeqCst);
        self.inner
            .handlers
            .fire(TransportEvent::ConnectionError(message.into()));
    }

    /// Simulate the server or network dropping an established channel
    pub fn drop_connection(&self, reason: impl Into<String>) {
        if self.inner.connected.swap(false, Ordering::SeqCst) {
            self.inner
                .handlers
                .fire(TransportEvent::Disconnected(reason.into()));
        }
    }

    /// Deliver an inbound packet
    pub fn inject(&self, packet: Packet) {
        self.inner.handlers.fire(TransportEvent::Packet(packet));
    }

    /// Make every subsequent emit fail with `SendFailed`
    pub fn set_fail_emits(&self, fail: bool) {
        self.inner.fail_emits.store(fail, Ordering::SeqCst);
    }

    /// Snapshot of packets emitted so far
    pub fn emitted(&self) -> Vec<Packet> {
        self.inner.emitted.lock().clone()
    }

    /// Drain emitted packets
    pub fn take_emitted(&self) -> Vec<Packet> {
        std::mem::take(&mut *self.inner.emitted.lock())
    }

    /// URLs passed to `connect` that were not ignored as duplicates
    pub fn connect_requests(&self) -> Vec<String> {
        self.inner.connect_requests.lock().clone()
    }

    pub fn disconnect_count(&self) -> usize {
        self.inner.disconnect_requests.load(Ordering::SeqCst)
    }

    pub fn is_connecting(&self) -> bool {
        self.inner.connecting.load(Ordering::SeqCst)
    }
}

impl Transport for MemoryTransport {
    fn connect(&self, url: &str) {
        if self.inner.connected.load(Ordering::SeqCst)
            || self.inner.connecting.swap(true, Ordering::SeqCst)
        {
            debug!("[TRANSPORT] memory: connect({}) ignored, already active", url);
            return;
        }
        self.inner.connect_requests.lock().push(url.to_string());
        if self.inner.auto_connect.load(Ordering::SeqCst) {
            self.complete_connect();
        }
    }

    fn disconnect(&self) {
        self.inner.disconnect_requests.fetch_add(1, Ordering::SeqCst);
        self.inner.connecting.store(false, Ordering::SeqCst);
        if self.inner.connected.swap(false, Ordering::SeqCst) {
            self.inner
                .handlers
                .fire(TransportEvent::Disconnected("client disconnect".to_string()));
        }
    }

    fn emit(&self, packet: &Packet) -> TransportResult<()> {
        if !self.inner.connected.load(Ordering::SeqCst) {
            return Err(TransportError::NotConnected);
        }
        if self.inner.fail_emits.load(Ordering::SeqCst) {
            return Err(TransportError::SendFailed("emit failure injected".to_string()));
        }
        self.inner.emitted.lock().push(packet.clone());
        Ok(())
    }

    fn on(&self, kind: TransportEventKind, handler: EventHandler) {
        self.inner.handlers.set(kind, handler);
    }

    fn is_connected(&self) -> bool {
        self.inner.connected.load(Ordering::SeqCst)
    }

    fn transport_type(&self) -> &str {
        "memory"
    }
}
