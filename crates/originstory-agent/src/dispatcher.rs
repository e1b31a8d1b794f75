// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Status notifications and their serialized delivery.
//!
//! The session actor produces [`StatusEvent`]s; an [`EventDispatcher`] hands
//! them, one at a time and in production order, to a single consumer. The
//! consumer is either a callback running on the dispatcher's own task or an
//! `mpsc` receiver the caller drains itself.

use serde_json::{json, Value};
use std::panic::{catch_unwind, AssertUnwindSafe};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error};

/// Notification surfaced to the consumer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusEvent {
    ServerConnected,
    ServerDisconnected,
    LoginOk { user_id: String },
    LoginFail { msg: String },
    LoginError { msg: String },
    MeetingInfo { meeting_id: String },
    BeginData,
    EndData,
}

impl StatusEvent {
    /// Action name as seen by status consumers
    pub fn action(&self) -> &'static str {
        match self {
            Self::ServerConnected => "server_connected",
            Self::ServerDisconnected => "server_disconnected",
            Self::LoginOk { .. } => "login_ok",
            Self::LoginFail { .. } => "login_fail",
            Self::LoginError { .. } => "login_error",
            Self::MeetingInfo { .. } => "meeting_info",
            Self::BeginData => "begin_data",
            Self::EndData => "end_data",
        }
    }

    /// Keyword payload accompanying the action
    pub fn payload(&self) -> Value {
        match self {
            Self::LoginOk { user_id } => json!({ "user_id": user_id }),
            Self::LoginFail { msg } | Self::LoginError { msg } => json!({ "msg": msg }),
            Self::MeetingInfo { meeting_id } => json!({ "meeting_id": meeting_id }),
            _ => json!({}),
        }
    }
}

/// Serialized delivery of status events to one consumer
pub struct EventDispatcher {
    tx: Option<mpsc::UnboundedSender<StatusEvent>>,
    task: Option<JoinHandle<()>>,
}

impl EventDispatcher {
    /// Deliver events to `callback` on a dedicated task.
    ///
    /// Must be called within a tokio runtime. The callback should not block
    /// for long; a panic inside it is logged and delivery continues.
    pub fn with_callback<F>(mut callback: F) -> Self
    where
        F: FnMut(&StatusEvent) + Send + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<StatusEvent>();
        let task = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                debug!("[DISPATCH] {} {}", event.action(), event.payload());
                if catch_unwind(AssertUnwindSafe(|| callback(&event))).is_err() {
                    error!(
                        "[DISPATCH] Status callback panicked on '{}'; continuing",
                        event.action()
                    );
                }
            }
            debug!("[DISPATCH] Channel closed, dispatcher task exiting");
        });

        Self {
            tx: Some(tx),
            task: Some(task),
        }
    }

    /// Deliver events through an ordered channel the caller drains
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<StatusEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                tx: Some(tx),
                task: None,
            },
            rx,
        )
    }

    /// Discard every event
    pub fn disabled() -> Self {
        Self {
            tx: None,
            task: None,
        }
    }

    pub fn dispatch(&self, event: StatusEvent) {
        match &self.tx {
            Some(tx) => {
                if tx.send(event).is_err() {
                    debug!("[DISPATCH] Consumer gone, event dropped");
                }
            }
            None => debug!("[DISPATCH] No consumer for '{}'", event.action()),
        }
    }

    /// Stop accepting events and wait until the callback has seen every
    /// event already dispatched
    pub async fn close(mut self) {
        self.tx.take();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                error!("[DISPATCH] Dispatcher task failed: {}", e);
            }
        }
    }
}
