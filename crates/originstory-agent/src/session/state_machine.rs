// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Deterministic session state machine.
//!
//! Consumes local operations and observed [`SessionEvent`]s and returns the
//! [`SessionAction`]s a driver must perform, in order. It never touches the
//! transport, sleeps or spawns; the client actor executes the actions.
//!
//! Design constraints:
//! - `user_id` is only set by USER_VALID, `meeting_id` only by MEETING_INFO
//! - sign-out always ends in SignedOut with both ids and the pending login cleared
//! - a reconnect never resumes the previous session; stale ids are dropped on
//!   the next `Connected` and a fresh login is required

use super::pending_login::PendingLogin;
use super::status::SessionStatus;
use crate::dispatcher::StatusEvent;
use crate::protocol::{Credentials, InboundMessage, OutboundMessage, ProbabilitySample};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    SignedOut,
    Connecting,
    Authenticating,
    /// Logged in, no meeting yet
    Authenticated,
    Bound,
    Streaming,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Connected,
    ConnectionError(String),
    Disconnected(String),
    Inbound(InboundMessage),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionAction {
    /// Ask the transport to connect (idempotent)
    Connect,
    Emit(OutboundMessage),
    StartStreaming,
    StopStreaming,
    Disconnect,
    Notify(StatusEvent),
}

#[derive(Debug, Clone)]
pub struct SessionStateMachine {
    phase: SessionPhase,
    connected: bool,
    streaming: bool,
    user_id: Option<String>,
    meeting_id: Option<String>,
    pending_login: PendingLogin,
}

impl Default for SessionStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStateMachine {
    pub fn new() -> Self {
        Self {
            phase: SessionPhase::SignedOut,
            connected: false,
            streaming: false,
            user_id: None,
            meeting_id: None,
            pending_login: PendingLogin::new(),
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn is_streaming(&self) -> bool {
        self.streaming
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    pub fn meeting_id(&self) -> Option<&str> {
        self.meeting_id.as_deref()
    }

    pub fn has_pending_login(&self) -> bool {
        self.pending_login.is_pending()
    }

    /// connected ∧ user_id ∧ meeting_id
    pub fn is_ready_to_send(&self) -> bool {
        self.connected && self.user_id.is_some() && self.meeting_id.is_some()
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            connected: self.connected,
            user_id: self.user_id.clone(),
            meeting_id: self.meeting_id.clone(),
            ready_to_send: self.is_ready_to_send(),
        }
    }

    /// Request a login. Deferred until `Connected` when not connected.
    pub fn login(&mut self, credentials: Credentials) -> Vec<SessionAction> {
        if self.connected {
            if self.user_id.is_none() {
                self.phase = SessionPhase::Authenticating;
            }
            return vec![SessionAction::Emit(OutboundMessage::ValidateUser(
                credentials,
            ))];
        }

        if let Some(previous) = self.pending_login.replace(credentials) {
            debug!(
                "[SESSION] Pending login for '{}' replaced",
                previous.username()
            );
        }
        self.phase = SessionPhase::Connecting;
        vec![SessionAction::Connect]
    }

    /// User-initiated sign-out. Always ends in SignedOut.
    pub fn sign_out(&mut self) -> Vec<SessionAction> {
        let mut actions = Vec::new();

        if self.connected {
            if let Some(user_id) = self.user_id.clone() {
                if let Some(meeting_id) = self.meeting_id.clone() {
                    actions.push(SessionAction::Emit(OutboundMessage::EndData {
                        meeting_id,
                        user_id: user_id.clone(),
                    }));
                }
                actions.push(SessionAction::Emit(OutboundMessage::UnregisterLocal {
                    user_id,
                }));
            }
        }

        actions.push(SessionAction::StopStreaming);
        self.reset();
        actions.push(SessionAction::Disconnect);
        actions
    }

    /// Client teardown: no courtesy packets, just stop and drop everything
    pub fn shutdown(&mut self) -> Vec<SessionAction> {
        self.reset();
        vec![SessionAction::StopStreaming, SessionAction::Disconnect]
    }

    fn reset(&mut self) {
        self.streaming = false;
        self.connected = false;
        self.user_id = None;
        self.meeting_id = None;
        self.pending_login.clear();
        self.phase = SessionPhase::SignedOut;
    }

    /// Advance the machine with one observed event
    pub fn on_event(&mut self, event: SessionEvent) -> Vec<SessionAction> {
        match event {
            SessionEvent::Connected => self.on_connected(),
            SessionEvent::ConnectionError(msg) => {
                if !self.connected {
                    self.phase = SessionPhase::SignedOut;
                }
                vec![SessionAction::Notify(StatusEvent::LoginError {
                    msg: format!("Could not connect to server.\n{}", msg),
                })]
            }
            SessionEvent::Disconnected(reason) => self.on_disconnected(&reason),
            SessionEvent::Inbound(message) => self.on_inbound(message),
        }
    }

    fn on_connected(&mut self) -> Vec<SessionAction> {
        self.connected = true;
        let stale_user = self.user_id.take();
        let stale_meeting = self.meeting_id.take();
        if stale_user.is_some() || stale_meeting.is_some() {
            info!("[SESSION] Dropped session ids from previous connection; fresh login required");
        }

        let mut actions = vec![SessionAction::Notify(StatusEvent::ServerConnected)];
        match self.pending_login.take() {
            Some(credentials) => {
                self.phase = SessionPhase::Authenticating;
                actions.push(SessionAction::Emit(OutboundMessage::ValidateUser(
                    credentials,
                )));
            }
            None => self.phase = SessionPhase::SignedOut,
        }
        actions
    }

    fn on_disconnected(&mut self, reason: &str) -> Vec<SessionAction> {
        debug!("[SESSION] Transport disconnected: {}", reason);
        self.connected = false;
        self.phase = SessionPhase::SignedOut;

        let mut actions = Vec::new();
        if self.streaming {
            self.streaming = false;
            actions.push(SessionAction::StopStreaming);
        }
        actions.push(SessionAction::Notify(StatusEvent::ServerDisconnected));
        actions
    }

    fn on_inbound(&mut self, message: InboundMessage) -> Vec<SessionAction> {
        match message {
            InboundMessage::UserValid { user_id } => {
                self.user_id = Some(user_id.clone());
                self.phase = self.settled_phase();
                vec![
                    SessionAction::Emit(OutboundMessage::RegisterLocal {
                        user_id: user_id.clone(),
                    }),
                    SessionAction::Notify(StatusEvent::LoginOk { user_id }),
                ]
            }
            InboundMessage::UserInvalid { error } => {
                if self.user_id.is_none() {
                    self.phase = SessionPhase::SignedOut;
                }
                vec![SessionAction::Notify(StatusEvent::LoginFail { msg: error })]
            }
            InboundMessage::MeetingInfo { meeting_id } => {
                self.meeting_id = Some(meeting_id.clone());
                self.phase = self.settled_phase();
                vec![SessionAction::Notify(StatusEvent::MeetingInfo {
                    meeting_id,
                })]
            }
            InboundMessage::BeginData => {
                let mut actions = Vec::new();
                if !self.streaming {
                    self.streaming = true;
                    actions.push(SessionAction::StartStreaming);
                }
                self.phase = SessionPhase::Streaming;
                actions.push(SessionAction::Notify(StatusEvent::BeginData));
                actions
            }
            InboundMessage::EndData => {
                let mut actions = Vec::new();
                if self.streaming {
                    self.streaming = false;
                    actions.push(SessionAction::StopStreaming);
                }
                self.phase = self.settled_phase();
                actions.push(SessionAction::Notify(StatusEvent::EndData));
                actions
            }
            InboundMessage::Ignored(opcode) => {
                debug!("[SESSION] No action for {}", opcode);
                Vec::new()
            }
        }
    }

    /// Phase implied by the ids when not streaming
    fn settled_phase(&self) -> SessionPhase {
        if self.streaming {
            return SessionPhase::Streaming;
        }
        match (&self.user_id, &self.meeting_id) {
            (Some(_), Some(_)) => SessionPhase::Bound,
            (Some(_), None) => SessionPhase::Authenticated,
            (None, _) if self.connected => SessionPhase::Authenticating,
            (None, _) => SessionPhase::SignedOut,
        }
    }

    /// DATA_TRANSMISSION for a validated sample, or `None` when not ready
    pub fn data_transmission(
        &self,
        sample: ProbabilitySample,
        timestamp: String,
    ) -> Option<OutboundMessage> {
        if !self.is_ready_to_send() {
            return None;
        }
        Some(OutboundMessage::DataTransmission {
            meeting_id: self.meeting_id.clone()?,
            user_id: self.user_id.clone()?,
            sample,
            timestamp,
        })
    }
}
