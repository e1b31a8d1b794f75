// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Consumer-facing client handle.
//!
//! [`LocalClient::spawn`] wires a transport, a probability source and an
//! [`EventDispatcher`] to a session actor task and returns a cheap, cloneable
//! handle. Status reads never wait on the actor; they read the latest
//! published [`SessionStatus`].
//!
//! ```no_run
//! use originstory_agent::prelude::*;
//! use originstory_transports::memory::MemoryTransport;
//!
//! # async fn demo() -> originstory_agent::Result<()> {
//! let dispatcher = EventDispatcher::with_callback(|event| {
//!     println!("{} {}", event.action(), event.payload());
//! });
//! let client = LocalClient::spawn(
//!     MemoryTransport::new(),
//!     AgentConfig::default(),
//!     RandomSource::new(),
//!     dispatcher,
//! )?;
//! client.login("alice", "secret")?;
//! // ...
//! client.shutdown().await?;
//! # Ok(())
//! # }
//! ```

mod actor;
mod teardown;

pub use teardown::{StepOutcome, TeardownReport};

use crate::dispatcher::EventDispatcher;
use crate::error::{AgentError, Result};
use crate::protocol::Credentials;
use crate::session::SessionStatus;
use crate::source::ProbabilitySource;
use crate::streaming::{StreamingConfig, StreamingLoop};
use actor::{ActorSink, ClientActor, Command};
use originstory_transports::common::{ClientConfig as TransportConfig, TransportEventKind};
use originstory_transports::traits::Transport;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::warn;

pub const DEFAULT_SERVER_URL: &str = "http://localhost:3000";

/// Everything a client needs besides its collaborators
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Coordination server base URL (`http(s)://host:port`)
    pub server_url: String,
    pub streaming: StreamingConfig,
    pub transport: TransportConfig,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            streaming: StreamingConfig::default(),
            transport: TransportConfig::default(),
        }
    }
}

impl AgentConfig {
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
            ..Default::default()
        }
    }

    pub fn with_streaming(mut self, streaming: StreamingConfig) -> Self {
        self.streaming = streaming;
        self
    }

    pub fn with_transport(mut self, transport: TransportConfig) -> Self {
        self.transport = transport;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.server_url.trim().is_empty() {
            return Err(AgentError::InvalidConfig(
                "server_url cannot be empty".to_string(),
            ));
        }
        if self.streaming.interval.is_zero() {
            return Err(AgentError::InvalidConfig(
                "streaming interval must be greater than zero".to_string(),
            ));
        }
        if self.streaming.not_ready_backoff.is_zero() {
            return Err(AgentError::InvalidConfig(
                "not-ready backoff must be greater than zero".to_string(),
            ));
        }
        if self.streaming.stop_timeout.is_zero() {
            return Err(AgentError::InvalidConfig(
                "stop timeout must be greater than zero".to_string(),
            ));
        }
        self.transport.validate()?;
        Ok(())
    }
}

/// Handle to a running session actor
#[derive(Clone)]
pub struct LocalClient {
    commands: mpsc::UnboundedSender<Command>,
    status: watch::Receiver<SessionStatus>,
    actor: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl LocalClient {
    /// Start a client over `transport`. Must be called within a tokio runtime.
    pub fn spawn<T, S>(
        transport: T,
        config: AgentConfig,
        source: S,
        dispatcher: EventDispatcher,
    ) -> Result<Self>
    where
        T: Transport + 'static,
        S: ProbabilitySource + 'static,
    {
        config.validate()?;
        tokio::runtime::Handle::try_current().map_err(|e| AgentError::NoRuntime(e.to_string()))?;

        let transport: Arc<dyn Transport> = Arc::new(transport);
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        for kind in [
            TransportEventKind::Connected,
            TransportEventKind::ConnectionError,
            TransportEventKind::Disconnected,
            TransportEventKind::Packet,
        ] {
            let tx = event_tx.clone();
            transport.on(
                kind,
                Arc::new(move |event| {
                    let _ = tx.send(event);
                }),
            );
        }

        let (status_tx, status_rx) = watch::channel(SessionStatus::signed_out());
        let (sample_tx, sample_rx) = mpsc::unbounded_channel();
        let sink = Arc::new(ActorSink::new(status_rx.clone(), sample_tx));
        let streaming = StreamingLoop::new(config.streaming, Box::new(source), sink);

        let actor = ClientActor::new(
            config.server_url.clone(),
            transport,
            streaming,
            dispatcher,
            status_tx,
        );
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(actor.run(command_rx, event_rx, sample_rx));

        Ok(Self {
            commands: command_tx,
            status: status_rx,
            actor: Arc::new(Mutex::new(Some(handle))),
        })
    }

    /// Start a client speaking Socket.IO over WebSocket
    #[cfg(feature = "websocket")]
    pub fn spawn_websocket<S>(
        config: AgentConfig,
        source: S,
        dispatcher: EventDispatcher,
    ) -> Result<Self>
    where
        S: ProbabilitySource + 'static,
    {
        let transport =
            originstory_transports::websocket::WsClient::new(config.transport.clone())?;
        Self::spawn(transport, config, source, dispatcher)
    }

    /// Log in, connecting first if needed. Returns once the request is queued.
    pub fn login(&self, username: &str, password: &str) -> Result<()> {
        self.send(Command::Login {
            credentials: Credentials::new(username, password),
        })
    }

    /// Courtesy END_DATA / UNREGISTER_LOCAL, stop streaming, clear the session
    /// and disconnect. Resolves once every step has run or timed out.
    pub async fn sign_out(&self) -> Result<TeardownReport> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::SignOut { reply })?;
        rx.await.map_err(|_| AgentError::ClientClosed)
    }

    pub fn is_ready_to_send(&self) -> bool {
        self.status.borrow().ready_to_send
    }

    pub fn get_status(&self) -> SessionStatus {
        self.status.borrow().clone()
    }

    /// Receiver that observes every published status change
    pub fn status_watch(&self) -> watch::Receiver<SessionStatus> {
        self.status.clone()
    }

    /// Send one DATA_TRANSMISSION. False when not ready, when either value is
    /// not a finite number in [0, 1] after rounding, or when the emit fails.
    pub async fn send_probabilities_once(&self, p1: f64, p2: f64) -> bool {
        let (reply, rx) = oneshot::channel();
        if self
            .send(Command::SendProbabilities { p1, p2, reply })
            .is_err()
        {
            return false;
        }
        rx.await.unwrap_or(false)
    }

    /// Stop streaming, discard any pending login, disconnect and end the actor
    pub async fn shutdown(self) -> Result<TeardownReport> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Shutdown { reply })?;
        let report = rx.await.map_err(|_| AgentError::ClientClosed)?;

        let handle = self.actor.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!("[CLIENT] Session actor ended abnormally: {}", e);
            }
        }
        Ok(report)
    }

    fn send(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| AgentError::ClientClosed)
    }
}
