// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Socket.IO client over a WebSocket.
//!
//! Each `connect` spawns one link task on the tokio runtime captured at
//! construction. The link task performs the Engine.IO/Socket.IO handshake,
//! answers pings, forwards inbound events to the handler table and writes
//! outbound frames handed over by `emit`. After an unexpected drop it
//! reconnects with exponential backoff when enabled; a server-initiated
//! disconnect or an explicit `disconnect()` ends the task.
//!
//! Links carry a generation number. Only the current generation may fire
//! handlers or change the connected flag, so a link being torn down cannot
//! clobber the state of the one that replaced it.

use super::codec::{self, EnginePacket, OpenHandshake, SocketPacket};
use crate::common::{
    ClientConfig, EventHandler, HandlerTable, Packet, TransportError, TransportEvent,
    TransportEventKind, TransportResult,
};
use crate::reconnect::ReconnectionStrategy;
use crate::traits::Transport;
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Generation 0 is never assigned to a link
const NO_LINK: u64 = 0;

enum Outbound {
    Frame(String),
    Close,
}

struct Link {
    generation: u64,
    outbound: mpsc::UnboundedSender<Outbound>,
    /// Set before the link fires its terminal event
    closing: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl Link {
    fn is_active(&self) -> bool {
        !self.closing.load(Ordering::SeqCst) && !self.task.is_finished()
    }
}

/// State shared between the client and its link tasks
struct Shared {
    handlers: HandlerTable,
    /// Generation of the newest link
    current: AtomicU64,
    /// Generation of the link holding an open session, or `NO_LINK`
    connected: AtomicU64,
}

impl Shared {
    fn is_connected(&self) -> bool {
        let connected = self.connected.load(Ordering::SeqCst);
        connected != NO_LINK && connected == self.current.load(Ordering::SeqCst)
    }
}

/// A link task's view of the shared state
struct LinkContext {
    generation: u64,
    shared: Arc<Shared>,
    closing: Arc<AtomicBool>,
}

impl LinkContext {
    fn is_current(&self) -> bool {
        self.shared.current.load(Ordering::SeqCst) == self.generation
    }

    fn fire(&self, event: TransportEvent) {
        if self.is_current() {
            self.shared.handlers.fire(event);
        } else {
            debug!(
                "[TRANSPORT] Suppressing {} from superseded link {}",
                event.kind().as_str(),
                self.generation
            );
        }
    }

    /// Fire the last event of this link; `connect()` may start a new one from here on
    fn finish(&self, event: TransportEvent) {
        self.closing.store(true, Ordering::SeqCst);
        self.fire(event);
    }

    fn mark_connected(&self) {
        if self.is_current() {
            self.shared.connected.store(self.generation, Ordering::SeqCst);
        }
    }

    fn mark_disconnected(&self) {
        // only clears the flag while it still names this link
        let _ = self.shared.connected.compare_exchange(
            self.generation,
            NO_LINK,
            Ordering::SeqCst,
            Ordering::SeqCst,
        );
    }
}

/// How an established session ended
#[derive(Debug)]
enum LinkEnd {
    /// `disconnect()` or the client was dropped
    ClientClosed,
    /// Socket.IO DISCONNECT or Engine.IO close from the server
    ServerClosed(String),
    /// Network error, ping timeout or websocket close without a disconnect packet
    Dropped(String),
}

/// Socket.IO-over-WebSocket transport
pub struct WsClient {
    config: ClientConfig,
    runtime: Handle,
    shared: Arc<Shared>,
    link: Mutex<Option<Link>>,
}

impl WsClient {
    /// Create a new client; must be called from within a tokio runtime
    pub fn new(config: ClientConfig) -> TransportResult<Self> {
        config.validate()?;
        let runtime = Handle::try_current().map_err(|e| {
            TransportError::InvalidConfig(format!("WsClient requires a tokio runtime: {}", e))
        })?;

        Ok(Self {
            config,
            runtime,
            shared: Arc::new(Shared {
                handlers: HandlerTable::new(),
                current: AtomicU64::new(NO_LINK),
                connected: AtomicU64::new(NO_LINK),
            }),
            link: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}

impl Transport for WsClient {
    fn connect(&self, url: &str) {
        let mut link = self.link.lock();
        if let Some(existing) = link.as_ref() {
            if existing.is_active() {
                debug!("[TRANSPORT] connect({}) ignored, link already active", url);
                return;
            }
        }

        let generation = self.shared.current.fetch_add(1, Ordering::SeqCst) + 1;
        let closing = Arc::new(AtomicBool::new(false));
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let context = LinkContext {
            generation,
            shared: self.shared.clone(),
            closing: closing.clone(),
        };
        let task = self.runtime.spawn(run_link(
            url.to_string(),
            self.config.clone(),
            context,
            outbound_rx,
        ));
        *link = Some(Link {
            generation,
            outbound: outbound_tx,
            closing,
            task,
        });
    }

    fn disconnect(&self) {
        let Some(link) = self.link.lock().take() else {
            return;
        };

        let connected = self.shared.connected.load(Ordering::SeqCst) == link.generation;
        if connected && link.outbound.send(Outbound::Close).is_ok() {
            // link task closes the socket and fires Disconnected
            return;
        }

        // still handshaking or backing off: abandon the attempt
        link.task.abort();
        link.closing.store(true, Ordering::SeqCst);
        if self
            .shared
            .connected
            .compare_exchange(link.generation, NO_LINK, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            self.shared
                .handlers
                .fire(TransportEvent::Disconnected("client disconnect".to_string()));
        }
    }

    fn emit(&self, packet: &Packet) -> TransportResult<()> {
        if !self.shared.is_connected() {
            return Err(TransportError::NotConnected);
        }
        let frame = codec::encode_event(&self.config.event_name, &packet.to_envelope())?;

        let link = self.link.lock();
        let link = link.as_ref().ok_or(TransportError::NotConnected)?;
        link.outbound
            .send(Outbound::Frame(frame))
            .map_err(|_| TransportError::SendFailed("link task has exited".to_string()))
    }

    fn on(&self, kind: TransportEventKind, handler: EventHandler) {
        self.shared.handlers.set(kind, handler);
    }

    fn is_connected(&self) -> bool {
        self.shared.is_connected()
    }

    fn transport_type(&self) -> &str {
        "socketio-websocket"
    }
}

impl Drop for WsClient {
    fn drop(&mut self) {
        if let Some(link) = self.link.get_mut().take() {
            let _ = link.outbound.send(Outbound::Close);
        }
    }
}

async fn run_link(
    url: String,
    config: ClientConfig,
    link: LinkContext,
    mut outbound: mpsc::UnboundedReceiver<Outbound>,
) {
    let endpoint = match codec::socket_io_url(&url) {
        Ok(endpoint) => endpoint,
        Err(e) => {
            warn!("[TRANSPORT] {}", e);
            link.finish(TransportEvent::ConnectionError(e.to_string()));
            return;
        }
    };

    let mut strategy =
        ReconnectionStrategy::new(config.reconnect_delay, config.max_reconnect_attempts);
    let mut established_once = false;

    loop {
        match open_session(&endpoint, config.connect_timeout).await {
            Ok((ws, open)) => {
                if established_once {
                    info!(
                        "[TRANSPORT] Reconnected to {} after {} attempt(s)",
                        endpoint,
                        strategy.attempt_number()
                    );
                } else {
                    info!("[TRANSPORT] Connected to {} (sid {})", endpoint, open.sid);
                }
                strategy.reset();
                established_once = true;
                link.mark_connected();
                link.fire(TransportEvent::Connected);

                let end = pump(ws, &open, &config.event_name, &link, &mut outbound).await;
                link.mark_disconnected();

                match end {
                    LinkEnd::ClientClosed => {
                        info!("[TRANSPORT] Disconnected by client");
                        link.finish(TransportEvent::Disconnected("client disconnect".into()));
                        return;
                    }
                    LinkEnd::ServerClosed(reason) => {
                        info!("[TRANSPORT] Disconnected by server: {}", reason);
                        link.finish(TransportEvent::Disconnected(reason));
                        return;
                    }
                    LinkEnd::Dropped(reason) if !config.auto_reconnect => {
                        warn!("[TRANSPORT] Connection lost: {}", reason);
                        link.finish(TransportEvent::Disconnected(reason));
                        return;
                    }
                    LinkEnd::Dropped(reason) => {
                        warn!("[TRANSPORT] Connection lost: {}", reason);
                        link.fire(TransportEvent::Disconnected(reason));
                    }
                }
            }
            Err(e) if !established_once => {
                warn!("[TRANSPORT] Connect to {} failed: {}", endpoint, e);
                link.finish(TransportEvent::ConnectionError(e.to_string()));
                return;
            }
            Err(e) => {
                warn!(
                    "[TRANSPORT] Reconnect attempt {} failed: {}",
                    strategy.attempt_number(),
                    e
                );
            }
        }

        if !link.is_current() {
            debug!("[TRANSPORT] Link {} superseded, not reconnecting", link.generation);
            return;
        }
        match strategy.next_backoff() {
            Some(delay) => {
                info!(
                    "[TRANSPORT] Reconnecting in {:?} (attempt {})",
                    delay,
                    strategy.attempt_number()
                );
                tokio::time::sleep(delay).await;
            }
            None => {
                warn!(
                    "[TRANSPORT] Giving up after {} reconnect attempts",
                    strategy.attempt_number()
                );
                link.closing.store(true, Ordering::SeqCst);
                return;
            }
        }
    }
}

async fn open_session(
    endpoint: &str,
    timeout: Duration,
) -> TransportResult<(WsStream, OpenHandshake)> {
    tokio::time::timeout(timeout, handshake(endpoint))
        .await
        .map_err(|_| TransportError::Timeout)?
}

async fn handshake(endpoint: &str) -> TransportResult<(WsStream, OpenHandshake)> {
    let (mut ws, _) = connect_async(endpoint)
        .await
        .map_err(|e| TransportError::ConnectFailed(e.to_string()))?;

    let open = loop {
        match codec::decode(&next_text(&mut ws).await?)? {
            EnginePacket::Open(open) => break open,
            other => debug!("[TRANSPORT] Ignoring {:?} before open", other),
        }
    };
    debug!(
        "[TRANSPORT] Engine.IO open: sid={} ping_interval={}ms ping_timeout={}ms",
        open.sid, open.ping_interval, open.ping_timeout
    );

    ws.send(Message::Text(codec::CONNECT_FRAME.to_string()))
        .await?;

    loop {
        match codec::decode(&next_text(&mut ws).await?)? {
            EnginePacket::Message(SocketPacket::Connect(_)) => return Ok((ws, open)),
            EnginePacket::Message(SocketPacket::ConnectError(payload)) => {
                return Err(TransportError::ConnectFailed(
                    SocketPacket::connect_error_message(&payload),
                ))
            }
            EnginePacket::Ping(payload) => {
                ws.send(Message::Text(codec::encode_pong(&payload))).await?;
            }
            other => debug!("[TRANSPORT] Ignoring {:?} during namespace connect", other),
        }
    }
}

async fn next_text(ws: &mut WsStream) -> TransportResult<String> {
    loop {
        match ws.next().await {
            Some(Ok(Message::Text(text))) => return Ok(text),
            Some(Ok(Message::Close(frame))) => {
                return Err(TransportError::ConnectionClosed(format!("{:?}", frame)))
            }
            Some(Ok(_)) => continue,
            Some(Err(e)) => return Err(e.into()),
            None => return Err(TransportError::ConnectionClosed("stream ended".into())),
        }
    }
}

async fn pump(
    mut ws: WsStream,
    open: &OpenHandshake,
    event_name: &str,
    link: &LinkContext,
    outbound: &mut mpsc::UnboundedReceiver<Outbound>,
) -> LinkEnd {
    let liveness = Duration::from_millis(open.ping_interval + open.ping_timeout);
    let watchdog = tokio::time::sleep(liveness);
    tokio::pin!(watchdog);

    loop {
        tokio::select! {
            inbound = ws.next() => match inbound {
                Some(Ok(Message::Text(text))) => match codec::decode(&text) {
                    Ok(EnginePacket::Ping(payload)) => {
                        watchdog.as_mut().reset(Instant::now() + liveness);
                        if let Err(e) = ws.send(Message::Text(codec::encode_pong(&payload))).await {
                            return LinkEnd::Dropped(format!("pong failed: {}", e));
                        }
                    }
                    Ok(EnginePacket::Message(SocketPacket::Event { name, args })) => {
                        if name != event_name {
                            debug!("[TRANSPORT] Ignoring event '{}'", name);
                        } else {
                            match args.first().map(Packet::from_envelope) {
                                Some(Ok(packet)) => {
                                    link.fire(TransportEvent::Packet(packet));
                                }
                                Some(Err(e)) => debug!("[TRANSPORT] Dropping malformed packet: {}", e),
                                None => debug!("[TRANSPORT] Dropping '{}' event without payload", name),
                            }
                        }
                    }
                    Ok(EnginePacket::Message(SocketPacket::Disconnect)) => {
                        return LinkEnd::ServerClosed("io server disconnect".into());
                    }
                    Ok(EnginePacket::Close) => {
                        return LinkEnd::ServerClosed("transport close".into());
                    }
                    Ok(other) => debug!("[TRANSPORT] Ignoring {:?}", other),
                    Err(e) => debug!("[TRANSPORT] Undecodable frame: {}", e),
                },
                Some(Ok(Message::Close(_))) | None => {
                    return LinkEnd::Dropped("transport close".into());
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => return LinkEnd::Dropped(format!("transport error: {}", e)),
            },
            command = outbound.recv() => match command {
                Some(Outbound::Frame(frame)) => {
                    if let Err(e) = ws.send(Message::Text(frame)).await {
                        return LinkEnd::Dropped(format!("send failed: {}", e));
                    }
                }
                Some(Outbound::Close) | None => {
                    let _ = ws.send(Message::Text(codec::DISCONNECT_FRAME.to_string())).await;
                    let _ = ws.close(None).await;
                    return LinkEnd::ClientClosed;
                }
            },
            _ = &mut watchdog => {
                return LinkEnd::Dropped("ping timeout".into());
            }
        }
    }
}
