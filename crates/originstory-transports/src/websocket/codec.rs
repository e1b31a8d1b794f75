// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Engine.IO v4 / Socket.IO v5 text framing.
//!
//! Only what a websocket-only client on the default namespace needs:
//! open handshake, ping/pong, namespace connect/disconnect/connect-error and
//! JSON events. Binary attachments are rejected.

use crate::common::{TransportError, TransportResult};
use serde::Deserialize;
use serde_json::Value;

/// Socket.IO CONNECT for the default namespace
pub const CONNECT_FRAME: &str = "40";
/// Socket.IO DISCONNECT for the default namespace
pub const DISCONNECT_FRAME: &str = "41";

/// Engine.IO `open` payload
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenHandshake {
    pub sid: String,
    #[serde(default)]
    pub upgrades: Vec<String>,
    pub ping_interval: u64,
    pub ping_timeout: u64,
    #[serde(default)]
    pub max_payload: Option<u64>,
}

/// Engine.IO packet
#[derive(Debug, Clone, PartialEq)]
pub enum EnginePacket {
    Open(OpenHandshake),
    Close,
    Ping(String),
    Pong(String),
    Message(SocketPacket),
    Upgrade,
    Noop,
}

/// Socket.IO packet carried inside an Engine.IO message
#[derive(Debug, Clone, PartialEq)]
pub enum SocketPacket {
    Connect(Option<Value>),
    Disconnect,
    Event { name: String, args: Vec<Value> },
    Ack,
    ConnectError(Option<Value>),
}

impl SocketPacket {
    /// Human-readable reason carried by a CONNECT_ERROR
    pub fn connect_error_message(payload: &Option<Value>) -> String {
        match payload {
            Some(Value::Object(obj)) => obj
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("connection refused")
                .to_string(),
            Some(Value::String(s)) => s.clone(),
            _ => "connection refused".to_string(),
        }
    }
}

/// Decode one WebSocket text frame
pub fn decode(frame: &str) -> TransportResult<EnginePacket> {
    let mut chars = frame.chars();
    let kind = chars
        .next()
        .ok_or_else(|| TransportError::InvalidMessage("empty frame".into()))?;
    let rest = chars.as_str();

    match kind {
        '0' => {
            let open: OpenHandshake = serde_json::from_str(rest)?;
            Ok(EnginePacket::Open(open))
        }
        '1' => Ok(EnginePacket::Close),
        '2' => Ok(EnginePacket::Ping(rest.to_string())),
        '3' => Ok(EnginePacket::Pong(rest.to_string())),
        '4' => decode_socket(rest).map(EnginePacket::Message),
        '5' => Ok(EnginePacket::Upgrade),
        '6' => Ok(EnginePacket::Noop),
        other => Err(TransportError::InvalidMessage(format!(
            "unknown engine.io packet type {:?}",
            other
        ))),
    }
}

fn decode_socket(frame: &str) -> TransportResult<SocketPacket> {
    let mut chars = frame.chars();
    let kind = chars
        .next()
        .ok_or_else(|| TransportError::InvalidMessage("empty socket.io packet".into()))?;
    let body = strip_namespace(chars.as_str());

    match kind {
        '0' => Ok(SocketPacket::Connect(optional_json(body)?)),
        '1' => Ok(SocketPacket::Disconnect),
        '2' => {
            // optional ack id precedes the JSON array
            let body = body.trim_start_matches(|c: char| c.is_ascii_digit());
            let args: Vec<Value> = serde_json::from_str(body)?;
            let mut args = args.into_iter();
            let name = match args.next() {
                Some(Value::String(name)) => name,
                _ => {
                    return Err(TransportError::InvalidMessage(
                        "event without a string name".into(),
                    ))
                }
            };
            Ok(SocketPacket::Event {
                name,
                args: args.collect(),
            })
        }
        '3' => Ok(SocketPacket::Ack),
        '4' => Ok(SocketPacket::ConnectError(optional_json(body)?)),
        '5' | '6' => Err(TransportError::InvalidMessage(
            "binary socket.io packets are not supported".into(),
        )),
        other => Err(TransportError::InvalidMessage(format!(
            "unknown socket.io packet type {:?}",
            other
        ))),
    }
}

fn strip_namespace(body: &str) -> &str {
    if body.starts_with('/') {
        match body.find(',') {
            Some(idx) => &body[idx + 1..],
            None => "",
        }
    } else {
        body
    }
}

fn optional_json(body: &str) -> TransportResult<Option<Value>> {
    if body.trim().is_empty() {
        Ok(None)
    } else {
        Ok(Some(serde_json::from_str(body)?))
    }
}

/// Encode an event on the default namespace: `42["name",payload]`
pub fn encode_event(name: &str, payload: &Value) -> TransportResult<String> {
    let body = serde_json::to_string(&serde_json::json!([name, payload]))?;
    Ok(format!("42{}", body))
}

/// Engine.IO pong echoing the ping payload
pub fn encode_pong(payload: &str) -> String {
    format!("3{}", payload)
}

/// Map a server base URL to its Socket.IO websocket endpoint.
///
/// `http://host:port` becomes `ws://host:port/socket.io/?EIO=4&transport=websocket`;
/// `https` maps to `wss`. A bare `host:port` is treated as `http`.
pub fn socket_io_url(base: &str) -> TransportResult<String> {
    let trimmed = base.trim();
    let (scheme, rest) = match trimmed.split_once("://") {
        Some(("http", rest)) | Some(("ws", rest)) => ("ws", rest),
        Some(("https", rest)) | Some(("wss", rest)) => ("wss", rest),
        Some((other, _)) => {
            return Err(TransportError::InvalidConfig(format!(
                "unsupported URL scheme '{}' in {}",
                other, base
            )))
        }
        None => ("ws", trimmed),
    };

    let rest = rest.trim_end_matches('/');
    let host = rest.split('/').next().unwrap_or("");
    if host.is_empty() {
        return Err(TransportError::InvalidConfig(format!(
            "server URL has no host: {:?}",
            base
        )));
    }

    Ok(format!(
        "{}://{}/socket.io/?EIO=4&transport=websocket",
        scheme, rest
    ))
}
