// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Wire envelope `{"cmd": <int>, "data": {...}}`.
//!
//! The transport layer only knows that a packet is an integer command plus a
//! structured payload. Opcode meaning lives in the agent's protocol module.

use super::error::{TransportError, TransportResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One protocol packet as carried on the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Packet {
    pub cmd: i64,
    #[serde(default = "empty_object")]
    pub data: Value,
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

impl Packet {
    pub fn new(cmd: i64, data: Value) -> Self {
        Self { cmd, data }
    }

    /// Parse an inbound envelope.
    ///
    /// `cmd` may be a JSON integer, an integral float such as `2.0`, or a
    /// string holding an integer; anything else is rejected. A missing or
    /// `null` `data` becomes an empty object.
    pub fn from_envelope(envelope: &Value) -> TransportResult<Self> {
        let obj = envelope
            .as_object()
            .ok_or_else(|| TransportError::InvalidMessage("envelope is not an object".into()))?;

        let cmd = match obj.get("cmd") {
            Some(Value::Number(n)) => match (n.as_i64(), n.as_f64()) {
                (Some(cmd), _) => cmd,
                (None, Some(f)) if f.fract() == 0.0 && f.abs() <= i64::MAX as f64 => f as i64,
                _ => {
                    return Err(TransportError::InvalidMessage(format!(
                        "cmd {} is not an integer",
                        n
                    )))
                }
            },
            Some(Value::String(s)) => s
                .trim()
                .parse::<i64>()
                .map_err(|_| TransportError::InvalidMessage(format!("cmd {:?} is not an integer", s)))?,
            Some(other) => {
                return Err(TransportError::InvalidMessage(format!(
                    "cmd has unsupported type: {}",
                    other
                )))
            }
            None => return Err(TransportError::InvalidMessage("missing cmd".into())),
        };

        let data = match obj.get("data") {
            None | Some(Value::Null) => empty_object(),
            Some(v) => v.clone(),
        };

        Ok(Self { cmd, data })
    }

    /// Serialize to the outbound envelope
    pub fn to_envelope(&self) -> Value {
        serde_json::json!({ "cmd": self.cmd, "data": self.data })
    }
}
