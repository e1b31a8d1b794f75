// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Typed inbound/outbound messages and their wire payloads.
//!
//! Outbound user ids travel under `originStoryUserId`; inbound ones arrive as
//! `userId`. Inbound `MEETING_INFO` accepts `meetingid` as an alias.

use super::opcode::Opcode;
use super::sample::ProbabilitySample;
use originstory_transports::common::Packet;
use serde_json::{json, Map, Value};
use std::fmt;
use thiserror::Error;

pub const REDACTED: &str = "***redacted***";
pub const DEFAULT_LOGIN_FAIL_MESSAGE: &str = "Invalid credentials.";

const KEY_USER_ID: &str = "originStoryUserId";
const KEY_MEETING_ID: &str = "meetingId";

/// Login credentials; the password never appears in `Debug` output or logs
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    /// Build credentials, trimming surrounding whitespace from the username
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into().trim().to_string(),
            password: password.into(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &REDACTED)
            .finish()
    }
}

/// Messages this client sends
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundMessage {
    ValidateUser(Credentials),
    RegisterLocal {
        user_id: String,
    },
    UnregisterLocal {
        user_id: String,
    },
    EndData {
        meeting_id: String,
        user_id: String,
    },
    DataTransmission {
        meeting_id: String,
        user_id: String,
        sample: ProbabilitySample,
        timestamp: String,
    },
}

impl OutboundMessage {
    pub fn opcode(&self) -> Opcode {
        match self {
            Self::ValidateUser(_) => Opcode::ValidateUser,
            Self::RegisterLocal { .. } => Opcode::RegisterLocal,
            Self::UnregisterLocal { .. } => Opcode::UnregisterLocal,
            Self::EndData { .. } => Opcode::EndData,
            Self::DataTransmission { .. } => Opcode::DataTransmission,
        }
    }

    fn payload(&self, redact: bool) -> Value {
        match self {
            Self::ValidateUser(credentials) => json!({
                "username": credentials.username,
                "password": if redact { REDACTED } else { credentials.password.as_str() },
            }),
            Self::RegisterLocal { user_id } | Self::UnregisterLocal { user_id } => {
                json!({ KEY_USER_ID: user_id })
            }
            Self::EndData {
                meeting_id,
                user_id,
            } => json!({ KEY_MEETING_ID: meeting_id, KEY_USER_ID: user_id }),
            Self::DataTransmission {
                meeting_id,
                user_id,
                sample,
                timestamp,
            } => json!({
                KEY_MEETING_ID: meeting_id,
                KEY_USER_ID: user_id,
                "prob_1": sample.p1(),
                "prob_2": sample.p2(),
                "timestamp": timestamp,
            }),
        }
    }

    /// Wire packet
    pub fn to_packet(&self) -> Packet {
        Packet::new(self.opcode().code(), self.payload(false))
    }

    /// Payload safe for logs
    pub fn log_payload(&self) -> Value {
        self.payload(true)
    }

    /// Log destination: the meeting room for telemetry, otherwise the server
    pub fn destination(&self) -> String {
        match self {
            Self::DataTransmission { meeting_id, .. } => format!("room:{}", meeting_id),
            _ => "server".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("unknown command 0x{0:02X}")]
    UnknownCommand(i64),

    #[error("{opcode} without {field}")]
    MissingField {
        opcode: Opcode,
        field: &'static str,
    },
}

/// Messages this client reacts to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundMessage {
    UserValid { user_id: String },
    UserInvalid { error: String },
    MeetingInfo { meeting_id: String },
    BeginData,
    EndData,
    /// Known command with no client-side behavior
    Ignored(Opcode),
}

impl InboundMessage {
    pub fn parse(packet: &Packet) -> Result<Self, ProtocolError> {
        let opcode =
            Opcode::from_code(packet.cmd).ok_or(ProtocolError::UnknownCommand(packet.cmd))?;
        let data = packet.data.as_object();

        let message = match opcode {
            Opcode::UserValid => Self::UserValid {
                user_id: identifier(data, &["userId"]).ok_or(ProtocolError::MissingField {
                    opcode,
                    field: "userId",
                })?,
            },
            Opcode::UserInvalid => Self::UserInvalid {
                error: match data.and_then(|d| d.get("error")) {
                    Some(Value::String(s)) => s.clone(),
                    None | Some(Value::Null) => DEFAULT_LOGIN_FAIL_MESSAGE.to_string(),
                    Some(other) => other.to_string(),
                },
            },
            Opcode::MeetingInfo => Self::MeetingInfo {
                meeting_id: identifier(data, &["meetingId", "meetingid"]).ok_or(
                    ProtocolError::MissingField {
                        opcode,
                        field: "meetingId",
                    },
                )?,
            },
            Opcode::BeginData => Self::BeginData,
            Opcode::EndData => Self::EndData,
            other => Self::Ignored(other),
        };
        Ok(message)
    }
}

/// First non-empty string or integer value among `keys`
fn identifier(data: Option<&Map<String, Value>>, keys: &[&str]) -> Option<String> {
    let data = data?;
    keys.iter().find_map(|key| match data.get(*key) {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::Number(n)) if n.is_i64() || n.is_u64() => Some(n.to_string()),
        _ => None,
    })
}
