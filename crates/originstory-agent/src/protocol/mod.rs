// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! OriginStory packet protocol: opcodes, typed messages, sample validation.

pub mod messages;
pub mod opcode;
pub mod sample;

pub use messages::{
    Credentials, InboundMessage, OutboundMessage, ProtocolError, DEFAULT_LOGIN_FAIL_MESSAGE,
    REDACTED,
};
pub use opcode::{command_name, Opcode};
pub use sample::{format_timestamp, round2, timestamp_now, ProbabilitySample, SampleError};
