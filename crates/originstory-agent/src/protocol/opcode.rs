// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Command codes carried in the `cmd` field of every packet.

use std::fmt;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    TestConnection = 0x00,
    ConnectionEstablished = 0x01,
    ValidateUser = 0x02,
    UserValid = 0x03,
    UserInvalid = 0x04,
    UpdateUser = 0x05,
    UserUpdated = 0x06,
    BeginData = 0x07,
    DataTransmission = 0x08,
    EndData = 0x09,
    EndConnection = 0x0A,
    BadCommand = 0x0B,
    BadData = 0x0C,
    MeetingInfo = 0x0D,
    RegisterLocal = 0x0E,
    UnregisterLocal = 0x0F,
}

impl Opcode {
    pub const ALL: [Opcode; 16] = [
        Opcode::TestConnection,
        Opcode::ConnectionEstablished,
        Opcode::ValidateUser,
        Opcode::UserValid,
        Opcode::UserInvalid,
        Opcode::UpdateUser,
        Opcode::UserUpdated,
        Opcode::BeginData,
        Opcode::DataTransmission,
        Opcode::EndData,
        Opcode::EndConnection,
        Opcode::BadCommand,
        Opcode::BadData,
        Opcode::MeetingInfo,
        Opcode::RegisterLocal,
        Opcode::UnregisterLocal,
    ];

    pub fn from_code(code: i64) -> Option<Self> {
        Self::ALL.iter().copied().find(|op| op.code() == code)
    }

    pub fn code(self) -> i64 {
        self as u8 as i64
    }

    /// Name used in packet logs
    pub fn name(self) -> &'static str {
        match self {
            Opcode::TestConnection => "TEST_CONNECTION",
            Opcode::ConnectionEstablished => "CONNECTION_ESTABLISHED",
            Opcode::ValidateUser => "VALIDATE_USER",
            Opcode::UserValid => "USER_VALID",
            Opcode::UserInvalid => "USER_INVALID",
            Opcode::UpdateUser => "UPDATE_USER",
            Opcode::UserUpdated => "USER_UPDATED",
            Opcode::BeginData => "BEGIN_DATA",
            Opcode::DataTransmission => "DATA_TRANSMISSION",
            Opcode::EndData => "END_DATA",
            Opcode::EndConnection => "END_CONNECTION",
            Opcode::BadCommand => "BAD_COMMAND",
            Opcode::BadData => "BAD_DATA",
            Opcode::MeetingInfo => "MEETING_INFO",
            Opcode::RegisterLocal => "REGISTER_LOCAL",
            Opcode::UnregisterLocal => "UNREGISTER_LOCAL",
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Log name for a raw command code, known or not
pub fn command_name(code: i64) -> String {
    match Opcode::from_code(code) {
        Some(op) => op.name().to_string(),
        None => format!("0x{:02X}", code),
    }
}
