// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # originstory-observability
//!
//! Logging setup shared by the OriginStory binaries, with per-crate debug
//! flag support.
//!
//! ## Features
//! - `file-logging`: daily-rolling JSON log files under a timestamped run folder

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod cli;
pub mod config;
pub mod init;

pub use cli::*;
pub use config::*;
pub use init::*;

/// Workspace crates that accept `--debug-<crate>`
pub const KNOWN_CRATES: &[&str] = &[
    "originstory-agent",
    "originstory-transports",
    "originstory-config",
    "originstory-observability",
    "originstory-local",
];
