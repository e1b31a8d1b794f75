// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Common types and utilities for all transports

pub mod config;
pub mod error;
pub mod event;
pub mod packet;

pub use config::ClientConfig;
pub use error::{TransportError, TransportResult};
pub use event::{EventHandler, HandlerTable, TransportEvent, TransportEventKind};
pub use packet::Packet;
