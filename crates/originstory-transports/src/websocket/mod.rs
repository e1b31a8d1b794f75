// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Socket.IO over WebSocket transport

pub mod client;
pub mod codec;

pub use client::WsClient;
