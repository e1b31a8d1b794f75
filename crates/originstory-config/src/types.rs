// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration type definitions
//!
//! Each struct maps to a section of `originstory_configuration.toml`. Every
//! section is `#[serde(default)]`, so a partial file only overrides what it
//! names.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct OriginStoryConfig {
    pub server: ServerConfig,
    pub transport: TransportConfig,
    pub streaming: StreamingConfig,
    pub logging: LoggingConfig,
}

/// Coordination server endpoint
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub url: String,
    /// Socket.IO event name carrying command packets
    pub event_name: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:3000".to_string(),
            event_name: "os_packet".to_string(),
        }
    }
}

/// Connection behavior
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct TransportConfig {
    pub auto_reconnect: bool,
    pub reconnect_base_delay_ms: u64,
    /// 0 = unlimited
    pub max_reconnect_attempts: u32,
    pub connect_timeout_ms: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            auto_reconnect: true,
            reconnect_base_delay_ms: 1000,
            max_reconnect_attempts: 0,
            connect_timeout_ms: 10_000,
        }
    }
}

/// Telemetry loop timing
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct StreamingConfig {
    pub interval_ms: u64,
    pub not_ready_backoff_ms: u64,
    pub stop_timeout_ms: u64,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            interval_ms: 1000,
            not_ready_backoff_ms: 250,
            stop_timeout_ms: 2000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub log_dir: PathBuf,
    pub file_logging: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_dir: PathBuf::from("./logs"),
            file_logging: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: OriginStoryConfig = toml::from_str(
            r#"
            [server]
            url = "https://meet.example.com"

            [streaming]
            interval_ms = 500
            "#,
        )
        .unwrap();

        assert_eq!(config.server.url, "https://meet.example.com");
        assert_eq!(config.server.event_name, "os_packet");
        assert_eq!(config.streaming.interval_ms, 500);
        assert_eq!(config.streaming.stop_timeout_ms, 2000);
        assert!(config.transport.auto_reconnect);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_serializes_to_toml() {
        let text = toml::to_string(&OriginStoryConfig::default()).unwrap();
        assert!(text.contains("[server]"));
        let back: OriginStoryConfig = toml::from_str(&text).unwrap();
        assert_eq!(back, OriginStoryConfig::default());
    }
}
