// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Mapping from the file/env/CLI configuration to runtime settings.

use originstory_agent::{AgentConfig, StreamingConfig};
use originstory_config::OriginStoryConfig;
use originstory_observability::LoggingOptions;
use originstory_transports::common::ClientConfig;
use std::time::Duration;

pub fn agent_config(config: &OriginStoryConfig) -> AgentConfig {
    let transport = ClientConfig::default()
        .with_event_name(config.server.event_name.clone())
        .with_auto_reconnect(config.transport.auto_reconnect)
        .with_reconnect(
            Duration::from_millis(config.transport.reconnect_base_delay_ms),
            config.transport.max_reconnect_attempts,
        )
        .with_connect_timeout(Duration::from_millis(config.transport.connect_timeout_ms));

    let streaming = StreamingConfig {
        interval: Duration::from_millis(config.streaming.interval_ms),
        not_ready_backoff: Duration::from_millis(config.streaming.not_ready_backoff_ms),
        stop_timeout: Duration::from_millis(config.streaming.stop_timeout_ms),
    };

    AgentConfig::new(config.server.url.trim())
        .with_streaming(streaming)
        .with_transport(transport)
}

/// `--verbose` lowers the base level to debug
pub fn logging_options(config: &OriginStoryConfig, verbose: bool) -> LoggingOptions {
    let level = if verbose {
        "debug".to_string()
    } else {
        config.logging.level.clone()
    };
    LoggingOptions {
        level,
        file_logging: config.logging.file_logging,
        log_dir: config.logging.log_dir.clone(),
        ..LoggingOptions::default()
    }
}
