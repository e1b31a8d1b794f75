// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration validation
//!
//! Every check runs; all problems are reported in one error.

use crate::{ConfigError, ConfigResult, OriginStoryConfig};

/// Validation errors that can occur during config validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigValidationError {
    MissingRequired { field: String },
    InvalidValue { field: String, reason: String },
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingRequired { field } => {
                write!(f, "Missing required configuration: {}", field)
            }
            Self::InvalidValue { field, reason } => {
                write!(f, "Invalid configuration value for {}: {}", field, reason)
            }
        }
    }
}

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "warning", "error"];

/// Validate the complete configuration
///
/// Checks for:
/// - Server URL present with an `http(s)://` or `ws(s)://` scheme
/// - Non-empty event name
/// - Non-zero streaming interval, backoff and stop timeout
/// - Non-zero connect timeout, and reconnect delay when reconnecting
/// - Known log level
///
/// A not-ready backoff longer than the interval is allowed.
///
/// # Errors
///
/// Returns `ConfigError::ValidationError` listing every problem found
pub fn validate_config(config: &OriginStoryConfig) -> ConfigResult<()> {
    let errors = collect_errors(config);
    if errors.is_empty() {
        return Ok(());
    }

    let error_messages = errors
        .iter()
        .map(|e| format!("  - {}", e))
        .collect::<Vec<_>>()
        .join("\n");

    Err(ConfigError::ValidationError(format!(
        "Configuration validation failed:\n{}",
        error_messages
    )))
}

/// All validation problems, in section order
pub fn collect_errors(config: &OriginStoryConfig) -> Vec<ConfigValidationError> {
    let mut errors = Vec::new();
    validate_server(config, &mut errors);
    validate_transport(config, &mut errors);
    validate_streaming(config, &mut errors);
    validate_logging(config, &mut errors);
    errors
}

fn invalid(field: &str, reason: &str) -> ConfigValidationError {
    ConfigValidationError::InvalidValue {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

fn validate_server(config: &OriginStoryConfig, errors: &mut Vec<ConfigValidationError>) {
    let url = config.server.url.trim();
    if url.is_empty() {
        errors.push(ConfigValidationError::MissingRequired {
            field: "server.url".to_string(),
        });
    } else {
        let rest = ["http://", "https://", "ws://", "wss://"]
            .iter()
            .find_map(|scheme| url.strip_prefix(scheme));
        match rest {
            None => errors.push(invalid(
                "server.url",
                "must start with http://, https://, ws:// or wss://",
            )),
            Some(rest) if rest.is_empty() || rest.starts_with('/') => {
                errors.push(invalid("server.url", "missing host"))
            }
            Some(_) => {}
        }
    }

    if config.server.event_name.trim().is_empty() {
        errors.push(ConfigValidationError::MissingRequired {
            field: "server.event_name".to_string(),
        });
    }
}

fn validate_transport(config: &OriginStoryConfig, errors: &mut Vec<ConfigValidationError>) {
    if config.transport.connect_timeout_ms == 0 {
        errors.push(invalid("transport.connect_timeout_ms", "must be greater than 0"));
    }
    if config.transport.auto_reconnect && config.transport.reconnect_base_delay_ms == 0 {
        errors.push(invalid(
            "transport.reconnect_base_delay_ms",
            "must be greater than 0 when auto_reconnect is enabled",
        ));
    }
}

fn validate_streaming(config: &OriginStoryConfig, errors: &mut Vec<ConfigValidationError>) {
    if config.streaming.interval_ms == 0 {
        errors.push(invalid("streaming.interval_ms", "must be greater than 0"));
    }
    if config.streaming.not_ready_backoff_ms == 0 {
        errors.push(invalid("streaming.not_ready_backoff_ms", "must be greater than 0"));
    }
    if config.streaming.stop_timeout_ms == 0 {
        errors.push(invalid("streaming.stop_timeout_ms", "must be greater than 0"));
    }
}

fn validate_logging(config: &OriginStoryConfig, errors: &mut Vec<ConfigValidationError>) {
    let level = config.logging.level.trim().to_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(invalid(
            "logging.level",
            "expected one of trace, debug, info, warn, error",
        ));
    }
}
