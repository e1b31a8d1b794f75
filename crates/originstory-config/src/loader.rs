// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration file loading with override support
//!
//! Three tiers, later ones winning:
//! 1. TOML file (base values; built-in defaults fill anything missing)
//! 2. Environment variables (runtime overrides)
//! 3. CLI arguments (explicit user overrides)

use crate::{ConfigError, ConfigResult, OriginStoryConfig};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "originstory_configuration.toml";
pub const CONFIG_PATH_ENV: &str = "ORIGINSTORY_CONFIG_PATH";

/// Find the configuration file
///
/// Search order:
/// 1. `ORIGINSTORY_CONFIG_PATH` environment variable
/// 2. Current working directory
/// 3. Up to 5 parent directories
///
/// # Errors
///
/// Returns `ConfigError::FileNotFound` if no config file is found in any location
pub fn find_config_file() -> ConfigResult<PathBuf> {
    if let Ok(env_path) = env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return Ok(path);
        }
        return Err(ConfigError::FileNotFound(format!(
            "Config file specified by {} not found: {}",
            CONFIG_PATH_ENV,
            path.display()
        )));
    }

    let mut search_paths = Vec::new();
    if let Ok(cwd) = env::current_dir() {
        search_paths.push(cwd.join(CONFIG_FILE_NAME));
        let mut current = cwd.as_path();
        for _ in 0..5 {
            match current.parent() {
                Some(parent) => {
                    search_paths.push(parent.join(CONFIG_FILE_NAME));
                    current = parent;
                }
                None => break,
            }
        }
    }

    if let Some(path) = search_paths.iter().find(|p| p.exists()) {
        return Ok(path.clone());
    }

    let search_list = search_paths
        .iter()
        .map(|p| format!("  - {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n");

    Err(ConfigError::FileNotFound(format!(
        "'{}' not found in any of these locations:\n{}\n\nSet {} to specify a custom location.",
        CONFIG_FILE_NAME, search_list, CONFIG_PATH_ENV
    )))
}

/// Load configuration from a TOML file, then apply overrides
///
/// With `config_path = None` the file is searched for with [`find_config_file`].
///
/// # Errors
///
/// Returns error if the file is not found or contains invalid TOML
pub fn load_config(
    config_path: Option<&Path>,
    cli_args: Option<&HashMap<String, String>>,
) -> ConfigResult<OriginStoryConfig> {
    let config_file = match config_path {
        Some(path) => path.to_path_buf(),
        None => find_config_file()?,
    };

    let content = fs::read_to_string(&config_file)?;
    let mut config: OriginStoryConfig = toml::from_str(&content)?;

    apply_environment_overrides(&mut config);
    if let Some(cli) = cli_args {
        apply_cli_overrides(&mut config, cli);
    }

    Ok(config)
}

/// Like [`load_config`], but a config file that cannot be found by searching
/// yields the built-in defaults (overrides still applied). An explicit path,
/// either argument or `ORIGINSTORY_CONFIG_PATH`, must exist.
pub fn load_config_or_default(
    config_path: Option<&Path>,
    cli_args: Option<&HashMap<String, String>>,
) -> ConfigResult<OriginStoryConfig> {
    if config_path.is_some() || env::var_os(CONFIG_PATH_ENV).is_some() {
        return load_config(config_path, cli_args);
    }

    match find_config_file() {
        Ok(path) => load_config(Some(&path), cli_args),
        Err(ConfigError::FileNotFound(_)) => {
            let mut config = OriginStoryConfig::default();
            apply_environment_overrides(&mut config);
            if let Some(cli) = cli_args {
                apply_cli_overrides(&mut config, cli);
            }
            Ok(config)
        }
        Err(e) => Err(e),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Apply environment variable overrides to configuration
///
/// Supported environment variables:
/// - `ORIGINSTORY_SERVER_URL` -> `server.url`
/// - `ORIGINSTORY_EVENT_NAME` -> `server.event_name`
/// - `ORIGINSTORY_AUTO_RECONNECT` -> `transport.auto_reconnect`
/// - `ORIGINSTORY_RECONNECT_DELAY_MS` -> `transport.reconnect_base_delay_ms`
/// - `ORIGINSTORY_MAX_RECONNECT_ATTEMPTS` -> `transport.max_reconnect_attempts`
/// - `ORIGINSTORY_CONNECT_TIMEOUT_MS` -> `transport.connect_timeout_ms`
/// - `ORIGINSTORY_STREAM_INTERVAL_MS` -> `streaming.interval_ms`
/// - `ORIGINSTORY_LOG_LEVEL` -> `logging.level`
/// - `ORIGINSTORY_LOG_DIR` -> `logging.log_dir`
///
/// Values that fail to parse are ignored.
pub fn apply_environment_overrides(config: &mut OriginStoryConfig) {
    if let Ok(value) = env::var("ORIGINSTORY_SERVER_URL") {
        config.server.url = value;
    }
    if let Ok(value) = env::var("ORIGINSTORY_EVENT_NAME") {
        config.server.event_name = value;
    }

    if let Some(flag) = env::var("ORIGINSTORY_AUTO_RECONNECT")
        .ok()
        .as_deref()
        .and_then(parse_bool)
    {
        config.transport.auto_reconnect = flag;
    }
    if let Ok(value) = env::var("ORIGINSTORY_RECONNECT_DELAY_MS") {
        if let Ok(ms) = value.parse::<u64>() {
            config.transport.reconnect_base_delay_ms = ms;
        }
    }
    if let Ok(value) = env::var("ORIGINSTORY_MAX_RECONNECT_ATTEMPTS") {
        if let Ok(attempts) = value.parse::<u32>() {
            config.transport.max_reconnect_attempts = attempts;
        }
    }
    if let Ok(value) = env::var("ORIGINSTORY_CONNECT_TIMEOUT_MS") {
        if let Ok(ms) = value.parse::<u64>() {
            config.transport.connect_timeout_ms = ms;
        }
    }

    if let Ok(value) = env::var("ORIGINSTORY_STREAM_INTERVAL_MS") {
        if let Ok(ms) = value.parse::<u64>() {
            config.streaming.interval_ms = ms;
        }
    }

    if let Ok(value) = env::var("ORIGINSTORY_LOG_LEVEL") {
        config.logging.level = value;
    }
    if let Ok(value) = env::var("ORIGINSTORY_LOG_DIR") {
        config.logging.log_dir = PathBuf::from(value);
    }
}

/// Apply CLI argument overrides to configuration
///
/// Recognized keys: `server_url`, `event_name`, `auto_reconnect`,
/// `interval_ms`, `log_level`, `log_dir`, `file_logging`.
pub fn apply_cli_overrides(config: &mut OriginStoryConfig, cli_args: &HashMap<String, String>) {
    if let Some(value) = cli_args.get("server_url") {
        config.server.url = value.clone();
    }
    if let Some(value) = cli_args.get("event_name") {
        config.server.event_name = value.clone();
    }
    if let Some(flag) = cli_args.get("auto_reconnect").and_then(|v| parse_bool(v)) {
        config.transport.auto_reconnect = flag;
    }
    if let Some(value) = cli_args.get("interval_ms") {
        if let Ok(ms) = value.parse::<u64>() {
            config.streaming.interval_ms = ms;
        }
    }
    if let Some(value) = cli_args.get("log_level") {
        config.logging.level = value.clone();
    }
    if let Some(value) = cli_args.get("log_dir") {
        config.logging.log_dir = PathBuf::from(value);
    }
    if let Some(flag) = cli_args.get("file_logging").and_then(|v| parse_bool(v)) {
        config.logging.file_logging = flag;
    }
}
