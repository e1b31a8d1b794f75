// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

use anyhow::{Context, Result};
use clap::Parser;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{error, info, warn};

use originstory_agent::{EventDispatcher, LocalClient, RandomSource, StatusEvent};
use originstory_config::{load_config_or_default, validate_config};
use originstory_observability::{debug_flags_help, init_logging, CrateDebugFlags, DEBUG_ENV};

mod settings;

/// OriginStory local agent - signs in, joins the current meeting and streams
/// probability telemetry while the server asks for it
#[derive(Parser, Debug)]
#[command(name = "originstory-local", version, author, long_about = None, after_help = debug_flags_help())]
struct Args {
    /// Coordination server URL (overrides config file)
    #[arg(short, long)]
    server: Option<String>,

    /// Account username
    #[arg(short, long)]
    username: String,

    /// Account password
    #[arg(short, long, env = "ORIGINSTORY_PASSWORD", hide_env_values = true)]
    password: String,

    /// Path to originstory_configuration.toml (searched for when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Telemetry interval in milliseconds (overrides config file)
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Seed the random probability source for reproducible runs
    #[arg(long)]
    seed: Option<u64>,

    /// Also write JSON log files to this directory
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

impl Args {
    fn overrides(&self) -> HashMap<String, String> {
        let mut overrides = HashMap::new();
        if let Some(server) = &self.server {
            overrides.insert("server_url".to_string(), server.clone());
        }
        if let Some(interval) = self.interval_ms {
            overrides.insert("interval_ms".to_string(), interval.to_string());
        }
        if let Some(dir) = &self.log_dir {
            overrides.insert("log_dir".to_string(), dir.display().to_string());
            overrides.insert("file_logging".to_string(), "true".to_string());
        }
        overrides
    }
}

/// `--debug-*` flags are not clap options; split them off first
fn split_debug_args<I>(args: I) -> (Vec<String>, Vec<String>)
where
    I: IntoIterator<Item = String>,
{
    args.into_iter().partition(|arg| arg.starts_with("--debug-"))
}

fn log_status_event(event: &StatusEvent) {
    match event {
        StatusEvent::LoginFail { msg } => warn!("[CLIENT] Login failed: {}", msg),
        StatusEvent::LoginError { msg } => error!("[CLIENT] Login error: {}", msg.replace('\n', " ")),
        StatusEvent::ServerDisconnected => warn!("[CLIENT] Server disconnected"),
        other => info!("[CLIENT] {} {}", other.action(), other.payload()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let (debug_args, cli_args) = split_debug_args(std::env::args());
    let args = Args::parse_from(cli_args);

    let mut debug_flags = CrateDebugFlags::from_args(debug_args);
    if let Ok(value) = std::env::var(DEBUG_ENV) {
        debug_flags.apply_env_value(&value);
    }

    let config = load_config_or_default(args.config.as_deref(), Some(&args.overrides()))
        .context("Failed to load configuration")?;
    validate_config(&config)?;

    let _logging = init_logging(&debug_flags, &settings::logging_options(&config, args.verbose))?;
    info!("[CLIENT] originstory-local v{}", env!("CARGO_PKG_VERSION"));
    info!("[CLIENT] Server: {}", config.server.url);
    info!("[CLIENT] Telemetry interval: {}ms", config.streaming.interval_ms);

    let source = match args.seed {
        Some(seed) => RandomSource::seeded(seed),
        None => RandomSource::new(),
    };
    let dispatcher = EventDispatcher::with_callback(log_status_event);
    let client = LocalClient::spawn_websocket(settings::agent_config(&config), source, dispatcher)?;

    client.login(&args.username, &args.password)?;
    info!("[CLIENT] Running (Press Ctrl+C to stop)...");

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl+C")?;
    info!("[CLIENT] Shutdown signal received...");

    let report = client.sign_out().await?;
    if !report.is_clean() {
        warn!("[CLIENT] Sign-out incomplete: {}", report);
    }
    client.shutdown().await?;

    info!("[CLIENT] Shutdown complete");
    Ok(())
}
