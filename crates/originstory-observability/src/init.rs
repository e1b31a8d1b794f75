// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Logging initialization
//!
//! Console output always; with the `file-logging` feature and
//! [`LoggingOptions::file_logging`] set, also JSON files in a timestamped
//! run folder:
//! ```text
//! ./logs/
//!   └── run_20250101_120000/
//!       ├── originstory-agent.log
//!       ├── originstory-transports.log
//!       └── originstory.log (combined)
//! ```

use anyhow::{Context, Result};
use chrono::{NaiveDateTime, Utc};
use std::path::{Path, PathBuf};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::cli::CrateDebugFlags;
use crate::config::LoggingOptions;

const RUN_PREFIX: &str = "run_";
const RUN_FORMAT: &str = "%Y%m%d_%H%M%S";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Keeps file writers flushing until dropped
pub struct LoggingGuard {
    #[cfg(feature = "file-logging")]
    _file_guards: Vec<tracing_appender::non_blocking::WorkerGuard>,
    run_dir: Option<PathBuf>,
}

impl LoggingGuard {
    /// Run folder receiving log files, if file logging is active
    pub fn run_dir(&self) -> Option<&Path> {
        self.run_dir.as_deref()
    }
}

fn env_filter(directives: &str) -> Result<EnvFilter> {
    EnvFilter::try_new(directives)
        .with_context(|| format!("Invalid log filter '{}'", directives))
}

/// Install the global subscriber
///
/// # Errors
///
/// Fails on an unparsable level, when the log directory cannot be created,
/// or when a global subscriber is already installed.
pub fn init_logging(debug_flags: &CrateDebugFlags, options: &LoggingOptions) -> Result<LoggingGuard> {
    let filter = debug_flags.to_filter_string(&options.filter_level());

    let mut layers: Vec<BoxedLayer> = Vec::new();
    layers.push(
        tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_file(false)
            .with_line_number(false)
            .with_filter(env_filter(&filter)?)
            .boxed(),
    );

    #[cfg(feature = "file-logging")]
    let (file_guards, run_dir) = if options.file_logging {
        let (guards, run_dir) = file_layers(&filter, options, &mut layers)?;
        (guards, Some(run_dir))
    } else {
        (Vec::new(), None)
    };
    #[cfg(not(feature = "file-logging"))]
    let run_dir: Option<PathBuf> = None;

    Registry::default()
        .with(layers)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    if cfg!(not(feature = "file-logging")) && options.file_logging {
        tracing::warn!("[LOGGING] File logging requested but the `file-logging` feature is disabled");
    }
    if let Some(dir) = &run_dir {
        tracing::info!("[LOGGING] Writing log files to {}", dir.display());
    }

    Ok(LoggingGuard {
        #[cfg(feature = "file-logging")]
        _file_guards: file_guards,
        run_dir,
    })
}

/// Console logging at `info`, honoring debug flags
pub fn init_logging_default(debug_flags: &CrateDebugFlags) -> Result<LoggingGuard> {
    init_logging(debug_flags, &LoggingOptions::default())
}

#[cfg(feature = "file-logging")]
fn file_layers(
    filter: &str,
    options: &LoggingOptions,
    layers: &mut Vec<BoxedLayer>,
) -> Result<(Vec<tracing_appender::non_blocking::WorkerGuard>, PathBuf)> {
    use tracing_appender::rolling;

    let timestamp = Utc::now().format(RUN_FORMAT);
    let run_dir = options.log_dir.join(format!("{}{}", RUN_PREFIX, timestamp));
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("Failed to create log directory: {}", run_dir.display()))?;

    cleanup_old_logs(&options.log_dir, options.retention_days, options.retention_runs)?;

    let mut guards = Vec::new();

    for crate_name in crate::KNOWN_CRATES {
        let appender = rolling::daily(&run_dir, format!("{}.log", crate_name));
        let (writer, guard) = tracing_appender::non_blocking(appender);
        guards.push(guard);
        layers.push(
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .json()
                .with_filter(env_filter(&format!(
                    "off,{}=debug",
                    crate_name.replace('-', "_")
                ))?)
                .boxed(),
        );
    }

    let combined = rolling::daily(&run_dir, "originstory.log");
    let (writer, guard) = tracing_appender::non_blocking(combined);
    guards.push(guard);
    layers.push(
        tracing_subscriber::fmt::layer()
            .with_writer(writer)
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .json()
            .with_filter(env_filter(filter)?)
            .boxed(),
    );

    Ok((guards, run_dir))
}

/// Delete run folders older than `retention_days`, then all but the newest
/// `retention_runs` (at least one is always kept). Folders not named
/// `run_YYYYmmdd_HHMMSS` are left alone. Returns how many were removed.
pub fn cleanup_old_logs(
    base_log_dir: &Path,
    retention_days: u64,
    retention_runs: usize,
) -> Result<usize> {
    if !base_log_dir.exists() {
        return Ok(0);
    }

    let cutoff = Utc::now().naive_utc() - chrono::Duration::days(retention_days as i64);
    let retention_runs = retention_runs.max(1);

    let mut runs: Vec<(PathBuf, NaiveDateTime)> = Vec::new();
    for entry in std::fs::read_dir(base_log_dir)
        .with_context(|| format!("Failed to read log directory: {}", base_log_dir.display()))?
    {
        let path = entry?.path();
        if !path.is_dir() {
            continue;
        }
        let started = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| n.strip_prefix(RUN_PREFIX))
            .and_then(|ts| NaiveDateTime::parse_from_str(ts, RUN_FORMAT).ok());
        if let Some(started) = started {
            runs.push((path, started));
        }
    }

    // newest first
    runs.sort_by(|a, b| b.1.cmp(&a.1));

    let mut removed = 0;
    for (index, (path, started)) in runs.iter().enumerate() {
        if index < retention_runs && *started >= cutoff {
            continue;
        }
        match std::fs::remove_dir_all(path) {
            Ok(()) => removed += 1,
            Err(e) => eprintln!(
                "Warning: Failed to remove old log directory {}: {}",
                path.display(),
                e
            ),
        }
    }

    Ok(removed)
}
