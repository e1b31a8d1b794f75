// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Logging options

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// How [`crate::init_logging`] sets up the subscriber
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingOptions {
    /// Base level for every target (trace, debug, info, warn, error)
    pub level: String,

    /// Write JSON log files in addition to the console
    pub file_logging: bool,

    /// Base directory for run folders
    pub log_dir: PathBuf,

    /// Delete run folders older than this many days
    pub retention_days: u64,

    /// Keep at most this many run folders
    pub retention_runs: usize,
}

impl Default for LoggingOptions {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file_logging: false,
            log_dir: PathBuf::from("./logs"),
            retention_days: 30,
            retention_runs: 10,
        }
    }
}

impl LoggingOptions {
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    pub fn with_file_logging(mut self, log_dir: impl Into<PathBuf>) -> Self {
        self.file_logging = true;
        self.log_dir = log_dir.into();
        self
    }

    /// `warning` is accepted as an alias of `warn`
    pub fn filter_level(&self) -> String {
        match self.level.trim().to_lowercase().as_str() {
            "warning" => "warn".to_string(),
            other => other.to_string(),
        }
    }
}
