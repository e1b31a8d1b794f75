// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Per-crate debug flags
//!
//! Supports `--debug-originstory-agent`, `--debug-all` and the
//! `ORIGINSTORY_DEBUG` environment variable.

use std::collections::BTreeSet;
use std::env;

use crate::KNOWN_CRATES;

pub const DEBUG_ENV: &str = "ORIGINSTORY_DEBUG";

/// Crates with debug logging switched on
///
/// ```rust
/// use originstory_observability::CrateDebugFlags;
///
/// let flags = CrateDebugFlags::from_args(vec!["--debug-originstory-agent".to_string()]);
/// assert!(flags.is_enabled("originstory-agent"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrateDebugFlags {
    enabled_crates: BTreeSet<String>,
}

impl CrateDebugFlags {
    /// Parse `--debug-{crate}` and `--debug-all` out of an argument list;
    /// every other argument is ignored
    pub fn from_args<I>(args: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let mut flags = Self::default();
        for arg in args {
            if arg == "--debug-all" {
                flags.enable_all();
            } else if let Some(crate_name) = arg.strip_prefix("--debug-") {
                flags.enable(crate_name);
            }
        }
        flags
    }

    /// Merge a `ORIGINSTORY_DEBUG` style value: `all` or comma-separated names
    pub fn apply_env_value(&mut self, value: &str) {
        if value.trim() == "all" {
            self.enable_all();
            return;
        }
        for crate_name in value.split(',') {
            self.enable(crate_name);
        }
    }

    pub fn enable(&mut self, crate_name: &str) {
        let crate_name = crate_name.trim();
        if !crate_name.is_empty() {
            self.enabled_crates.insert(crate_name.to_string());
        }
    }

    pub fn enable_all(&mut self) {
        for crate_name in KNOWN_CRATES {
            self.enable(crate_name);
        }
    }

    pub fn is_enabled(&self, crate_name: &str) -> bool {
        self.enabled_crates.contains(crate_name)
    }

    pub fn enabled_crates(&self) -> impl Iterator<Item = &str> {
        self.enabled_crates.iter().map(String::as_str)
    }

    pub fn any_enabled(&self) -> bool {
        !self.enabled_crates.is_empty()
    }

    /// `DEBUG` for enabled crates, `INFO` otherwise
    pub fn log_level(&self, crate_name: &str) -> tracing::Level {
        if self.is_enabled(crate_name) {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }

    /// `EnvFilter` directives: `base` for everything, `debug` for enabled crates.
    ///
    /// Crate names are turned into tracing targets (`originstory-agent` ->
    /// `originstory_agent`).
    pub fn to_filter_string(&self, base: &str) -> String {
        let mut filters = vec![base.to_string()];
        filters.extend(
            self.enabled_crates
                .iter()
                .map(|name| format!("{}=debug", name.replace('-', "_"))),
        );
        filters.join(",")
    }
}

/// Debug flags from the process arguments plus `ORIGINSTORY_DEBUG`
pub fn parse_debug_flags() -> CrateDebugFlags {
    let mut flags = CrateDebugFlags::from_args(env::args());
    if let Ok(value) = env::var(DEBUG_ENV) {
        flags.apply_env_value(&value);
    }
    flags
}

/// Help text for debug flags
pub fn debug_flags_help() -> String {
    format!(
        r#"Debug Flags:
  --debug-all                    Enable debug logging for all crates
  --debug-{{crate-name}}          Enable debug logging for specific crate

Available crates:
  {}

Environment Variable:
  {env}={{crate-name}}[,{{crate-name}}]  Enable debug for crates (comma-separated)
  {env}=all                               Enable debug for all crates
"#,
        KNOWN_CRATES.join(", "),
        env = DEBUG_ENV,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_crate_flag() {
        let flags = CrateDebugFlags::from_args(vec![
            "originstory-local".to_string(),
            "--debug-originstory-agent".to_string(),
            "--server".to_string(),
        ]);
        assert!(flags.is_enabled("originstory-agent"));
        assert!(!flags.is_enabled("originstory-transports"));
    }

    #[test]
    fn test_debug_all() {
        let flags = CrateDebugFlags::from_args(vec!["--debug-all".to_string()]);
        for crate_name in KNOWN_CRATES {
            assert!(flags.is_enabled(crate_name), "{} should be enabled", crate_name);
        }
    }

    #[test]
    fn test_env_value() {
        let mut flags = CrateDebugFlags::default();
        flags.apply_env_value(" originstory-agent , ,originstory-config");
        assert_eq!(
            flags.enabled_crates().collect::<Vec<_>>(),
            vec!["originstory-agent", "originstory-config"]
        );

        let mut all = CrateDebugFlags::default();
        all.apply_env_value("all");
        assert_eq!(all.enabled_crates().count(), KNOWN_CRATES.len());
    }

    #[test]
    fn test_filter_string() {
        let flags = CrateDebugFlags::from_args(vec!["--debug-originstory-transports".to_string()]);
        assert_eq!(
            flags.to_filter_string("info"),
            "info,originstory_transports=debug"
        );
        assert_eq!(CrateDebugFlags::default().to_filter_string("warn"), "warn");
    }

    #[test]
    fn test_log_level() {
        let flags = CrateDebugFlags::from_args(vec!["--debug-originstory-agent".to_string()]);
        assert_eq!(flags.log_level("originstory-agent"), tracing::Level::DEBUG);
        assert_eq!(flags.log_level("originstory-config"), tracing::Level::INFO);
    }
}
