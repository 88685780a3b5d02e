// src/logging.rs

//! Logging setup for `gw1h` using `tracing` + `tracing-subscriber`.
//!
//! Priority for determining the log level:
//! 1. `--log-level` CLI flag (if provided)
//! 2. `GW1H_LOG_LEVEL` environment variable (e.g. "info", "debug")
//! 3. default to `info`
//!
//! `GW1H_LOG_SOURCE` adds file/line to every event and `GW1H_LOG_JSON` (or
//! `--log-json`) switches to JSON lines.
//!
//! Logs are sent to STDERR; stdout carries the forwarded output of the
//! launched processes.

use anyhow::Result;
use tracing_subscriber::fmt;

use crate::cli::LogLevel;
use crate::config::EnvSource;

pub const ENV_LOG_LEVEL: &str = "GW1H_LOG_LEVEL";
pub const ENV_LOG_SOURCE: &str = "GW1H_LOG_SOURCE";
pub const ENV_LOG_JSON: &str = "GW1H_LOG_JSON";

/// Resolved logging options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogOptions {
    pub level: tracing::Level,
    pub with_source: bool,
    pub json: bool,
}

impl LogOptions {
    pub fn resolve(cli_level: Option<LogLevel>, cli_json: bool, env: &impl EnvSource) -> Self {
        let level = match cli_level {
            Some(lvl) => level_from_log_level(lvl),
            None => env
                .var(ENV_LOG_LEVEL)
                .and_then(|s| parse_level_str(&s))
                .unwrap_or(tracing::Level::INFO),
        };

        Self {
            level,
            with_source: env.contains(ENV_LOG_SOURCE),
            json: cli_json || env.contains(ENV_LOG_JSON),
        }
    }
}

/// Initialise global logging subscriber.
///
/// Safe to call once at startup.
pub fn init_logging(opts: LogOptions) -> Result<()> {
    let builder = fmt()
        .with_max_level(opts.level)
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_file(opts.with_source)
        .with_line_number(opts.with_source)
        .with_writer(std::io::stderr);

    if opts.json {
        builder.json().init();
    } else {
        builder.init();
    }

    Ok(())
}

fn level_from_log_level(lvl: LogLevel) -> tracing::Level {
    match lvl {
        LogLevel::Error => tracing::Level::ERROR,
        LogLevel::Warn => tracing::Level::WARN,
        LogLevel::Info => tracing::Level::INFO,
        LogLevel::Debug => tracing::Level::DEBUG,
        LogLevel::Trace => tracing::Level::TRACE,
    }
}

fn parse_level_str(s: &str) -> Option<tracing::Level> {
    match s.trim().to_lowercase().as_str() {
        "error" => Some(tracing::Level::ERROR),
        "warn" | "warning" => Some(tracing::Level::WARN),
        "info" => Some(tracing::Level::INFO),
        "debug" => Some(tracing::Level::DEBUG),
        "trace" => Some(tracing::Level::TRACE),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn cli_level_beats_env() {
        let opts = LogOptions::resolve(
            Some(LogLevel::Trace),
            false,
            &env(&[(ENV_LOG_LEVEL, "error")]),
        );
        assert_eq!(opts.level, tracing::Level::TRACE);
    }

    #[test]
    fn env_level_is_case_insensitive_and_defaults_to_info() {
        let opts = LogOptions::resolve(None, false, &env(&[(ENV_LOG_LEVEL, " Warning ")]));
        assert_eq!(opts.level, tracing::Level::WARN);

        let opts = LogOptions::resolve(None, false, &env(&[(ENV_LOG_LEVEL, "chatty")]));
        assert_eq!(opts.level, tracing::Level::INFO);
    }

    #[test]
    fn source_and_json_follow_presence() {
        let opts = LogOptions::resolve(
            None,
            false,
            &env(&[(ENV_LOG_SOURCE, ""), (ENV_LOG_JSON, "")]),
        );
        assert!(opts.with_source);
        assert!(opts.json);

        let opts = LogOptions::resolve(None, true, &BTreeMap::new());
        assert!(opts.json);
        assert!(!opts.with_source);
    }
}
