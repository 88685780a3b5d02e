// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Command-line arguments for `gw1h`.
///
/// Every flag has an environment counterpart; see the `--help` text of each.
#[derive(Debug, Clone, Default, Parser)]
#[command(
    name = "gw1h",
    version,
    about = "Launch Guild Wars and GWToolbox under wine, attaching the toolbox to the game's pid.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to a TOML config file.
    ///
    /// Default: `GW1H_CONFIG`, else `gw1h.toml` in the working directory if
    /// it exists, else built-in defaults.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Start the primary (same as setting `GW1H_GW`).
    #[arg(long)]
    pub gw: bool,

    /// Start the dependent (same as setting `GW1H_TOOLBOX`).
    #[arg(long)]
    pub toolbox: bool,

    /// Pid of an already running primary, for dependent-only runs.
    ///
    /// Overrides `GW1H_GW_PID`.
    #[arg(long, value_name = "PID")]
    pub gw_pid: Option<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `GW1H_LOG_LEVEL` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Emit logs as JSON lines (same as setting `GW1H_LOG_JSON`).
    #[arg(long)]
    pub log_json: bool,

    /// Resolve config and print the commands that would run, without
    /// starting anything.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
