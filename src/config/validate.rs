// src/config/validate.rs

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{Gw1hError, Result};

const WINE_ARCHES: [&str; 2] = ["win32", "win64"];

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = Gw1hError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_wine(cfg)?;
    validate_programs(cfg)?;
    validate_discovery(cfg)?;
    Ok(())
}

/// Check a `WINEARCH` value, wherever it came from.
pub fn validate_wine_arch(arch: &str) -> Result<()> {
    if WINE_ARCHES.contains(&arch) {
        Ok(())
    } else {
        Err(Gw1hError::Configuration(format!(
            "invalid wine arch '{arch}' (expected \"win32\" or \"win64\")"
        )))
    }
}

fn validate_wine(cfg: &RawConfigFile) -> Result<()> {
    if cfg.wine.binary.trim().is_empty() {
        return Err(config_error("[wine].binary must not be empty"));
    }
    if let Some(arch) = &cfg.wine.arch {
        validate_wine_arch(arch)?;
    }
    Ok(())
}

fn validate_programs(cfg: &RawConfigFile) -> Result<()> {
    if cfg.primary.executable.trim().is_empty() {
        return Err(config_error("[primary].executable must not be empty"));
    }
    if cfg.dependent.executable.trim().is_empty() {
        return Err(config_error("[dependent].executable must not be empty"));
    }
    if cfg.dependent.pid_flag.trim().is_empty() {
        return Err(config_error("[dependent].pid_flag must not be empty"));
    }
    Ok(())
}

fn validate_discovery(cfg: &RawConfigFile) -> Result<()> {
    if cfg.discovery.shell.trim().is_empty() {
        return Err(config_error("[discovery].shell must not be empty"));
    }
    if let Some(command) = &cfg.discovery.command {
        if command.trim().is_empty() {
            return Err(config_error(
                "[discovery].command must not be blank (omit it to use the default pipeline)",
            ));
        }
    }
    Ok(())
}

fn config_error(msg: &str) -> Gw1hError {
    Gw1hError::Configuration(msg.to_string())
}
