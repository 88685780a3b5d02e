// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::env::{ENV_CONFIG, EnvSource};
use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{Gw1hError, Result};

/// Load a configuration file from a given path and return the raw
/// `RawConfigFile`.
///
/// This only performs TOML deserialization; use [`load_and_validate`] for
/// the checked form.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a configuration file from path and run validation.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let raw_config = load_from_path(&path)?;
    let config = ConfigFile::try_from(raw_config)?;
    Ok(config)
}

/// Default config file name, looked up in the working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("gw1h.toml")
}

/// Decide which config file (if any) to read.
///
/// 1. an explicit `--config` path, which must exist
/// 2. `GW1H_CONFIG`, which must exist
/// 3. `gw1h.toml` in the working directory, only if present
pub fn locate(explicit: Option<&Path>, env: &impl EnvSource) -> Result<Option<PathBuf>> {
    let requested = explicit
        .map(Path::to_path_buf)
        .or_else(|| env.var(ENV_CONFIG).map(PathBuf::from));

    if let Some(path) = requested {
        if !path.is_file() {
            return Err(Gw1hError::Configuration(format!(
                "config file {} does not exist",
                path.display()
            )));
        }
        return Ok(Some(path));
    }

    let fallback = default_config_path();
    Ok(fallback.is_file().then_some(fallback))
}

/// Locate and load the config, falling back to built-in defaults.
pub fn load_or_default(explicit: Option<&Path>, env: &impl EnvSource) -> Result<ConfigFile> {
    match locate(explicit, env)? {
        Some(path) => {
            debug!(path = %path.display(), "loading config file");
            load_and_validate(&path)
        }
        None => {
            debug!("no config file found; using built-in defaults");
            Ok(ConfigFile::default())
        }
    }
}
