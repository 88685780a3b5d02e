// src/config/env.rs

//! Environment lookup and the wine isolation environment.

use std::collections::BTreeMap;
use std::path::Path;

pub const ENV_START_PRIMARY: &str = "GW1H_GW";
pub const ENV_START_DEPENDENT: &str = "GW1H_TOOLBOX";
pub const ENV_PRIMARY_PID: &str = "GW1H_GW_PID";
pub const ENV_WINE_ARCH: &str = "GW1H_WINE_ARCH";
pub const ENV_WINE_PREFIX: &str = "GW1H_WINE_PREFIX";
pub const ENV_CONFIG: &str = "GW1H_CONFIG";

pub const DEFAULT_WINE_ARCH: &str = "win64";

/// Read access to environment variables.
///
/// Production code uses [`ProcessEnv`]; tests use a `BTreeMap`.
pub trait EnvSource {
    fn var(&self, key: &str) -> Option<String>;

    /// Presence check; the value does not matter.
    fn contains(&self, key: &str) -> bool {
        self.var(key).is_some()
    }

    /// Snapshot of every variable, inherited by spawned processes.
    fn vars(&self) -> Vec<(String, String)>;
}

/// The real process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }

    fn contains(&self, key: &str) -> bool {
        std::env::var_os(key).is_some()
    }

    fn vars(&self) -> Vec<(String, String)> {
        std::env::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
            .collect()
    }
}

impl EnvSource for BTreeMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }

    fn vars(&self) -> Vec<(String, String)> {
        self.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }
}

/// Ordered environment handed to every spawned process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IsolationEnv {
    vars: Vec<(String, String)>,
}

impl IsolationEnv {
    /// The inherited environment with `WINEARCH` and `WINEPREFIX` replaced.
    pub fn wine(
        inherited: impl IntoIterator<Item = (String, String)>,
        arch: &str,
        prefix: &Path,
    ) -> Self {
        let mut vars: Vec<(String, String)> = inherited
            .into_iter()
            .filter(|(k, _)| k != "WINEARCH" && k != "WINEPREFIX")
            .collect();
        vars.push(("WINEARCH".to_string(), arch.to_string()));
        vars.push((
            "WINEPREFIX".to_string(),
            prefix.to_string_lossy().into_owned(),
        ));
        Self { vars }
    }

    pub fn vars(&self) -> &[(String, String)] {
        &self.vars
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}
