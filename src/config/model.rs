// src/config/model.rs

use std::path::PathBuf;

use serde::Deserialize;

use crate::types::PidRadix;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [wine]
/// binary = "wine"
/// arch = "win64"
/// prefix = "/home/me/.local/share/gw1"
///
/// [primary]
/// executable = 'C:\Program Files (x86)\Guild Wars\Gw.exe'
///
/// [dependent]
/// executable = 'C:\Program Files (x86)\GWToolbox\GWToolbox.exe'
/// pid_flag = "/pid"
///
/// [discovery]
/// radix = "hex"
/// ```
///
/// All sections are optional and have reasonable defaults. This is the
/// unvalidated form; use [`ConfigFile`] everywhere else.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RawConfigFile {
    pub wine: WineSection,
    pub primary: PrimarySection,
    pub dependent: DependentSection,
    pub discovery: DiscoverySection,
}

/// `[wine]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WineSection {
    /// Program used to run every Windows executable.
    pub binary: String,
    /// `WINEARCH`; `GW1H_WINE_ARCH` wins over this.
    pub arch: Option<String>,
    /// `WINEPREFIX`; `GW1H_WINE_PREFIX` wins over this.
    pub prefix: Option<PathBuf>,
}

impl Default for WineSection {
    fn default() -> Self {
        Self {
            binary: "wine".to_string(),
            arch: None,
            prefix: None,
        }
    }
}

/// `[primary]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PrimarySection {
    pub executable: String,
    pub args: Vec<String>,
}

impl Default for PrimarySection {
    fn default() -> Self {
        Self {
            executable: r"C:\Program Files (x86)\Guild Wars\Gw.exe".to_string(),
            args: Vec::new(),
        }
    }
}

/// `[dependent]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DependentSection {
    pub executable: String,
    /// Flag placed right before the primary pid on the command line.
    pub pid_flag: String,
    /// Extra arguments appended after the pid.
    pub args: Vec<String>,
}

impl Default for DependentSection {
    fn default() -> Self {
        Self {
            executable: r"C:\Program Files (x86)\GWToolbox\GWToolbox.exe".to_string(),
            pid_flag: "/pid".to_string(),
            args: Vec::new(),
        }
    }
}

/// `[discovery]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DiscoverySection {
    /// Shell used to run the pipeline (`<shell> -c <command>`).
    pub shell: String,
    /// Replaces the default winedbg pipeline. Must print one pid per line.
    pub command: Option<String>,
    pub radix: PidRadix,
}

impl Default for DiscoverySection {
    fn default() -> Self {
        Self {
            shell: "bash".to_string(),
            command: None,
            radix: PidRadix::default(),
        }
    }
}

/// Validated configuration.
///
/// Only constructible through `TryFrom<RawConfigFile>` (see `validate.rs`).
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub wine: WineSection,
    pub primary: PrimarySection,
    pub dependent: DependentSection,
    pub discovery: DiscoverySection,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(raw: RawConfigFile) -> Self {
        Self {
            wine: raw.wine,
            primary: raw.primary,
            dependent: raw.dependent,
            discovery: raw.discovery,
        }
    }
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self::new_unchecked(RawConfigFile::default())
    }
}
