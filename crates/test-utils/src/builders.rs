use std::collections::BTreeMap;
use std::sync::Arc;

use gw1h::config::{ConfigFile, RawConfigFile, Settings};
use gw1h::types::PidRadix;

/// Builder for `Settings` to simplify test setup.
///
/// Starts from the built-in config defaults and a tiny fake environment, so
/// nothing depends on the machine running the tests.
pub struct SettingsBuilder {
    config: RawConfigFile,
    env: BTreeMap<String, String>,
    preset_pid: Option<String>,
}

impl SettingsBuilder {
    pub fn new() -> Self {
        let mut env = BTreeMap::new();
        env.insert("PATH".to_string(), "/usr/bin:/bin".to_string());
        env.insert("PWD".to_string(), "/games/gw1".to_string());
        Self {
            config: RawConfigFile::default(),
            env,
            preset_pid: None,
        }
    }

    pub fn with_env(mut self, key: &str, value: &str) -> Self {
        self.env.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_preset_pid(mut self, raw: &str) -> Self {
        self.preset_pid = Some(raw.to_string());
        self
    }

    pub fn with_primary_executable(mut self, executable: &str) -> Self {
        self.config.primary.executable = executable.to_string();
        self
    }

    pub fn with_dependent_args(mut self, args: &[&str]) -> Self {
        self.config.dependent.args = args.iter().map(|a| a.to_string()).collect();
        self
    }

    pub fn with_discovery_command(mut self, command: &str) -> Self {
        self.config.discovery.command = Some(command.to_string());
        self
    }

    pub fn with_discovery_radix(mut self, radix: PidRadix) -> Self {
        self.config.discovery.radix = radix;
        self
    }

    pub fn build(self) -> Arc<Settings> {
        let file = ConfigFile::try_from(self.config).expect("builder produced an invalid config");
        let settings = Settings::resolve(file, &self.env, self.preset_pid)
            .expect("builder produced unresolvable settings");
        Arc::new(settings)
    }
}

impl Default for SettingsBuilder {
    fn default() -> Self {
        Self::new()
    }
}
