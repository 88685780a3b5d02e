// src/config/settings.rs

//! Resolved run settings: config file + environment + CLI overrides.

use std::path::PathBuf;
use std::sync::Arc;

use crate::config::env::{
    DEFAULT_WINE_ARCH, ENV_PRIMARY_PID, ENV_START_DEPENDENT, ENV_START_PRIMARY, ENV_WINE_ARCH,
    ENV_WINE_PREFIX, EnvSource, IsolationEnv,
};
use crate::config::model::{ConfigFile, DependentSection, PrimarySection};
use crate::config::validate::validate_wine_arch;
use crate::errors::Result;
use crate::exec::{CommandSpec, OutputMode};
use crate::types::{Pid, PidRadix, Role, RoleSelection};

/// Everything a run needs to build its commands. Immutable once resolved.
#[derive(Debug, Clone)]
pub struct Settings {
    pub wine_binary: String,
    pub env: Arc<IsolationEnv>,
    pub primary: PrimarySection,
    pub dependent: DependentSection,
    pub discovery_shell: String,
    pub discovery_command: String,
    pub discovery_radix: PidRadix,
    /// Raw pre-supplied primary pid; only parsed when the primary is not
    /// started by this run.
    pub preset_pid: Option<String>,
}

impl Settings {
    /// Combine the config file with the environment.
    ///
    /// `preset_pid` is the `--gw-pid` flag, which wins over `GW1H_GW_PID`.
    pub fn resolve(
        file: ConfigFile,
        env: &impl EnvSource,
        preset_pid: Option<String>,
    ) -> Result<Self> {
        let arch = env
            .var(ENV_WINE_ARCH)
            .or_else(|| file.wine.arch.clone())
            .unwrap_or_else(|| DEFAULT_WINE_ARCH.to_string());
        validate_wine_arch(&arch)?;

        let prefix = match env
            .var(ENV_WINE_PREFIX)
            .map(PathBuf::from)
            .or_else(|| file.wine.prefix.clone())
            .or_else(|| env.var("PWD").map(PathBuf::from))
        {
            Some(prefix) => prefix,
            None => std::env::current_dir()?,
        };

        let isolation = IsolationEnv::wine(env.vars(), &arch, &prefix);

        let discovery_command = file
            .discovery
            .command
            .clone()
            .unwrap_or_else(|| default_discovery_command(&file.primary.executable));

        Ok(Self {
            wine_binary: file.wine.binary,
            env: Arc::new(isolation),
            primary: file.primary,
            dependent: file.dependent,
            discovery_shell: file.discovery.shell,
            discovery_command,
            discovery_radix: file.discovery.radix,
            preset_pid: preset_pid.or_else(|| env.var(ENV_PRIMARY_PID)),
        })
    }

    /// `wine <primary.executable> <args...>`
    pub fn primary_command(&self) -> CommandSpec {
        let mut args = vec![self.primary.executable.clone()];
        args.extend(self.primary.args.iter().cloned());
        self.wine_command(Role::Primary, args)
    }

    /// `wine <dependent.executable> <pid_flag> <pid> <args...>`
    pub fn dependent_command(&self, pid: Pid) -> CommandSpec {
        let mut args = vec![
            self.dependent.executable.clone(),
            self.dependent.pid_flag.clone(),
            pid.to_string(),
        ];
        args.extend(self.dependent.args.iter().cloned());
        self.wine_command(Role::Dependent, args)
    }

    /// `<shell> -c <pipeline>`, stdout captured.
    pub fn discovery_command(&self) -> CommandSpec {
        CommandSpec {
            role: Role::Discovery,
            program: self.discovery_shell.clone(),
            args: vec!["-c".to_string(), self.discovery_command.clone()],
            env: Arc::clone(&self.env),
            output: OutputMode::Capture,
        }
    }

    fn wine_command(&self, role: Role, args: Vec<String>) -> CommandSpec {
        CommandSpec {
            role,
            program: self.wine_binary.clone(),
            args,
            env: Arc::clone(&self.env),
            output: OutputMode::Forward,
        }
    }
}

/// Roles come from `GW1H_GW` / `GW1H_TOOLBOX` (presence is enough) or the
/// matching CLI flags.
pub fn resolve_roles(env: &impl EnvSource, cli_primary: bool, cli_dependent: bool) -> RoleSelection {
    RoleSelection {
        primary: cli_primary || env.contains(ENV_START_PRIMARY),
        dependent: cli_dependent || env.contains(ENV_START_DEPENDENT),
    }
}

/// List wine processes, keep the primary's line, print its hex pid.
pub fn default_discovery_command(primary_executable: &str) -> String {
    let name = executable_file_name(primary_executable).replace('\'', r"'\''");
    format!(r#"winedbg --command "info process" | grep -F '{name}' | awk '{{print $1}}'"#)
}

/// Last component of a Windows or Unix style path.
fn executable_file_name(path: &str) -> &str {
    path.rsplit(['\\', '/']).next().unwrap_or(path)
}
