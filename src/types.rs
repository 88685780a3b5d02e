use std::fmt;
use std::num::NonZeroU32;
use std::process::ExitStatus;
use std::str::FromStr;

use serde::Deserialize;

/// Which external process something refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Role {
    /// The application the dependent attaches to.
    Primary,
    /// The tool that attaches to the primary by pid.
    Dependent,
    /// The diagnostic pipeline that lists host processes.
    Discovery,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Primary => "primary",
            Role::Dependent => "dependent",
            Role::Discovery => "discovery",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Runtime identifier of the primary process as seen by the host.
///
/// Zero and negative values cannot be represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Pid(NonZeroU32);

impl Pid {
    pub fn new(raw: u32) -> Option<Self> {
        NonZeroU32::new(raw).map(Pid)
    }

    pub fn get(self) -> u32 {
        self.0.get()
    }

    /// Parse a single discovery line in the given radix.
    ///
    /// Surrounding whitespace is ignored; for hex an optional `0x` prefix is
    /// accepted.
    pub fn parse_radix(s: &str, radix: PidRadix) -> Result<Self, String> {
        let trimmed = s.trim();
        let digits = match radix {
            PidRadix::Hex => trimmed
                .strip_prefix("0x")
                .or_else(|| trimmed.strip_prefix("0X"))
                .unwrap_or(trimmed),
            PidRadix::Decimal => trimmed,
        };

        if digits.is_empty() {
            return Err("empty pid".to_string());
        }

        let raw = u32::from_str_radix(digits, radix.base())
            .map_err(|e| format!("not a {} integer: {e}", radix.name()))?;

        Pid::new(raw).ok_or_else(|| "pid must be non-zero".to_string())
    }
}

impl FromStr for Pid {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Pid::parse_radix(s, PidRadix::Decimal)
    }
}

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.get())
    }
}

/// How lines printed by the discovery pipeline are parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PidRadix {
    /// Hexadecimal, as winedbg reports process ids.
    #[default]
    Hex,
    Decimal,
}

impl PidRadix {
    fn base(self) -> u32 {
        match self {
            PidRadix::Hex => 16,
            PidRadix::Decimal => 10,
        }
    }

    fn name(self) -> &'static str {
        match self {
            PidRadix::Hex => "hexadecimal",
            PidRadix::Decimal => "decimal",
        }
    }
}

/// How an external process terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessOutcome {
    Success,
    Failed(i32),
    Signaled(i32),
}

impl ProcessOutcome {
    pub fn success(self) -> bool {
        matches!(self, ProcessOutcome::Success)
    }
}

impl From<ExitStatus> for ProcessOutcome {
    fn from(status: ExitStatus) -> Self {
        if status.success() {
            return ProcessOutcome::Success;
        }
        if let Some(code) = status.code() {
            return ProcessOutcome::Failed(code);
        }
        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            if let Some(signal) = status.signal() {
                return ProcessOutcome::Signaled(signal);
            }
        }
        ProcessOutcome::Failed(-1)
    }
}

impl fmt::Display for ProcessOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessOutcome::Success => f.write_str("exit code 0"),
            ProcessOutcome::Failed(code) => write!(f, "exit code {code}"),
            ProcessOutcome::Signaled(signal) => write!(f, "killed by signal {signal}"),
        }
    }
}

/// Which roles this run starts. Read once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RoleSelection {
    pub primary: bool,
    pub dependent: bool,
}

impl RoleSelection {
    pub fn any(self) -> bool {
        self.primary || self.dependent
    }
}
