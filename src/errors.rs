// src/errors.rs

//! Crate-wide error type and the run-level propagation policy.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::types::{Pid, ProcessOutcome, Role};

/// Why discovery could not settle on exactly one candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cardinality {
    None,
    Multiple(Vec<Pid>),
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cardinality::None => f.write_str("no candidate pids"),
            Cardinality::Multiple(pids) => {
                let list: Vec<String> = pids.iter().map(Pid::to_string).collect();
                write!(f, "multiple candidate pids [{}]", list.join(", "))
            }
        }
    }
}

#[derive(Error, Debug)]
pub enum Gw1hError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("failed to start {role} process `{program}`: {source}")]
    Spawn {
        role: Role,
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("unparseable pid discovery line {line:?}: {reason}")]
    StreamParse { line: String, reason: String },

    #[error("pid discovery found {0}")]
    DiscoveryCardinality(Cardinality),

    #[error("no primary pid received within {0:?}")]
    HandoffTimeout(Duration),

    #[error("{role} process {}", describe_exit(.outcome))]
    ProcessExit { role: Role, outcome: ProcessOutcome },

    #[error("{0} cancelled")]
    Cancelled(Role),

    #[error("{role} task aborted: {message}")]
    TaskAborted { role: Role, message: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),
}

impl Gw1hError {
    /// Whether this failure dooms the whole run and must fire the shared
    /// cancellation signal.
    ///
    /// An abnormal exit of the primary while it is still initialising also
    /// cancels the run, but only the primary launcher knows the phase, so it
    /// decides that case itself.
    pub fn cancels_run(&self) -> bool {
        match self {
            Gw1hError::Spawn { .. }
            | Gw1hError::StreamParse { .. }
            | Gw1hError::DiscoveryCardinality(_) => true,
            Gw1hError::ProcessExit { role, .. } => *role == Role::Discovery,
            _ => false,
        }
    }

    /// Everything except a cooperative unwind counts against the exit status.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Gw1hError::Cancelled(_))
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            Gw1hError::Configuration(_) => 2,
            Gw1hError::Spawn { .. } => 3,
            Gw1hError::StreamParse { .. } => 4,
            Gw1hError::DiscoveryCardinality(_) => 5,
            Gw1hError::HandoffTimeout(_) => 6,
            Gw1hError::ProcessExit { .. } => 7,
            Gw1hError::Cancelled(_) => 0,
            _ => 1,
        }
    }
}

/// A clean exit only becomes an error when the process was still needed.
fn describe_exit(outcome: &ProcessOutcome) -> String {
    if outcome.success() {
        "exited cleanly before it was ready".to_string()
    } else {
        format!("terminated abnormally ({outcome})")
    }
}

pub type Result<T> = std::result::Result<T, Gw1hError>;
