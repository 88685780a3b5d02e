// src/exec/process.rs

//! Pluggable process spawner abstraction.
//!
//! The launchers talk to a `ProcessSpawner` instead of `tokio::process`
//! directly, so tests can swap in a scripted fake while production uses
//! [`TokioSpawner`](super::TokioSpawner).

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::Arc;

use tokio::io::AsyncRead;
use tracing::warn;

use crate::config::IsolationEnv;
use crate::errors::Result;
use crate::types::{ProcessOutcome, Role};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub type ProcessStdout = Box<dyn AsyncRead + Send + Unpin>;

/// What to do with a child's stdout/stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Hand stdout to the caller via [`ProcessHandle::take_stdout`]; stderr
    /// is drained into debug logs.
    Capture,
    /// Re-emit both streams on our own stdout/stderr, prefixed with the role.
    Forward,
}

/// A fully resolved request to start one external process.
#[derive(Debug, Clone)]
pub struct CommandSpec {
    pub role: Role,
    pub program: String,
    pub args: Vec<String>,
    pub env: Arc<IsolationEnv>,
    pub output: OutputMode,
}

impl CommandSpec {
    /// Shell-ish rendering for logs and `--dry-run`.
    pub fn display_line(&self) -> String {
        let mut parts = Vec::with_capacity(self.args.len() + 1);
        parts.push(quote_if_needed(&self.program));
        parts.extend(self.args.iter().map(|a| quote_if_needed(a)));
        parts.join(" ")
    }
}

fn quote_if_needed(s: &str) -> String {
    if !s.is_empty() && !s.contains(|c: char| c.is_whitespace() || c == '"') {
        s.to_string()
    } else {
        format!("{s:?}")
    }
}

/// Starts external processes.
pub trait ProcessSpawner: Send + Sync {
    /// Start the process. A failure here is always `Gw1hError::Spawn`.
    fn spawn(&self, spec: &CommandSpec) -> Result<Box<dyn ProcessHandle>>;
}

/// Owned handle to a started external process.
pub trait ProcessHandle: Send {
    fn id(&self) -> Option<u32>;

    /// Captured stdout; `None` in [`OutputMode::Forward`] or once taken.
    fn take_stdout(&mut self) -> Option<ProcessStdout>;

    /// Wait for termination. Must be cancel-safe: dropping the future and
    /// calling `wait` again resumes waiting for the same process.
    fn wait(&mut self) -> BoxFuture<'_, io::Result<ProcessOutcome>>;

    /// Ask the process to stop. `wait` still has to be called to reap it.
    fn terminate(&mut self) -> BoxFuture<'_, io::Result<()>>;
}

/// Ask a process to stop and reap it.
///
/// Returns the termination outcome when it could be collected. Failures are
/// logged; there is nothing more a caller can do about them.
pub async fn terminate_and_reap(child: &mut dyn ProcessHandle) -> Option<ProcessOutcome> {
    if let Err(e) = child.terminate().await {
        warn!(pid = ?child.id(), error = %e, "failed to terminate process");
    }
    match child.wait().await {
        Ok(outcome) => Some(outcome),
        Err(e) => {
            warn!(pid = ?child.id(), error = %e, "failed to reap process");
            None
        }
    }
}
