// src/exec/spawner.rs

//! Production spawner backed by `tokio::process::Command`.

use std::io;
use std::process::Stdio;

use tokio::process::{Child, Command};
use tracing::{debug, warn};

use crate::errors::{Gw1hError, Result};
use crate::types::ProcessOutcome;

use super::output::{drain_to_debug, forward_lines, Stream};
use super::process::{
    BoxFuture, CommandSpec, OutputMode, ProcessHandle, ProcessSpawner, ProcessStdout,
};

/// Spawns real OS processes.
///
/// The child sees only the isolation environment (the inherited environment
/// is already folded into it), gets a null stdin and is killed if its handle
/// is dropped without being reaped.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSpawner;

impl TokioSpawner {
    pub fn new() -> Self {
        Self
    }
}

impl ProcessSpawner for TokioSpawner {
    fn spawn(&self, spec: &CommandSpec) -> Result<Box<dyn ProcessHandle>> {
        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args)
            .env_clear()
            .envs(spec.env.vars().iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|source| Gw1hError::Spawn {
            role: spec.role,
            program: spec.program.clone(),
            source,
        })?;

        debug!(
            role = %spec.role,
            pid = ?child.id(),
            cmd = %spec.display_line(),
            "spawned process"
        );

        if let Some(stderr) = child.stderr.take() {
            match spec.output {
                OutputMode::Capture => drain_to_debug(spec.role, stderr),
                OutputMode::Forward => forward_lines(spec.role, stderr, Stream::Stderr),
            }
        }

        if spec.output == OutputMode::Forward {
            if let Some(stdout) = child.stdout.take() {
                forward_lines(spec.role, stdout, Stream::Stdout);
            }
        }

        Ok(Box::new(TokioProcess { child }))
    }
}

struct TokioProcess {
    child: Child,
}

impl ProcessHandle for TokioProcess {
    fn id(&self) -> Option<u32> {
        self.child.id()
    }

    fn take_stdout(&mut self) -> Option<ProcessStdout> {
        self.child
            .stdout
            .take()
            .map(|stdout| Box::new(stdout) as ProcessStdout)
    }

    fn wait(&mut self) -> BoxFuture<'_, io::Result<ProcessOutcome>> {
        Box::pin(async move {
            let status = self.child.wait().await?;
            Ok(ProcessOutcome::from(status))
        })
    }

    fn terminate(&mut self) -> BoxFuture<'_, io::Result<()>> {
        Box::pin(async move {
            if let Err(e) = self.child.start_kill() {
                // Already reaped; nothing left to stop.
                warn!(pid = ?self.child.id(), error = %e, "failed to kill child process");
            }
            Ok(())
        })
    }
}
