// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`process`] defines the `ProcessSpawner` / `ProcessHandle` traits the
//!   launchers are written against, plus the `CommandSpec` they pass in.
//! - [`spawner`] provides `TokioSpawner`, the production implementation on
//!   top of `tokio::process::Command`.
//! - [`output`] holds the background readers that forward or drain child
//!   stdout/stderr.

pub mod output;
pub mod process;
pub mod spawner;

pub use process::{
    BoxFuture, CommandSpec, OutputMode, ProcessHandle, ProcessSpawner, ProcessStdout,
    terminate_and_reap,
};
pub use spawner::TokioSpawner;
