// src/engine/mod.rs

//! Coordination engine for gw1h.
//!
//! This module ties together:
//! - the primary launcher (start, warm up, discover pid, publish, wait)
//! - the dependent launcher (obtain pid, start, wait)
//! - the single-slot pid hand-off between them
//! - the orchestrator that fans the selected launchers out and joins them
//!
//! All of them share one [`Cancellation`](crate::cancel::Cancellation).

use std::time::Duration;

/// Delay between starting the primary and looking for its pid.
pub const PRIMARY_WARMUP: Duration = Duration::from_secs(3);

/// How long the dependent waits for the primary's pid.
pub const HANDOFF_TIMEOUT: Duration = Duration::from_secs(10);

pub mod dependent;
pub mod handoff;
pub mod orchestrator;
pub mod primary;

pub use dependent::{DependentLauncher, PidSource};
pub use handoff::{Handoff, PidPublisher, PidSubscriber, pid_slot};
pub use orchestrator::{Orchestrator, RoleOutcome, RunReport};
pub use primary::PrimaryLauncher;
