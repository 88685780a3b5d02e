// src/discovery/mod.rs

//! Runtime pid discovery for the primary process.
//!
//! A diagnostic pipeline lists host processes and prints one candidate pid
//! per line. Discovery succeeds only if the whole output parsed, exactly one
//! candidate was found and the pipeline itself exited cleanly.

pub mod stream;

use tokio::io::BufReader;
use tracing::{debug, info};

use crate::cancel::Cancellation;
use crate::errors::{Gw1hError, Result};
use crate::exec::{CommandSpec, ProcessSpawner, terminate_and_reap};
use crate::types::{Pid, PidRadix, ProcessOutcome, Role};

pub use stream::{PidStream, select_single};

/// Run the diagnostic described by `spec` and return the single pid it
/// reports.
///
/// The output scan and the wait for the diagnostic's exit run concurrently;
/// both are raced against `cancel`. This function does not fire the
/// cancellation signal itself; the caller decides what a failure means for
/// the run.
pub async fn discover_pid(
    spawner: &dyn ProcessSpawner,
    spec: &CommandSpec,
    radix: PidRadix,
    cancel: &Cancellation,
) -> Result<Pid> {
    if cancel.is_triggered() {
        return Err(Gw1hError::Cancelled(Role::Discovery));
    }

    let mut child = spawner.spawn(spec)?;
    info!(role = %spec.role, pid = ?child.id(), "pid discovery started");

    let Some(stdout) = child.take_stdout() else {
        terminate_and_reap(child.as_mut()).await;
        return Err(Gw1hError::IoError(std::io::Error::other(
            "discovery stdout was not captured",
        )));
    };

    let scan = PidStream::new(BufReader::new(stdout), radix).collect();
    tokio::pin!(scan);

    let mut scanned: Option<Vec<Pid>> = None;
    let mut exited: Option<ProcessOutcome> = None;

    let (candidates, outcome) = loop {
        match (scanned.take(), exited) {
            (Some(candidates), Some(outcome)) => break (candidates, outcome),
            (pending, _) => scanned = pending,
        }

        tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                debug!("cancellation observed during pid discovery");
                if exited.is_none() {
                    terminate_and_reap(child.as_mut()).await;
                }
                return Err(Gw1hError::Cancelled(Role::Discovery));
            }

            result = &mut scan, if scanned.is_none() => {
                match result {
                    Ok(pids) => scanned = Some(pids),
                    Err(err) => {
                        if exited.is_none() {
                            terminate_and_reap(child.as_mut()).await;
                        }
                        return Err(err);
                    }
                }
            }

            status = child.wait(), if exited.is_none() => {
                let outcome = status?;
                debug!(%outcome, "discovery process exited");
                exited = Some(outcome);
            }
        }
    };

    if !outcome.success() {
        return Err(Gw1hError::ProcessExit {
            role: Role::Discovery,
            outcome,
        });
    }

    for pid in &candidates {
        debug!(pid = pid.get(), "detected candidate pid");
    }

    select_single(candidates).map_err(Gw1hError::DiscoveryCardinality)
}
