// src/engine/primary.rs

use std::sync::Arc;

use tokio::time::sleep;
use tracing::{debug, error, info};

use crate::cancel::{CancelReason, Cancellation};
use crate::config::Settings;
use crate::discovery::discover_pid;
use crate::errors::{Gw1hError, Result};
use crate::exec::{ProcessHandle, ProcessSpawner, terminate_and_reap};
use crate::types::{ProcessOutcome, Role};

use super::PRIMARY_WARMUP;
use super::handoff::PidPublisher;

/// Starts the primary, discovers its pid and publishes it, then waits for the
/// primary to exit.
pub struct PrimaryLauncher {
    settings: Arc<Settings>,
    spawner: Arc<dyn ProcessSpawner>,
    cancel: Cancellation,
    publisher: PidPublisher,
}

impl PrimaryLauncher {
    pub fn new(
        settings: Arc<Settings>,
        spawner: Arc<dyn ProcessSpawner>,
        cancel: Cancellation,
        publisher: PidPublisher,
    ) -> Self {
        Self {
            settings,
            spawner,
            cancel,
            publisher,
        }
    }

    /// The launcher's result is the primary's own termination, unless
    /// discovery failed, in which case that failure is returned instead.
    pub async fn run(self) -> Result<()> {
        let Self {
            settings,
            spawner,
            cancel,
            publisher,
        } = self;

        let spec = settings.primary_command();
        info!(role = %Role::Primary, cmd = %spec.display_line(), "starting primary process");

        let mut child = match spawner.spawn(&spec) {
            Ok(child) => child,
            Err(err) => return Err(fail(&cancel, err)),
        };
        info!(role = %Role::Primary, pid = ?child.id(), "primary process started");

        // Give the primary time to become visible to the diagnostic tool.
        tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                return Err(unwind(child.as_mut(), None).await);
            }
            status = child.wait() => {
                let outcome = status?;
                return Err(exited_during_init(&cancel, outcome));
            }
            _ = sleep(PRIMARY_WARMUP) => {
                debug!(warmup = ?PRIMARY_WARMUP, "primary warm-up elapsed");
            }
        }

        let discovery_spec = settings.discovery_command();
        let discovery = discover_pid(
            spawner.as_ref(),
            &discovery_spec,
            settings.discovery_radix,
            &cancel,
        );
        tokio::pin!(discovery);

        let mut publisher = Some(publisher);
        let mut discovering = true;
        let mut discovery_error: Option<Gw1hError> = None;

        loop {
            tokio::select! {
                result = &mut discovery, if discovering => {
                    discovering = false;
                    match result {
                        Ok(pid) => {
                            info!(role = %Role::Primary, pid = pid.get(), "primary pid discovered");
                            if let Some(publisher) = publisher.take() {
                                if publisher.publish(pid).is_err() {
                                    debug!(pid = pid.get(), "no dependent waiting for the pid");
                                }
                            }
                        }
                        Err(Gw1hError::Cancelled(_)) => {}
                        Err(err) => {
                            error!(role = %Role::Discovery, error = %err, "pid discovery failed");
                            cancel.trigger(CancelReason::Failure(Role::Discovery));
                            discovery_error = Some(err);
                        }
                    }
                }

                status = child.wait() => {
                    let outcome = status?;
                    if discovering {
                        return Err(exited_during_init(&cancel, outcome));
                    }
                    info!(role = %Role::Primary, %outcome, "primary process exited");
                    if let Some(err) = discovery_error {
                        return Err(err);
                    }
                    return outcome_to_result(outcome);
                }

                _ = cancel.cancelled() => {
                    return Err(unwind(child.as_mut(), discovery_error).await);
                }
            }
        }
    }
}

/// Report a failure and fire the signal if it dooms the run.
fn fail(cancel: &Cancellation, err: Gw1hError) -> Gw1hError {
    if err.cancels_run() {
        cancel.trigger(CancelReason::Failure(Role::Primary));
    }
    err
}

/// The primary went away before its pid was published, which leaves the
/// dependent with nothing to attach to.
fn exited_during_init(cancel: &Cancellation, outcome: ProcessOutcome) -> Gw1hError {
    if outcome.success() {
        error!(role = %Role::Primary, "primary process exited cleanly before its pid was discovered");
    } else {
        error!(role = %Role::Primary, %outcome, "primary process exited during initialisation");
    }
    cancel.trigger(CancelReason::Failure(Role::Primary));
    Gw1hError::ProcessExit {
        role: Role::Primary,
        outcome,
    }
}

async fn unwind(child: &mut dyn ProcessHandle, cause: Option<Gw1hError>) -> Gw1hError {
    info!(role = %Role::Primary, pid = ?child.id(), "cancellation observed; stopping primary process");
    if let Some(outcome) = terminate_and_reap(child).await {
        debug!(role = %Role::Primary, %outcome, "primary process reaped");
    }
    cause.unwrap_or(Gw1hError::Cancelled(Role::Primary))
}

fn outcome_to_result(outcome: ProcessOutcome) -> Result<()> {
    if outcome.success() {
        Ok(())
    } else {
        Err(Gw1hError::ProcessExit {
            role: Role::Primary,
            outcome,
        })
    }
}
