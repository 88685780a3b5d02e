// src/engine/dependent.rs

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::cancel::{CancelReason, Cancellation};
use crate::config::Settings;
use crate::config::env::ENV_PRIMARY_PID;
use crate::errors::{Gw1hError, Result};
use crate::exec::{ProcessSpawner, terminate_and_reap};
use crate::types::{Pid, Role};

use super::HANDOFF_TIMEOUT;
use super::handoff::{Handoff, PidSubscriber};

/// Where the dependent gets the primary's pid from.
#[derive(Debug)]
pub enum PidSource {
    /// The primary is not part of this run; use the pre-supplied value.
    Preset(Option<String>),
    /// Wait for the primary launcher to publish it.
    Handoff(PidSubscriber),
}

/// Starts the dependent against the primary's pid and waits for it to exit.
pub struct DependentLauncher {
    settings: Arc<Settings>,
    spawner: Arc<dyn ProcessSpawner>,
    cancel: Cancellation,
    source: PidSource,
}

impl DependentLauncher {
    pub fn new(
        settings: Arc<Settings>,
        spawner: Arc<dyn ProcessSpawner>,
        cancel: Cancellation,
        source: PidSource,
    ) -> Self {
        Self {
            settings,
            spawner,
            cancel,
            source,
        }
    }

    pub async fn run(self) -> Result<()> {
        let Self {
            settings,
            spawner,
            cancel,
            source,
        } = self;

        let pid = obtain_pid(source, &cancel).await?;

        // A pid may be in hand while the run is already unwinding.
        if cancel.is_triggered() {
            return Err(Gw1hError::Cancelled(Role::Dependent));
        }

        let spec = settings.dependent_command(pid);
        info!(
            role = %Role::Dependent,
            primary_pid = pid.get(),
            cmd = %spec.display_line(),
            "starting dependent process"
        );

        let mut child = match spawner.spawn(&spec) {
            Ok(child) => child,
            Err(err) => {
                cancel.trigger(CancelReason::Failure(Role::Dependent));
                return Err(err);
            }
        };
        info!(role = %Role::Dependent, pid = ?child.id(), "dependent process started");

        tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                info!(role = %Role::Dependent, pid = ?child.id(), "cancellation observed; stopping dependent process");
                terminate_and_reap(child.as_mut()).await;
                Err(Gw1hError::Cancelled(Role::Dependent))
            }

            status = child.wait() => {
                let outcome = status?;
                info!(role = %Role::Dependent, %outcome, "dependent process exited");
                if outcome.success() {
                    Ok(())
                } else {
                    Err(Gw1hError::ProcessExit {
                        role: Role::Dependent,
                        outcome,
                    })
                }
            }
        }
    }
}

async fn obtain_pid(source: PidSource, cancel: &Cancellation) -> Result<Pid> {
    match source {
        PidSource::Preset(None) => Err(Gw1hError::Configuration(format!(
            "the primary is not being started and {ENV_PRIMARY_PID} is not set"
        ))),
        PidSource::Preset(Some(raw)) => {
            let pid = raw.parse::<Pid>().map_err(|reason| {
                Gw1hError::Configuration(format!("invalid {ENV_PRIMARY_PID} {raw:?}: {reason}"))
            })?;
            debug!(pid = pid.get(), "using pre-supplied primary pid");
            Ok(pid)
        }
        PidSource::Handoff(subscriber) => {
            debug!(timeout = ?HANDOFF_TIMEOUT, "waiting for primary pid");
            match subscriber.wait(cancel, HANDOFF_TIMEOUT).await {
                Handoff::Received(pid) => {
                    debug!(pid = pid.get(), "received primary pid");
                    Ok(pid)
                }
                Handoff::Cancelled => Err(Gw1hError::Cancelled(Role::Dependent)),
                Handoff::Closed => {
                    warn!("primary launcher finished without publishing a pid");
                    Err(Gw1hError::Cancelled(Role::Dependent))
                }
                Handoff::TimedOut => Err(Gw1hError::HandoffTimeout(HANDOFF_TIMEOUT)),
            }
        }
    }
}
