// src/engine/orchestrator.rs

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::cancel::Cancellation;
use crate::config::Settings;
use crate::config::env::{ENV_START_DEPENDENT, ENV_START_PRIMARY};
use crate::errors::{Gw1hError, Result};
use crate::exec::ProcessSpawner;
use crate::types::{Role, RoleSelection};

use super::dependent::{DependentLauncher, PidSource};
use super::handoff::pid_slot;
use super::primary::PrimaryLauncher;

/// Final result of one launcher task.
#[derive(Debug)]
pub struct RoleOutcome {
    pub role: Role,
    pub result: Result<()>,
}

/// Everything the joined tasks reported.
#[derive(Debug, Default)]
pub struct RunReport {
    /// Set when the run was refused before any task started.
    pub rejected: Option<Gw1hError>,
    pub outcomes: Vec<RoleOutcome>,
}

impl RunReport {
    pub fn outcome(&self, role: Role) -> Option<&Result<()>> {
        self.outcomes
            .iter()
            .find(|o| o.role == role)
            .map(|o| &o.result)
    }

    /// The refusal, if any, else the first fatal error in role order.
    pub fn first_fatal(&self) -> Option<&Gw1hError> {
        self.rejected.as_ref().or_else(|| {
            self.outcomes
                .iter()
                .filter_map(|o| o.result.as_ref().err())
                .find(|e| e.is_fatal())
        })
    }

    pub fn success(&self) -> bool {
        self.first_fatal().is_none()
    }

    pub fn exit_code(&self) -> i32 {
        self.first_fatal().map_or(0, Gw1hError::exit_code)
    }
}

/// Fans the selected launchers out as concurrent tasks and joins them.
pub struct Orchestrator {
    settings: Arc<Settings>,
    spawner: Arc<dyn ProcessSpawner>,
    cancel: Cancellation,
}

impl Orchestrator {
    pub fn new(
        settings: Arc<Settings>,
        spawner: Arc<dyn ProcessSpawner>,
        cancel: Cancellation,
    ) -> Self {
        Self {
            settings,
            spawner,
            cancel,
        }
    }

    pub fn cancellation(&self) -> &Cancellation {
        &self.cancel
    }

    /// Run until every started task has returned.
    pub async fn run(&self, roles: RoleSelection) -> RunReport {
        if !roles.any() {
            let err = Gw1hError::Configuration(format!(
                "nothing to start; set {ENV_START_PRIMARY} and/or {ENV_START_DEPENDENT}"
            ));
            error!(error = %err, "refusing to run");
            return RunReport {
                rejected: Some(err),
                outcomes: Vec::new(),
            };
        }

        info!(primary = roles.primary, dependent = roles.dependent, "starting roles");

        let (publisher, subscriber) = pid_slot();
        let mut subscriber = Some(subscriber);
        let mut tasks: Vec<(Role, JoinHandle<Result<()>>)> = Vec::with_capacity(2);

        if roles.primary {
            let launcher = PrimaryLauncher::new(
                Arc::clone(&self.settings),
                Arc::clone(&self.spawner),
                self.cancel.clone(),
                publisher,
            );
            tasks.push((Role::Primary, tokio::spawn(launcher.run())));
        }

        if roles.dependent {
            let source = match subscriber.take() {
                Some(subscriber) if roles.primary => PidSource::Handoff(subscriber),
                _ => PidSource::Preset(self.settings.preset_pid.clone()),
            };
            let launcher = DependentLauncher::new(
                Arc::clone(&self.settings),
                Arc::clone(&self.spawner),
                self.cancel.clone(),
                source,
            );
            tasks.push((Role::Dependent, tokio::spawn(launcher.run())));
        }

        // Without a dependent nobody reads the slot.
        drop(subscriber);

        let mut report = RunReport::default();
        for (role, handle) in tasks {
            let result = match handle.await {
                Ok(result) => result,
                Err(join_err) => Err(Gw1hError::TaskAborted {
                    role,
                    message: join_err.to_string(),
                }),
            };
            log_outcome(role, &result);
            report.outcomes.push(RoleOutcome { role, result });
        }
        report
    }
}

fn log_outcome(role: Role, result: &Result<()>) {
    match result {
        Ok(()) => info!(role = %role, "role finished"),
        Err(Gw1hError::Cancelled(_)) => info!(role = %role, "role cancelled"),
        Err(err) => error!(role = %role, error = %err, "role failed"),
    }
}
