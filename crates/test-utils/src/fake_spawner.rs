use std::collections::HashMap;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::{sleep_until, Instant};

use gw1h::errors::{Gw1hError, Result};
use gw1h::exec::{BoxFuture, CommandSpec, ProcessHandle, ProcessSpawner, ProcessStdout};
use gw1h::types::{ProcessOutcome, Role};

/// Outcome reported for a process stopped through `terminate`.
pub const KILLED: ProcessOutcome = ProcessOutcome::Signaled(9);

/// When a fake process exits on its own.
#[derive(Debug, Clone, Copy)]
pub enum FakeExit {
    Immediately(ProcessOutcome),
    After(Duration, ProcessOutcome),
    /// Runs until terminated.
    Never,
}

/// Script for one fake process.
#[derive(Debug, Clone)]
pub struct FakeProcess {
    pub stdout: String,
    pub exit: FakeExit,
}

impl FakeProcess {
    /// Prints `stdout` and exits 0 right away.
    pub fn prints(stdout: &str) -> Self {
        Self {
            stdout: stdout.to_string(),
            exit: FakeExit::Immediately(ProcessOutcome::Success),
        }
    }

    /// Prints `stdout` and exits with `outcome` right away.
    pub fn prints_and_exits(stdout: &str, outcome: ProcessOutcome) -> Self {
        Self {
            stdout: stdout.to_string(),
            exit: FakeExit::Immediately(outcome),
        }
    }

    /// Silent process that exits with `outcome` after `after`.
    pub fn runs_for(after: Duration, outcome: ProcessOutcome) -> Self {
        Self {
            stdout: String::new(),
            exit: FakeExit::After(after, outcome),
        }
    }

    /// Silent process that only ends when terminated.
    pub fn runs_forever() -> Self {
        Self {
            stdout: String::new(),
            exit: FakeExit::Never,
        }
    }

    pub fn exits_after(mut self, after: Duration) -> Self {
        let outcome = match self.exit {
            FakeExit::Immediately(o) | FakeExit::After(_, o) => o,
            FakeExit::Never => ProcessOutcome::Success,
        };
        self.exit = FakeExit::After(after, outcome);
        self
    }
}

#[derive(Debug, Clone)]
enum Script {
    Run(FakeProcess),
    FailToSpawn,
}

/// One spawn request as seen by the fake.
#[derive(Debug, Clone)]
pub struct SpawnRecord {
    pub role: Role,
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
    pub at: Instant,
}

#[derive(Debug, Default)]
struct Journal {
    spawned: Vec<SpawnRecord>,
    terminated: Vec<Role>,
}

/// A spawner that:
/// - plays back a per-role script instead of starting processes
/// - records every spawn request and every termination
#[derive(Debug, Clone, Default)]
pub struct FakeSpawner {
    scripts: HashMap<Role, Script>,
    journal: Arc<Mutex<Journal>>,
    next_pid: Arc<Mutex<u32>>,
}

impl FakeSpawner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, role: Role, process: FakeProcess) -> Self {
        self.scripts.insert(role, Script::Run(process));
        self
    }

    pub fn failing(mut self, role: Role) -> Self {
        self.scripts.insert(role, Script::FailToSpawn);
        self
    }

    pub fn spawned(&self) -> Vec<SpawnRecord> {
        self.journal.lock().unwrap().spawned.clone()
    }

    pub fn spawned_roles(&self) -> Vec<Role> {
        self.spawned().into_iter().map(|r| r.role).collect()
    }

    pub fn spawns_of(&self, role: Role) -> Vec<SpawnRecord> {
        self.spawned().into_iter().filter(|r| r.role == role).collect()
    }

    pub fn was_spawned(&self, role: Role) -> bool {
        !self.spawns_of(role).is_empty()
    }

    pub fn terminated(&self) -> Vec<Role> {
        self.journal.lock().unwrap().terminated.clone()
    }

    pub fn was_terminated(&self, role: Role) -> bool {
        self.terminated().contains(&role)
    }

    fn allocate_pid(&self) -> u32 {
        let mut next = self.next_pid.lock().unwrap();
        *next += 1;
        1000 + *next
    }
}

impl ProcessSpawner for FakeSpawner {
    fn spawn(&self, spec: &CommandSpec) -> Result<Box<dyn ProcessHandle>> {
        self.journal.lock().unwrap().spawned.push(SpawnRecord {
            role: spec.role,
            program: spec.program.clone(),
            args: spec.args.clone(),
            env: spec.env.vars().to_vec(),
            at: Instant::now(),
        });

        let process = match self.scripts.get(&spec.role) {
            Some(Script::Run(process)) => process.clone(),
            Some(Script::FailToSpawn) | None => {
                return Err(Gw1hError::Spawn {
                    role: spec.role,
                    program: spec.program.clone(),
                    source: io::Error::from(io::ErrorKind::NotFound),
                });
            }
        };

        let deadline = match process.exit {
            FakeExit::After(after, _) => Some(Instant::now() + after),
            _ => None,
        };

        Ok(Box::new(FakeHandle {
            role: spec.role,
            pid: self.allocate_pid(),
            stdout: Some(process.stdout.into_bytes()),
            exit: process.exit,
            deadline,
            kill: Arc::new(Notify::new()),
            reaped: None,
            journal: Arc::clone(&self.journal),
        }))
    }
}

struct FakeHandle {
    role: Role,
    pid: u32,
    stdout: Option<Vec<u8>>,
    exit: FakeExit,
    deadline: Option<Instant>,
    kill: Arc<Notify>,
    reaped: Option<ProcessOutcome>,
    journal: Arc<Mutex<Journal>>,
}

impl ProcessHandle for FakeHandle {
    fn id(&self) -> Option<u32> {
        self.reaped.is_none().then_some(self.pid)
    }

    fn take_stdout(&mut self) -> Option<ProcessStdout> {
        self.stdout
            .take()
            .map(|bytes| Box::new(io::Cursor::new(bytes)) as ProcessStdout)
    }

    fn wait(&mut self) -> BoxFuture<'_, io::Result<ProcessOutcome>> {
        Box::pin(async move {
            if let Some(outcome) = self.reaped {
                return Ok(outcome);
            }

            let outcome = match (self.exit, self.deadline) {
                (FakeExit::Immediately(outcome), _) => outcome,
                (FakeExit::After(_, outcome), Some(deadline)) => {
                    tokio::select! {
                        _ = sleep_until(deadline) => outcome,
                        _ = self.kill.notified() => KILLED,
                    }
                }
                _ => {
                    self.kill.notified().await;
                    KILLED
                }
            };

            self.reaped = Some(outcome);
            Ok(outcome)
        })
    }

    fn terminate(&mut self) -> BoxFuture<'_, io::Result<()>> {
        Box::pin(async move {
            self.journal.lock().unwrap().terminated.push(self.role);
            self.kill.notify_one();
            Ok(())
        })
    }
}
