// src/engine/handoff.rs

//! Single-slot transfer of the discovered pid from the primary launcher to
//! the dependent launcher.
//!
//! Built on a `oneshot` channel: publishing consumes the publisher, so the
//! slot cannot be written twice.

use std::time::Duration;

use tokio::sync::oneshot;

use crate::cancel::Cancellation;
use crate::types::Pid;

/// Create a fresh, empty slot.
pub fn pid_slot() -> (PidPublisher, PidSubscriber) {
    let (tx, rx) = oneshot::channel();
    (PidPublisher { tx }, PidSubscriber { rx })
}

/// Write side, owned by the primary launcher.
#[derive(Debug)]
pub struct PidPublisher {
    tx: oneshot::Sender<Pid>,
}

impl PidPublisher {
    /// Write the pid. Returns it back if nobody is listening any more.
    pub fn publish(self, pid: Pid) -> Result<(), Pid> {
        self.tx.send(pid)
    }

    pub fn has_subscriber(&self) -> bool {
        !self.tx.is_closed()
    }
}

/// Read side, owned by the dependent launcher.
#[derive(Debug)]
pub struct PidSubscriber {
    rx: oneshot::Receiver<Pid>,
}

/// Which of the three raced events came first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handoff {
    Received(Pid),
    Cancelled,
    TimedOut,
    /// The publisher went away without writing.
    Closed,
}

impl PidSubscriber {
    /// Wait for the pid, the cancellation signal or the timeout, whichever
    /// comes first. A signal that already fired wins over a pid that is
    /// already sitting in the slot.
    pub async fn wait(self, cancel: &Cancellation, timeout: Duration) -> Handoff {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => Handoff::Cancelled,
            received = self.rx => match received {
                Ok(pid) => Handoff::Received(pid),
                Err(_) => Handoff::Closed,
            },
            _ = tokio::time::sleep(timeout) => Handoff::TimedOut,
        }
    }
}
