// src/cancel.rs

//! Run-wide cancellation signal and Ctrl-C handling.
//!
//! Every launcher gets a clone of the same [`Cancellation`] and races its
//! suspension points against [`Cancellation::cancelled`]. The signal never
//! resets and never kills anything itself; each launcher stops the processes
//! it owns when it observes the trigger.

use std::fmt;
use std::sync::{Arc, OnceLock};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::types::Role;

/// Exit status used when a second interrupt forces the process down.
pub const FORCED_EXIT_CODE: i32 = 130;

/// What fired the signal first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    Interrupted,
    Failure(Role),
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CancelReason::Interrupted => f.write_str("interrupted"),
            CancelReason::Failure(role) => write!(f, "{role} failed"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Cancellation {
    token: CancellationToken,
    reason: Arc<OnceLock<CancelReason>>,
}

impl Cancellation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire the signal. Only the first call has any effect; returns whether
    /// this call was the one that fired it.
    pub fn trigger(&self, reason: CancelReason) -> bool {
        if self.reason.set(reason).is_err() {
            return false;
        }
        warn!(%reason, "cancelling run");
        self.token.cancel();
        true
    }

    pub fn is_triggered(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn reason(&self) -> Option<CancelReason> {
        self.reason.get().copied()
    }

    /// Resolves once the signal has fired (immediately if it already has).
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }
}

/// Install the production Ctrl-C handler.
pub fn spawn_interrupt_handler(cancel: Cancellation) -> JoinHandle<()> {
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(relay_interrupts(tx));
    tokio::spawn(handle_interrupts(cancel, rx, || {
        std::process::exit(FORCED_EXIT_CODE);
    }))
}

/// Forward every SIGINT into `tx`.
///
/// The listener is registered once for the whole run, so an interrupt that
/// arrives while the previous one is still being handled is queued, not lost.
#[cfg(unix)]
async fn relay_interrupts(tx: mpsc::UnboundedSender<()>) {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigint = match signal(SignalKind::interrupt()) {
        Ok(sigint) => sigint,
        Err(e) => {
            warn!(error = %e, "failed to listen for interrupts");
            return;
        }
    };
    while sigint.recv().await.is_some() {
        if tx.send(()).is_err() {
            return;
        }
    }
}

#[cfg(not(unix))]
async fn relay_interrupts(tx: mpsc::UnboundedSender<()>) {
    loop {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for interrupts");
            return;
        }
        if tx.send(()).is_err() {
            return;
        }
    }
}

/// Two-state interrupt handler.
///
/// The first interrupt is turned into a cooperative cancellation. After
/// that the handler no longer unwinds gracefully: the next interrupt calls
/// `force_exit`. A closed channel means interrupts can no longer arrive.
pub async fn handle_interrupts<X>(
    cancel: Cancellation,
    mut interrupts: mpsc::UnboundedReceiver<()>,
    force_exit: X,
) where
    X: FnOnce(),
{
    if interrupts.recv().await.is_none() {
        return;
    }
    info!("interrupt received; shutting down (interrupt again to force exit)");
    cancel.trigger(CancelReason::Interrupted);

    if interrupts.recv().await.is_some() {
        warn!("second interrupt received; forcing exit");
        force_exit();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    use tokio::time::timeout;

    use super::*;

    #[test]
    fn trigger_is_first_wins_and_never_resets() {
        let cancel = Cancellation::new();
        assert!(!cancel.is_triggered());
        assert_eq!(cancel.reason(), None);

        assert!(cancel.trigger(CancelReason::Failure(Role::Discovery)));
        assert!(!cancel.trigger(CancelReason::Interrupted));

        assert!(cancel.is_triggered());
        assert_eq!(cancel.reason(), Some(CancelReason::Failure(Role::Discovery)));
    }

    #[tokio::test]
    async fn clones_observe_the_same_signal() {
        let cancel = Cancellation::new();
        let observer = cancel.clone();
        let waiter = tokio::spawn(async move { observer.cancelled().await });

        cancel.trigger(CancelReason::Interrupted);
        timeout(Duration::from_secs(1), waiter).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn first_interrupt_cancels_second_forces_exit() {
        let cancel = Cancellation::new();
        let (tx, rx) = mpsc::unbounded_channel();
        let forced = Arc::new(AtomicBool::new(false));

        let handler = {
            let forced = Arc::clone(&forced);
            tokio::spawn(handle_interrupts(cancel.clone(), rx, move || {
                forced.store(true, Ordering::SeqCst)
            }))
        };

        tx.send(()).unwrap();
        timeout(Duration::from_secs(1), cancel.cancelled()).await.unwrap();
        assert_eq!(cancel.reason(), Some(CancelReason::Interrupted));
        assert!(!forced.load(Ordering::SeqCst));

        tx.send(()).unwrap();
        timeout(Duration::from_secs(1), handler).await.unwrap().unwrap();
        assert!(forced.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn back_to_back_interrupts_both_count() {
        let cancel = Cancellation::new();
        let (tx, rx) = mpsc::unbounded_channel();
        let forced = Arc::new(AtomicBool::new(false));

        // Both arrive before the handler has looked at the first one.
        tx.send(()).unwrap();
        tx.send(()).unwrap();

        let flag = Arc::clone(&forced);
        timeout(
            Duration::from_secs(1),
            handle_interrupts(cancel.clone(), rx, move || flag.store(true, Ordering::SeqCst)),
        )
        .await
        .unwrap();

        assert!(cancel.is_triggered());
        assert!(forced.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn closed_listener_leaves_signal_untouched() {
        let cancel = Cancellation::new();
        let (tx, rx) = mpsc::unbounded_channel::<()>();
        drop(tx);

        handle_interrupts(cancel.clone(), rx, || {
            panic!("must not force exit");
        })
        .await;
        assert!(!cancel.is_triggered());
    }
}
