//! # Failure Signal
//!
//! Set-once failure slot with an exactly-once broadcast. The first worker to fail wins
//! the compare-and-swap, records its message and wakes every waiter; later failures are
//! dropped without firing again.
//!
//! Task bodies never see the signal itself. They get a read-only [`Cancellation`] view
//! they may poll or await to stop early on their own.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

#[derive(Debug, Default)]
struct SignalState {
    fired: AtomicBool,
    message: Mutex<Option<String>>,
    notify: Notify,
}

/// First-failure-wins slot shared by all workers of one call
#[derive(Debug, Clone, Default)]
pub struct FailureSignal {
    inner: Arc<SignalState>,
}

impl FailureSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `message` and fire the trigger if nothing was recorded yet
    ///
    /// Returns `true` only for the call that won.
    pub fn fail(&self, message: impl Into<String>) -> bool {
        if self
            .inner
            .fired
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }

        *self.inner.message.lock() = Some(message.into());
        self.inner.notify.notify_waiters();
        true
    }

    /// Whether a failure message is available
    pub fn is_set(&self) -> bool {
        self.inner.message.lock().is_some()
    }

    pub fn message(&self) -> Option<String> {
        self.inner.message.lock().clone()
    }

    /// Resolves once a failure has been recorded
    pub async fn wait(&self) {
        loop {
            // Register before checking so a concurrent `fail` cannot slip in between
            let notified = self.inner.notify.notified();
            if self.is_set() {
                return;
            }
            notified.await;
        }
    }

    pub fn cancellation(&self) -> Cancellation {
        Cancellation {
            signal: self.clone(),
        }
    }
}

/// Read-only view of a [`FailureSignal`] handed to task bodies
///
/// Observing it is voluntary; nothing interrupts a task that ignores it.
#[derive(Debug, Clone)]
pub struct Cancellation {
    signal: FailureSignal,
}

impl Cancellation {
    /// A view that is never cancelled, for contexts not yet attached to a call
    pub fn detached() -> Self {
        FailureSignal::new().cancellation()
    }

    pub fn is_cancelled(&self) -> bool {
        self.signal.is_set()
    }

    /// The failure that cancelled the call, if any
    pub fn reason(&self) -> Option<String> {
        self.signal.message()
    }

    /// Resolves once a sibling task has failed
    pub async fn cancelled(&self) {
        self.signal.wait().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn first_writer_wins() {
        let signal = FailureSignal::new();
        assert!(!signal.is_set());

        assert!(signal.fail("first"));
        assert!(!signal.fail("second"));
        assert_eq!(signal.message().as_deref(), Some("first"));
    }

    #[test]
    fn exactly_one_winner_under_contention() {
        let signal = FailureSignal::new();
        let handles: Vec<_> = (0..32)
            .map(|i| {
                let signal = signal.clone();
                std::thread::spawn(move || signal.fail(format!("worker {i}")))
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
        assert!(signal.message().unwrap().starts_with("worker "));
    }

    #[tokio::test]
    async fn wait_returns_immediately_when_already_failed() {
        let signal = FailureSignal::new();
        signal.fail("boom");
        tokio::time::timeout(Duration::from_millis(100), signal.wait())
            .await
            .expect("wait should not block once failed");
    }

    #[tokio::test]
    async fn waiters_wake_on_failure() {
        let signal = FailureSignal::new();
        let cancellation = signal.cancellation();
        assert!(!cancellation.is_cancelled());

        let waiter = tokio::spawn(async move {
            cancellation.cancelled().await;
            cancellation.reason()
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        signal.fail("sibling failed");

        let reason = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should wake")
            .unwrap();
        assert_eq!(reason.as_deref(), Some("sibling failed"));
    }

    #[test]
    fn detached_view_is_never_cancelled() {
        let cancellation = Cancellation::detached();
        assert!(!cancellation.is_cancelled());
        assert!(cancellation.reason().is_none());
    }
}
