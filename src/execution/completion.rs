//! Outstanding-worker counter.

use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Notify;

/// Counts workers that have not reported yet and wakes waiters when it reaches zero
#[derive(Debug)]
pub struct CompletionCounter {
    remaining: AtomicUsize,
    notify: Notify,
}

impl CompletionCounter {
    pub fn new(workers: usize) -> Self {
        Self {
            remaining: AtomicUsize::new(workers),
            notify: Notify::new(),
        }
    }

    /// Mark one worker as done and return how many are still outstanding
    pub fn complete_one(&self) -> usize {
        let previous = self
            .remaining
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            .unwrap_or(0);

        let remaining = previous.saturating_sub(1);
        if remaining == 0 {
            self.notify.notify_waiters();
        }
        remaining
    }

    pub fn remaining(&self) -> usize {
        self.remaining.load(Ordering::Acquire)
    }

    pub fn is_drained(&self) -> bool {
        self.remaining() == 0
    }

    /// Resolves once every worker has reported
    pub async fn drained(&self) {
        loop {
            let notified = self.notify.notified();
            if self.is_drained() {
                return;
            }
            notified.await;
        }
    }
}
