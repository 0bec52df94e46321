//! Shared helpers for fan-out integration tests

#![allow(dead_code)]

pub mod strategies;

use fanout_core::TaskError;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Tracks how many bodies are running at once and the highest level ever reached
#[derive(Debug, Default)]
pub struct ConcurrencyProbe {
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl ConcurrencyProbe {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Mark a body as running for `hold`, updating the peak
    pub fn enter_for(&self, hold: Duration) {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        std::thread::sleep(hold);
        self.active.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

/// Blocking body that sleeps `delay_ms` and echoes it back
pub fn sleep_and_echo(delay_ms: u64) -> Result<u64, TaskError> {
    std::thread::sleep(Duration::from_millis(delay_ms));
    Ok(delay_ms)
}
