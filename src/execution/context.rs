//! Shared context handed to every promise of a dynamic invocation.

use crate::execution::failure_signal::Cancellation;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Values, optional deadline and cancellation view shared by all tasks of one call
///
/// The deadline is informational: tasks may consult it, nothing enforces it.
///
/// ```rust
/// use fanout_core::TaskContext;
/// use std::collections::HashMap;
/// use std::time::Duration;
///
/// let mut delays = HashMap::new();
/// delays.insert("fetch_user", Duration::from_millis(30));
///
/// let context = TaskContext::new(delays).with_timeout(Duration::from_secs(5));
/// assert_eq!(context.values()["fetch_user"], Duration::from_millis(30));
/// assert!(!context.is_expired());
/// assert!(!context.is_cancelled());
/// ```
#[derive(Debug)]
pub struct TaskContext<C> {
    values: Arc<C>,
    deadline: Option<Instant>,
    cancellation: Cancellation,
}

impl<C> Clone for TaskContext<C> {
    fn clone(&self) -> Self {
        Self {
            values: Arc::clone(&self.values),
            deadline: self.deadline,
            cancellation: self.cancellation.clone(),
        }
    }
}

impl<C> TaskContext<C> {
    pub fn new(values: C) -> Self {
        Self::from_shared(Arc::new(values))
    }

    pub fn from_shared(values: Arc<C>) -> Self {
        Self {
            values,
            deadline: None,
            cancellation: Cancellation::detached(),
        }
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn values(&self) -> &C {
        &self.values
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline, `None` when no deadline is set
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    pub fn is_expired(&self) -> bool {
        self.deadline
            .map(|deadline| Instant::now() >= deadline)
            .unwrap_or(false)
    }

    pub fn cancellation(&self) -> &Cancellation {
        &self.cancellation
    }

    /// Whether a sibling task of the current call has already failed
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Attach the context to a call's failure signal
    pub(crate) fn bind(mut self, cancellation: Cancellation) -> Self {
        self.cancellation = cancellation;
        self
    }
}
