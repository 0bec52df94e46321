//! Per-worker failure guard.
//!
//! A [`WorkerSlot`] is handed to exactly one worker. The worker reports through it once;
//! the slot stores the value or records the failure, then decrements the completion
//! counter. If the worker vanishes without reporting (its task was dropped by a runtime
//! shutdown, say) the slot's `Drop` records that as a failure so the caller is never
//! left waiting.

use crate::error::TaskError;
use crate::execution::completion::CompletionCounter;
use crate::execution::failure_signal::FailureSignal;
use crate::execution::result_collector::ResultCollector;
use futures::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

pub(crate) struct WorkerSlot<R> {
    index: usize,
    results: Arc<ResultCollector<R>>,
    failure: FailureSignal,
    counter: Arc<CompletionCounter>,
    slow_task_warn: Option<Duration>,
    reported: bool,
}

impl<R> WorkerSlot<R> {
    pub(crate) fn new(
        index: usize,
        results: Arc<ResultCollector<R>>,
        failure: FailureSignal,
        counter: Arc<CompletionCounter>,
        slow_task_warn: Option<Duration>,
    ) -> Self {
        Self {
            index,
            results,
            failure,
            counter,
            slow_task_warn,
            reported: false,
        }
    }

    /// Run a blocking body, converting a panic into a task failure
    pub(crate) fn run_blocking<F>(self, body: F)
    where
        F: FnOnce() -> Result<R, TaskError>,
    {
        let started = Instant::now();
        let outcome = panic::catch_unwind(AssertUnwindSafe(body))
            .unwrap_or_else(|payload| Err(TaskError::Unexpected(panic_message(&*payload))));
        self.report(outcome, started.elapsed());
    }

    /// Run an async body, converting a panic (while building or polling it) into a task failure
    pub(crate) async fn run_async<F, Fut>(self, make_body: F)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<R, TaskError>>,
    {
        let started = Instant::now();
        let outcome = match panic::catch_unwind(AssertUnwindSafe(make_body)) {
            Ok(body) => AssertUnwindSafe(body)
                .catch_unwind()
                .await
                .unwrap_or_else(|payload| Err(TaskError::Unexpected(panic_message(&*payload)))),
            Err(payload) => Err(TaskError::Unexpected(panic_message(&*payload))),
        };
        self.report(outcome, started.elapsed());
    }

    fn report(mut self, outcome: Result<R, TaskError>, elapsed: Duration) {
        if let Some(threshold) = self.slow_task_warn {
            if elapsed > threshold {
                warn!(
                    index = self.index,
                    elapsed_ms = elapsed.as_millis() as u64,
                    threshold_ms = threshold.as_millis() as u64,
                    "🐢 Slow task"
                );
            }
        }

        match outcome {
            Ok(value) => {
                self.results.store(self.index, value);
                debug!(
                    index = self.index,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Task completed"
                );
            }
            Err(err) => {
                let message = err.to_string();
                let won = self.failure.fail(message.clone());
                warn!(
                    index = self.index,
                    error = %message,
                    first_failure = won,
                    "Task failed"
                );
            }
        }

        self.reported = true;
        self.counter.complete_one();
    }
}

impl<R> Drop for WorkerSlot<R> {
    fn drop(&mut self) {
        if !self.reported {
            self.failure.fail(format!(
                "Task {} exited without reporting a result",
                self.index
            ));
            self.counter.complete_one();
        }
    }
}

/// Flatten a panic payload into a message
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "Task panicked with a non-string payload".to_string()
    }
}
