//! # Fan-out Call Driver
//!
//! One [`FanOut`] exists per aggregate call. It owns the call's result collector,
//! failure signal and completion counter, hands a [`WorkerSlot`] to each worker, and
//! resolves the call once every worker reported or the first failure fired.

use crate::config::FanOutConfig;
use crate::error::{FanOutError, Result};
use crate::execution::completion::CompletionCounter;
use crate::execution::failure_signal::{Cancellation, FailureSignal};
use crate::execution::result_collector::ResultCollector;
use crate::execution::worker::WorkerSlot;
use crate::logging::{log_error, log_fan_out_operation};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{info_span, warn, Span};
use uuid::Uuid;

pub(crate) struct FanOut<R> {
    call_id: Uuid,
    operation: &'static str,
    total: usize,
    results: Arc<ResultCollector<R>>,
    failure: FailureSignal,
    counter: Arc<CompletionCounter>,
    drain_on_failure: bool,
    slow_task_warn: Option<Duration>,
    span: Span,
    started: Instant,
}

impl<R> FanOut<R> {
    pub(crate) fn new(operation: &'static str, total: usize, config: &FanOutConfig) -> Self {
        let call_id = Uuid::new_v4();
        let span = info_span!(
            "fan_out",
            call_id = %call_id,
            operation = operation,
            task_count = total
        );

        Self {
            call_id,
            operation,
            total,
            results: Arc::new(ResultCollector::with_capacity(total)),
            failure: FailureSignal::new(),
            counter: Arc::new(CompletionCounter::new(total)),
            drain_on_failure: config.drain_on_failure,
            slow_task_warn: (config.slow_task_warn_ms > 0)
                .then(|| Duration::from_millis(config.slow_task_warn_ms)),
            span,
            started: Instant::now(),
        }
    }

    /// The reporting handle for the worker that owns `index`
    pub(crate) fn slot(&self, index: usize) -> WorkerSlot<R> {
        WorkerSlot::new(
            index,
            Arc::clone(&self.results),
            self.failure.clone(),
            Arc::clone(&self.counter),
            self.slow_task_warn,
        )
    }

    pub(crate) fn cancellation(&self) -> Cancellation {
        self.failure.cancellation()
    }

    /// Span workers run under, so their log lines carry the call id
    pub(crate) fn span(&self) -> &Span {
        &self.span
    }

    /// Run a blocking worker on a dedicated thread under the call span
    ///
    /// Blocking bodies never share a bounded pool, so every element gets its own
    /// worker and orphans of a failed call cannot delay later calls. If the thread
    /// cannot be started the body is dropped, and with it the worker's slot, which
    /// records the failure.
    pub(crate) fn spawn_thread<F>(&self, index: usize, body: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let span = self.span.clone();
        let spawned = thread::Builder::new()
            .name(format!("fanout-worker-{index}"))
            .spawn(move || {
                let _entered = span.enter();
                body();
            });

        if let Err(err) = spawned {
            let _entered = self.span.enter();
            warn!(index = index, error = %err, "Failed to start worker thread");
        }
    }

    /// Wait for every worker or the first failure, whichever comes first
    ///
    /// Workers still running after a failure are not stopped; unless draining is
    /// configured they finish in the background and their results are discarded.
    pub(crate) async fn join(self) -> Result<Vec<R>> {
        tokio::select! {
            _ = self.counter.drained() => {}
            _ = self.failure.wait() => {}
        }

        if let Some(message) = self.failure.message() {
            let outstanding = self.counter.remaining();
            if outstanding > 0 {
                let _entered = self.span.enter();
                if self.drain_on_failure {
                    warn!(outstanding_workers = outstanding, "Draining workers after failure");
                } else {
                    warn!(
                        outstanding_workers = outstanding,
                        "Releasing caller while workers are still running"
                    );
                }
            }
            if self.drain_on_failure {
                self.counter.drained().await;
            }

            self.log_outcome("failed", Some(&message));
            return Err(FanOutError::TaskFailed(message));
        }

        match self.results.take_ordered(self.total) {
            Ok(values) => {
                self.log_outcome("completed", None);
                Ok(values)
            }
            Err(err) => {
                log_error(
                    "fan_out",
                    self.operation,
                    &err.to_string(),
                    Some(&self.call_id.to_string()),
                );
                Err(err)
            }
        }
    }

    fn log_outcome(&self, status: &str, details: Option<&str>) {
        let _entered = self.span.enter();
        log_fan_out_operation(
            self.operation,
            &self.call_id.to_string(),
            self.total,
            status,
            self.started.elapsed().as_millis(),
            details,
        );
    }
}
