//! # Concurrent Mapper
//!
//! Unlimited fan-out: one worker per input element, results in input order, first
//! failure wins.
//!
//! Blocking bodies each get a dedicated OS thread, so a body may sleep or do
//! synchronous I/O without stalling the runtime, and the number of workers is never
//! capped by a thread pool. Async bodies are spawned as ordinary tokio tasks.
//!
//! ## Usage
//!
//! ```rust
//! use fanout_core::{map_concurrent, TaskError};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let squares = map_concurrent(vec![1u64, 2, 3], |n| Ok::<_, TaskError>(n * n))
//!     .await
//!     .unwrap();
//! assert_eq!(squares, vec![1, 4, 9]);
//! # }
//! ```

use crate::config::FanOutConfig;
use crate::error::{Result, TaskError};
use crate::execution::failure_signal::Cancellation;
use crate::execution::fan_out::FanOut;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, Instrument};

/// Runs one worker per input element and gathers the results in input order
#[derive(Debug, Clone, Default)]
pub struct ConcurrentMapper {
    config: FanOutConfig,
}

impl ConcurrentMapper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: FanOutConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FanOutConfig {
        &self.config
    }

    /// Apply a blocking `mapper` to every element concurrently
    pub async fn map<T, R, F>(&self, input: Vec<T>, mapper: F) -> Result<Vec<R>>
    where
        T: Send + 'static,
        R: Send + 'static,
        F: Fn(T) -> std::result::Result<R, TaskError> + Send + Sync + 'static,
    {
        self.map_cancellable(input, move |item, _| mapper(item)).await
    }

    /// Like [`map`](Self::map), but each body also receives the call's cancellation view
    pub async fn map_cancellable<T, R, F>(&self, input: Vec<T>, mapper: F) -> Result<Vec<R>>
    where
        T: Send + 'static,
        R: Send + 'static,
        F: Fn(T, Cancellation) -> std::result::Result<R, TaskError> + Send + Sync + 'static,
    {
        self.run_blocking("map_concurrent", input, Arc::new(mapper))
            .await
    }

    /// Apply an async `mapper` to every element concurrently
    pub async fn map_async<T, R, F, Fut>(&self, input: Vec<T>, mapper: F) -> Result<Vec<R>>
    where
        T: Send + 'static,
        R: Send + 'static,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<R, TaskError>> + Send + 'static,
    {
        self.map_async_cancellable(input, move |item, _| mapper(item))
            .await
    }

    /// Like [`map_async`](Self::map_async), with the call's cancellation view
    pub async fn map_async_cancellable<T, R, F, Fut>(
        &self,
        input: Vec<T>,
        mapper: F,
    ) -> Result<Vec<R>>
    where
        T: Send + 'static,
        R: Send + 'static,
        F: Fn(T, Cancellation) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<R, TaskError>> + Send + 'static,
    {
        self.run_async("map_concurrent_async", input, Arc::new(mapper))
            .await
    }

    /// Fan a blocking mapper out over `input`; shared with the batch limiter
    pub(crate) async fn run_blocking<T, R, F>(
        &self,
        operation: &'static str,
        input: Vec<T>,
        mapper: Arc<F>,
    ) -> Result<Vec<R>>
    where
        T: Send + 'static,
        R: Send + 'static,
        F: Fn(T, Cancellation) -> std::result::Result<R, TaskError> + Send + Sync + 'static,
    {
        let fan_out = FanOut::new(operation, input.len(), &self.config);

        for (index, item) in input.into_iter().enumerate() {
            let slot = fan_out.slot(index);
            let cancellation = fan_out.cancellation();
            let mapper = Arc::clone(&mapper);

            fan_out.spawn_thread(index, move || {
                debug!(index = index, "Worker started");
                slot.run_blocking(move || (*mapper)(item, cancellation));
            });
        }

        fan_out.join().await
    }

    /// Fan an async mapper out over `input`; shared with the batch limiter
    pub(crate) async fn run_async<T, R, F, Fut>(
        &self,
        operation: &'static str,
        input: Vec<T>,
        mapper: Arc<F>,
    ) -> Result<Vec<R>>
    where
        T: Send + 'static,
        R: Send + 'static,
        F: Fn(T, Cancellation) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<R, TaskError>> + Send + 'static,
    {
        let fan_out = FanOut::new(operation, input.len(), &self.config);

        for (index, item) in input.into_iter().enumerate() {
            let slot = fan_out.slot(index);
            let cancellation = fan_out.cancellation();
            let mapper = Arc::clone(&mapper);

            tokio::spawn(
                async move {
                    debug!(index = index, "Worker started");
                    slot.run_async(move || (*mapper)(item, cancellation)).await;
                }
                .instrument(fan_out.span().clone()),
            );
        }

        fan_out.join().await
    }
}

/// Apply `mapper` to every element concurrently with default settings
pub async fn map_concurrent<T, R, F>(input: Vec<T>, mapper: F) -> Result<Vec<R>>
where
    T: Send + 'static,
    R: Send + 'static,
    F: Fn(T) -> std::result::Result<R, TaskError> + Send + Sync + 'static,
{
    ConcurrentMapper::new().map(input, mapper).await
}

/// Async-body counterpart of [`map_concurrent`]
pub async fn map_concurrent_async<T, R, F, Fut>(input: Vec<T>, mapper: F) -> Result<Vec<R>>
where
    T: Send + 'static,
    R: Send + 'static,
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = std::result::Result<R, TaskError>> + Send + 'static,
{
    ConcurrentMapper::new().map_async(input, mapper).await
}
