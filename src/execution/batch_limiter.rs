//! # Batch Limiter
//!
//! Bounded fan-out. The input is cut into consecutive batches of `limit` elements and
//! each batch goes through the [`ConcurrentMapper`] in turn, so at most `limit` workers
//! run at once. The first failing batch ends the call; later batches never start.
//!
//! `limit` must be strictly smaller than the input length. A limit equal to the length
//! would just be an unlimited fan-out and is rejected like any larger value; `0` is
//! treated as `1`.

use crate::config::FanOutConfig;
use crate::error::{Result, TaskError};
use crate::execution::concurrent_mapper::ConcurrentMapper;
use crate::execution::failure_signal::Cancellation;
use crate::validation::validate_batch_limit;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug, Clone, Default)]
pub struct BatchLimiter {
    mapper: ConcurrentMapper,
}

impl BatchLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: FanOutConfig) -> Self {
        Self {
            mapper: ConcurrentMapper::with_config(config),
        }
    }

    pub fn config(&self) -> &FanOutConfig {
        self.mapper.config()
    }

    /// Apply a blocking `mapper` to every element, at most `limit` at a time
    pub async fn map<T, R, F>(&self, input: Vec<T>, mapper: F, limit: usize) -> Result<Vec<R>>
    where
        T: Send + 'static,
        R: Send + 'static,
        F: Fn(T) -> std::result::Result<R, TaskError> + Send + Sync + 'static,
    {
        let batch_size = validate_batch_limit(limit, input.len())?;
        let mapper = Arc::new(move |item: T, _: Cancellation| mapper(item));
        let total = input.len();
        let mut collected = Vec::with_capacity(total);

        for (batch_index, batch) in into_batches(input, batch_size).into_iter().enumerate() {
            let start = batch_index * batch_size;
            debug!(
                batch_index = batch_index,
                start = start,
                end = start + batch.len(),
                total = total,
                "Dispatching batch"
            );

            match self
                .mapper
                .run_blocking("map_concurrent_limited", batch, Arc::clone(&mapper))
                .await
            {
                Ok(values) => collected.extend(values),
                Err(err) => {
                    warn!(
                        batch_index = batch_index,
                        error = %err,
                        "Batch failed, remaining batches skipped"
                    );
                    return Err(err);
                }
            }
        }

        Ok(collected)
    }

    /// [`map`](Self::map) using the configured `default_batch_limit`
    ///
    /// Inputs no longer than the default limit fit in a single batch and run as one
    /// unlimited fan-out instead of being rejected.
    pub async fn map_with_default_limit<T, R, F>(&self, input: Vec<T>, mapper: F) -> Result<Vec<R>>
    where
        T: Send + 'static,
        R: Send + 'static,
        F: Fn(T) -> std::result::Result<R, TaskError> + Send + Sync + 'static,
    {
        let limit = self.config().default_batch_limit;
        if limit >= input.len() {
            debug!(
                limit = limit,
                input_len = input.len(),
                "Input fits in one batch, running unlimited"
            );
            return self.mapper.map(input, mapper).await;
        }
        self.map(input, mapper, limit).await
    }

    /// Async-body counterpart of [`map`](Self::map)
    pub async fn map_async<T, R, F, Fut>(
        &self,
        input: Vec<T>,
        mapper: F,
        limit: usize,
    ) -> Result<Vec<R>>
    where
        T: Send + 'static,
        R: Send + 'static,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<R, TaskError>> + Send + 'static,
    {
        let batch_size = validate_batch_limit(limit, input.len())?;
        let mapper = Arc::new(move |item: T, _: Cancellation| mapper(item));
        let mut collected = Vec::with_capacity(input.len());

        for (batch_index, batch) in into_batches(input, batch_size).into_iter().enumerate() {
            debug!(batch_index = batch_index, size = batch.len(), "Dispatching batch");

            match self
                .mapper
                .run_async("map_concurrent_limited_async", batch, Arc::clone(&mapper))
                .await
            {
                Ok(values) => collected.extend(values),
                Err(err) => {
                    warn!(
                        batch_index = batch_index,
                        error = %err,
                        "Batch failed, remaining batches skipped"
                    );
                    return Err(err);
                }
            }
        }

        Ok(collected)
    }
}

/// Split `input` into consecutive batches of `batch_size`; the last one may be shorter
fn into_batches<T>(input: Vec<T>, batch_size: usize) -> Vec<Vec<T>> {
    let mut batches = Vec::with_capacity(input.len().div_ceil(batch_size));
    let mut items = input.into_iter();
    loop {
        let batch: Vec<T> = items.by_ref().take(batch_size).collect();
        if batch.is_empty() {
            return batches;
        }
        batches.push(batch);
    }
}

/// Apply `mapper` to every element, at most `limit` at a time, with default settings
pub async fn map_concurrent_limited<T, R, F>(
    input: Vec<T>,
    mapper: F,
    limit: usize,
) -> Result<Vec<R>>
where
    T: Send + 'static,
    R: Send + 'static,
    F: Fn(T) -> std::result::Result<R, TaskError> + Send + Sync + 'static,
{
    BatchLimiter::new().map(input, mapper, limit).await
}

/// Async-body counterpart of [`map_concurrent_limited`]
pub async fn map_concurrent_limited_async<T, R, F, Fut>(
    input: Vec<T>,
    mapper: F,
    limit: usize,
) -> Result<Vec<R>>
where
    T: Send + 'static,
    R: Send + 'static,
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = std::result::Result<R, TaskError>> + Send + 'static,
{
    BatchLimiter::new().map_async(input, mapper, limit).await
}
