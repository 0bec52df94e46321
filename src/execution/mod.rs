//! # Execution
//!
//! Fan-out/fan-in machinery. The public entry points are the [`ConcurrentMapper`],
//! [`BatchLimiter`] and [`DynamicInvoker`]; they share the call driver in `fan_out` and
//! the per-worker guard in `worker`.

pub mod batch_limiter;
pub mod completion;
pub mod concurrent_mapper;
pub mod context;
pub mod dynamic_invoker;
pub mod failure_signal;
pub(crate) mod fan_out;
pub mod result_collector;
pub(crate) mod worker;

pub use batch_limiter::{map_concurrent_limited, map_concurrent_limited_async, BatchLimiter};
pub use completion::CompletionCounter;
pub use concurrent_mapper::{map_concurrent, map_concurrent_async, ConcurrentMapper};
pub use context::TaskContext;
pub use dynamic_invoker::{
    invoke_concurrent, promisify, DynamicInvoker, Handler, HandlerRegistry, Promise, Resolved,
};
pub use failure_signal::{Cancellation, FailureSignal};
pub use result_collector::ResultCollector;
