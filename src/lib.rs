#![allow(clippy::doc_markdown)] // Allow technical terms like DashMap, tokio in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Fanout Core
//!
//! Concurrent fan-out/fan-in for tokio applications.
//!
//! ## Overview
//!
//! A caller hands over a collection of work items (or a list of heterogeneous calls),
//! every item runs on its own worker, and the caller gets back one ordered result list.
//! The first failing worker decides the outcome: the caller is released with that
//! failure immediately, without waiting for the remaining workers.
//!
//! ## Key Features
//!
//! - **Ordered results**: output position `i` always belongs to input element `i`
//! - **First failure wins**: exactly one failure message is published per call
//! - **Early release**: a failure resolves the call while other workers are still running
//! - **Panic safety**: a panicking body is reported as a failure, never a hang
//! - **Bounded fan-out**: sequential batches with at most `limit` workers at a time
//! - **Dynamic invocation**: heterogeneous callables over one shared [`TaskContext`]
//!
//! ## Module Organization
//!
//! - [`execution`] - Mapper, batch limiter, dynamic invoker and their shared plumbing
//! - [`validation`] - Structured assertions and argument checks
//! - [`config`] - Fan-out settings loaded from defaults, files and the environment
//! - [`error`] - Task-level and call-level error types
//! - [`logging`] - Structured logging setup
//!
//! ## Quick Start
//!
//! ```rust
//! use fanout_core::{map_concurrent, validation::assert, TaskError};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let lengths = map_concurrent(vec!["a", "bb", "ccc"], |word: &str| {
//!     assert(!word.is_empty(), "EMPTY_WORD", 400, "Word must not be empty")?;
//!     Ok::<_, TaskError>(word.len())
//! })
//! .await
//! .unwrap();
//!
//! assert_eq!(lengths, vec![1, 2, 3]);
//! # }
//! ```
//!
//! ## Testing
//!
//! ```bash
//! cargo test --lib    # Unit tests
//! cargo test          # Unit, integration and property tests
//! ```

pub mod config;
pub mod constants;
pub mod error;
pub mod execution;
pub mod logging;
pub mod validation;

pub use config::FanOutConfig;
pub use error::{AssertionError, FanOutError, Result, TaskError};
pub use execution::{
    invoke_concurrent, map_concurrent, map_concurrent_async, map_concurrent_limited,
    map_concurrent_limited_async, promisify, BatchLimiter, Cancellation, ConcurrentMapper,
    DynamicInvoker, FailureSignal, Handler, HandlerRegistry, Promise, Resolved, TaskContext,
};
pub use validation::assert;
