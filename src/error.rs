//! # Error Types
//!
//! Two layers of errors exist. [`TaskError`] is what a single task body returns to its
//! worker; it keeps structure (assertion code and status). [`FanOutError`] is what the
//! aggregate call returns; by the time a worker failure reaches it the failure has been
//! flattened into a single message.

use std::fmt;

/// Structured business-rule failure raised by [`crate::validation::assert`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{status}:{code}:{message}")]
pub struct AssertionError {
    pub code: String,
    pub status: u16,
    pub message: String,
}

/// Failure of a single task body
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TaskError {
    /// Explicit assertion failure inside the body
    #[error(transparent)]
    Assertion(#[from] AssertionError),

    /// The task was handed something it cannot work with (e.g. an unknown handler)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Anything else, including panics caught by the worker guard
    #[error("{0}")]
    Unexpected(String),
}

impl TaskError {
    pub fn unexpected(msg: impl fmt::Display) -> Self {
        TaskError::Unexpected(msg.to_string())
    }

    pub fn invalid_argument(msg: impl fmt::Display) -> Self {
        TaskError::InvalidArgument(msg.to_string())
    }
}

impl From<anyhow::Error> for TaskError {
    fn from(err: anyhow::Error) -> Self {
        // {:#} keeps the context chain on one line
        TaskError::Unexpected(format!("{err:#}"))
    }
}

impl From<serde_json::Error> for TaskError {
    fn from(err: serde_json::Error) -> Self {
        TaskError::InvalidArgument(format!("Malformed arguments: {err}"))
    }
}

/// Failure of an aggregate fan-out call
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FanOutError {
    /// First failure recorded by any worker, flattened to text
    #[error("{0}")]
    TaskFailed(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Bookkeeping broke (e.g. a result slot is missing after a clean completion)
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl FanOutError {
    /// Message carried by the error, without the variant prefix
    pub fn message(&self) -> &str {
        match self {
            FanOutError::TaskFailed(msg)
            | FanOutError::InvalidArgument(msg)
            | FanOutError::Internal(msg)
            | FanOutError::Configuration(msg) => msg,
        }
    }
}

impl From<config::ConfigError> for FanOutError {
    fn from(err: config::ConfigError) -> Self {
        FanOutError::Configuration(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, FanOutError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assertion_error_displays_status_code_message() {
        let err = AssertionError {
            code: "UNKNOWN".to_string(),
            status: 500,
            message: "Time Exceeded!!".to_string(),
        };
        assert_eq!(err.to_string(), "500:UNKNOWN:Time Exceeded!!");

        let task_err: TaskError = err.into();
        assert_eq!(task_err.to_string(), "500:UNKNOWN:Time Exceeded!!");
    }

    #[test]
    fn anyhow_errors_keep_their_context_chain() {
        let err = anyhow::anyhow!("connection refused").context("fetching profile");
        let task_err = TaskError::from(err);
        assert_eq!(
            task_err,
            TaskError::Unexpected("fetching profile: connection refused".to_string())
        );
    }

    #[test]
    fn fan_out_error_message_strips_prefix() {
        let err = FanOutError::InvalidArgument("Limit is invalid!".to_string());
        assert_eq!(err.to_string(), "Invalid argument: Limit is invalid!");
        assert_eq!(err.message(), "Limit is invalid!");
    }
}
