//! Input validation for fan-out calls
//!
//! Holds the assertion helper task bodies use to report business-rule failures, the
//! batch limit precondition, and the sanity checks applied to JSON arguments of
//! late-bound handlers before they are dispatched.

use crate::error::{AssertionError, FanOutError, Result, TaskError};
use serde_json::Value;

/// Maximum allowed size for serialized handler arguments (1MB)
const MAX_ARGS_SIZE_BYTES: usize = 1024 * 1024;

/// Maximum nesting depth for handler arguments
const MAX_ARGS_DEPTH: usize = 10;

/// Maximum number of keys in a JSON object or items in a JSON array
const MAX_ARGS_ENTRIES: usize = 1000;

/// Fails with a structured [`AssertionError`] when `condition` is false
///
/// ```rust
/// use fanout_core::validation::assert;
///
/// fn check_quota(used: u32) -> Result<u32, fanout_core::TaskError> {
///     assert(used < 10, "QUOTA_EXCEEDED", 429, "Too many requests")?;
///     Ok(used)
/// }
///
/// assert!(check_quota(3).is_ok());
/// assert_eq!(
///     check_quota(12).unwrap_err().to_string(),
///     "429:QUOTA_EXCEEDED:Too many requests"
/// );
/// ```
pub fn assert(
    condition: bool,
    code: &str,
    status: u16,
    message: &str,
) -> std::result::Result<(), AssertionError> {
    if condition {
        Ok(())
    } else {
        Err(AssertionError {
            code: code.to_string(),
            status,
            message: message.to_string(),
        })
    }
}

/// Checks the batch limit against the input length and returns the effective batch size
///
/// The limit must be strictly smaller than the input length; a limit equal to the
/// length is rejected as well. Zero is clamped to 1 after the check.
pub fn validate_batch_limit(limit: usize, input_len: usize) -> Result<usize> {
    if limit >= input_len {
        return Err(FanOutError::InvalidArgument(format!(
            "Limit is invalid! limit {limit} must be less than input length {input_len}"
        )));
    }

    Ok(limit.max(1))
}

/// Validates JSON arguments handed to a named handler
pub fn validate_handler_args(args: &Value) -> std::result::Result<(), TaskError> {
    let serialized = serde_json::to_string(args)?;

    if serialized.len() > MAX_ARGS_SIZE_BYTES {
        return Err(TaskError::InvalidArgument(format!(
            "Handler arguments too large: {} bytes (max: {})",
            serialized.len(),
            MAX_ARGS_SIZE_BYTES
        )));
    }

    validate_args_depth(args, 0)
}

fn validate_args_depth(value: &Value, current_depth: usize) -> std::result::Result<(), TaskError> {
    if current_depth > MAX_ARGS_DEPTH {
        return Err(TaskError::InvalidArgument(format!(
            "Handler arguments nested too deep: {current_depth} (max: {MAX_ARGS_DEPTH})"
        )));
    }

    match value {
        Value::Object(map) => {
            if map.len() > MAX_ARGS_ENTRIES {
                return Err(TaskError::InvalidArgument(format!(
                    "Too many argument keys: {} (max: {})",
                    map.len(),
                    MAX_ARGS_ENTRIES
                )));
            }
            for val in map.values() {
                validate_args_depth(val, current_depth + 1)?;
            }
        }
        Value::Array(arr) => {
            if arr.len() > MAX_ARGS_ENTRIES {
                return Err(TaskError::InvalidArgument(format!(
                    "Argument array too large: {} items (max: {})",
                    arr.len(),
                    MAX_ARGS_ENTRIES
                )));
            }
            for item in arr {
                validate_args_depth(item, current_depth + 1)?;
            }
        }
        _ => {}
    }

    Ok(())
}
