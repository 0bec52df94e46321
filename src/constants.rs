//! # Constants
//!
//! Defaults, environment variable names and the status codes task bodies commonly
//! attach to assertion failures.

/// Default values for [`crate::config::FanOutConfig`]
pub mod defaults {
    pub const DRAIN_ON_FAILURE: bool = false;
    pub const BATCH_LIMIT: usize = 4;
    pub const SLOW_TASK_WARN_MS: u64 = 0;
}

/// Environment variables read by configuration and logging
pub mod env {
    /// Prefix for configuration overrides, e.g. `FANOUT_DRAIN_ON_FAILURE=true`
    pub const CONFIG_PREFIX: &str = "FANOUT";
    pub const ENVIRONMENT: &str = "FANOUT_ENV";
    pub const APP_ENVIRONMENT: &str = "APP_ENV";
    pub const LOG_FORMAT: &str = "FANOUT_LOG_FORMAT";
    pub const LOG_LEVEL: &str = "FANOUT_LOG_LEVEL";
}

/// HTTP-style status codes for [`crate::validation::assert`]
pub mod status {
    pub const BAD_REQUEST: u16 = 400;
    pub const NOT_FOUND: u16 = 404;
    pub const CONFLICT: u16 = 409;
    pub const INTERNAL_SERVER_ERROR: u16 = 500;
}

