use crate::constants::{defaults, env};
use crate::error::{FanOutError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Tunables shared by the mapper, the batch limiter and the dynamic invoker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FanOutConfig {
    /// Wait for every spawned worker to finish before returning a failure
    pub drain_on_failure: bool,

    /// Batch size used by callers that do not pick one themselves
    pub default_batch_limit: usize,

    /// Tasks running longer than this are logged at warn level (0 disables)
    pub slow_task_warn_ms: u64,
}

impl Default for FanOutConfig {
    fn default() -> Self {
        Self {
            drain_on_failure: defaults::DRAIN_ON_FAILURE,
            default_batch_limit: defaults::BATCH_LIMIT,
            slow_task_warn_ms: defaults::SLOW_TASK_WARN_MS,
        }
    }
}

impl FanOutConfig {
    /// Defaults overridden by `FANOUT_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::build(None, None)
    }

    /// Defaults overridden by a config file, then by `FANOUT_*` environment variables
    ///
    /// The file format is picked from the extension (toml, yaml, json, ...).
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(FanOutError::Configuration(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
        Self::build(Some(path), None)
    }

    fn build(path: Option<&Path>, env_vars: Option<HashMap<String, String>>) -> Result<Self> {
        let mut builder = config::Config::builder()
            .set_default("drain_on_failure", defaults::DRAIN_ON_FAILURE)?
            .set_default("default_batch_limit", defaults::BATCH_LIMIT as i64)?
            .set_default("slow_task_warn_ms", defaults::SLOW_TASK_WARN_MS as i64)?;

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let config: FanOutConfig = builder
            .add_source(
                config::Environment::with_prefix(env::CONFIG_PREFIX)
                    .try_parsing(true)
                    .source(env_vars),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.default_batch_limit == 0 {
            return Err(FanOutError::Configuration(
                "default_batch_limit must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}
