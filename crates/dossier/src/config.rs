//! Queue capacity configuration, consumed once at startup.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Environment variable overriding the queued-job capacity.
pub const ENV_MAX_QUEUE_SIZE: &str = "DOSSIER_MAX_QUEUE_SIZE";
/// Environment variable overriding the worker pool size.
pub const ENV_MAX_CONCURRENT: &str = "DOSSIER_MAX_CONCURRENT";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Maximum number of jobs waiting in QUEUED state. Submissions beyond
    /// this are rejected with a capacity-exceeded error. Running jobs do
    /// not consume queue slots.
    #[serde(default = "default_max_queue_size")]
    pub max_queue_size: usize,
    /// Number of worker threads, and therefore the maximum number of jobs
    /// in RUNNING state at any instant.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
}

fn default_max_queue_size() -> usize {
    100
}

fn default_max_concurrent() -> usize {
    3
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_queue_size: default_max_queue_size(),
            max_concurrent: default_max_concurrent(),
        }
    }
}

impl QueueConfig {
    /// Loads configuration from the environment, falling back to the
    /// documented defaults (100 queued, 3 concurrent) for unset variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self {
            max_queue_size: read_env_usize(ENV_MAX_QUEUE_SIZE)?
                .unwrap_or_else(default_max_queue_size),
            max_concurrent: read_env_usize(ENV_MAX_CONCURRENT)?
                .unwrap_or_else(default_max_concurrent),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_queue_size == 0 {
            return Err(ConfigError::InvalidValue {
                key: "max_queue_size".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.max_concurrent == 0 {
            return Err(ConfigError::InvalidValue {
                key: "max_concurrent".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

fn read_env_usize(key: &str) -> Result<Option<usize>, ConfigError> {
    match std::env::var(key) {
        Ok(value) => {
            let parsed = value.trim().parse().map_err(|_| ConfigError::ParseEnv {
                key: key.to_string(),
                value,
            })?;
            Ok(Some(parsed))
        }
        Err(_) => Ok(None),
    }
}
