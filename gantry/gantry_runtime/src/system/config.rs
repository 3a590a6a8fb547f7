//! Configuration for the Gantry runtime.
//!
//! Handles loading, validating and merging runtime configuration.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::fs;
use tracing::{info, warn};

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Runtime configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Accept timeout in milliseconds, applied to listeners registered
    /// without one. Also bounds the cancellation latency of an accept
    /// loop.
    #[serde(default = "default_accept_timeout_ms")]
    pub accept_timeout_ms: u64,

    /// Maximum number of tasks in flight on the default worker pool.
    #[serde(default = "default_worker_limit")]
    pub worker_limit: usize,

    /// Startup timeout in seconds.
    #[serde(default = "default_startup_timeout")]
    pub startup_timeout: u64,

    /// Shutdown timeout in seconds.
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout: u64,

    /// Additional configuration.
    #[serde(default)]
    pub extra: HashMap<String, serde_json::Value>,
}

fn default_accept_timeout_ms() -> u64 {
    500
}

fn default_worker_limit() -> usize {
    256
}

fn default_startup_timeout() -> u64 {
    30
}

fn default_shutdown_timeout() -> u64 {
    30
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            accept_timeout_ms: default_accept_timeout_ms(),
            worker_limit: default_worker_limit(),
            startup_timeout: default_startup_timeout(),
            shutdown_timeout: default_shutdown_timeout(),
            extra: HashMap::new(),
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from a JSON file, falling back to defaults when
    /// no path is given or the file does not exist.
    pub async fn load(config_path: Option<&str>) -> Result<Self> {
        let mut config = RuntimeConfig::default();

        if let Some(path) = config_path {
            if Path::new(path).exists() {
                info!(path = %path, "loading configuration");
                let content = fs::read_to_string(path)
                    .await
                    .map_err(|e| ConfigError::LoadFailed(format!("{}: {}", path, e)))?;
                config = serde_json::from_str(&content)
                    .map_err(|e| ConfigError::ParseFailed(format!("{}: {}", path, e)))?;
            } else {
                warn!(path = %path, "configuration file not found, using defaults");
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.accept_timeout_ms == 0 {
            return Err(ConfigError::Invalid("Accept timeout cannot be zero".to_string()).into());
        }
        if self.worker_limit == 0 {
            return Err(ConfigError::Invalid("Worker limit cannot be zero".to_string()).into());
        }
        if self.startup_timeout == 0 {
            return Err(ConfigError::Invalid("Startup timeout cannot be zero".to_string()).into());
        }
        if self.shutdown_timeout == 0 {
            return Err(
                ConfigError::Invalid("Shutdown timeout cannot be zero".to_string()).into(),
            );
        }
        Ok(())
    }

    /// Merge another configuration into this one; non-zero fields of
    /// `other` win, and its extra entries overwrite same-named keys.
    pub fn merge(&mut self, other: RuntimeConfig) {
        if other.accept_timeout_ms > 0 {
            self.accept_timeout_ms = other.accept_timeout_ms;
        }
        if other.worker_limit > 0 {
            self.worker_limit = other.worker_limit;
        }
        if other.startup_timeout > 0 {
            self.startup_timeout = other.startup_timeout;
        }
        if other.shutdown_timeout > 0 {
            self.shutdown_timeout = other.shutdown_timeout;
        }
        for (key, value) in other.extra {
            self.extra.insert(key, value);
        }
    }

    /// The accept timeout as a [`Duration`].
    pub fn accept_timeout(&self) -> Duration {
        Duration::from_millis(self.accept_timeout_ms)
    }
}
