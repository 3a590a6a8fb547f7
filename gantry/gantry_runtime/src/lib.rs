//! # Gantry Runtime
//!
//! Container runtime for Gantry. The [`Runtime`] facade owns the
//! component kernel, the connection registry and the default worker
//! pool, and wires them together from a
//! [`RuntimeConfig`](system::config::RuntimeConfig): components register
//! with the kernel and come up in dependency order, listeners register
//! with the connection registry, and shutdown tears everything down in
//! reverse.

pub mod kernel;
pub mod system;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::time::timeout;
use tracing::info;

use gantry_net::{ConnectionRegistry, TokioPool};

use crate::system::config::RuntimeConfig;

/// Main runtime tying the container services together.
pub struct Runtime {
    /// Component kernel driving lifecycle transitions in dependency order.
    pub kernel: Arc<kernel::Kernel>,

    /// Registry of named network acceptors.
    pub connections: Arc<ConnectionRegistry>,

    /// Default worker pool behind the registry.
    pool: Arc<TokioPool>,

    config: RuntimeConfig,
}

impl Runtime {
    /// Create a runtime, loading configuration from `config_path` when
    /// one is given.
    pub async fn new(config_path: Option<&str>) -> Result<Self> {
        info!("Initializing Gantry runtime");
        let config = RuntimeConfig::load(config_path).await?;
        Ok(Self::with_config(config))
    }

    /// Build a runtime from an existing configuration.
    ///
    /// The default pool is bounded by `worker_limit` and the registry
    /// inherits `accept_timeout_ms` for listeners registered without a
    /// timeout of their own.
    pub fn with_config(config: RuntimeConfig) -> Self {
        let pool = Arc::new(TokioPool::bounded(config.worker_limit));
        let connections = Arc::new(ConnectionRegistry::with_defaults(
            pool.clone(),
            config.accept_timeout(),
        ));
        let kernel = Arc::new(kernel::Kernel::new());

        Self {
            kernel,
            connections,
            pool,
            config,
        }
    }

    /// Start the runtime: every registered component comes up in
    /// dependency order, bounded by the configured startup timeout.
    pub async fn start(&self) -> Result<()> {
        info!("Starting Gantry runtime");

        let deadline = Duration::from_secs(self.config.startup_timeout);
        timeout(deadline, self.kernel.startup())
            .await
            .context("Startup timed out")??;

        info!("Gantry runtime started");
        Ok(())
    }

    /// Shut the runtime down: connections first, then components in
    /// reverse dependency order, then the default pool.
    pub async fn shutdown(&self) -> Result<()> {
        info!("Shutting down Gantry runtime");

        self.connections.dispose_all().await;

        let deadline = Duration::from_secs(self.config.shutdown_timeout);
        timeout(deadline, self.kernel.shutdown())
            .await
            .context("Shutdown timed out")??;

        self.pool.shutdown();
        info!("Gantry runtime shut down");
        Ok(())
    }

    /// The runtime configuration.
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// The default worker pool.
    pub fn pool(&self) -> Arc<TokioPool> {
        self.pool.clone()
    }
}
