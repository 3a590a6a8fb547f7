//! The connection registry: named acceptors with isolated teardown.
//!
//! The registry owns the map from name to [`Connection`] and is the only
//! place that map is mutated. `connect` and `disconnect` serialize on a
//! single mutex; the lock is never held across an await point. An entry
//! is always removed from the map before its accept loop is signalled,
//! so re-registering a name never races the old entry's teardown.
//!
//! [`Connection`]: crate::connection::Connection

use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use gantry_core::id::ConnectionId;
use gantry_core::types::ConnectionState;

use crate::acceptor::AcceptLoop;
use crate::connection::{Connection, ConnectionInfo};
use crate::handler::HandlerFactory;
use crate::pool::{PoolError, TokioPool, WorkerPool};

/// Accept timeout imposed when a caller supplies zero, keeping the
/// cancellation latency of every accept loop bounded.
pub const DEFAULT_ACCEPT_TIMEOUT: Duration = Duration::from_millis(500);

/// Errors raised by registry operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// A connection with this name is already registered.
    #[error("Duplicate connection: {0}")]
    DuplicateConnection(String),

    /// No connection with this name is registered.
    #[error("Unknown connection: {0}")]
    UnknownConnection(String),

    /// The worker pool refused the accept-loop task.
    #[error("Worker pool rejected accept loop: {0}")]
    Pool(#[from] PoolError),
}

/// Map of named acceptors, one per container instance.
pub struct ConnectionRegistry {
    connections: Mutex<HashMap<String, Connection>>,
    default_pool: Arc<dyn WorkerPool>,
    default_accept_timeout: Duration,
}

impl ConnectionRegistry {
    /// Create a registry with an unbounded [`TokioPool`] and the default
    /// accept timeout.
    pub fn new() -> Self {
        Self::with_defaults(Arc::new(TokioPool::new()), DEFAULT_ACCEPT_TIMEOUT)
    }

    /// Create a registry with its own default pool and accept timeout.
    ///
    /// A zero `accept_timeout` falls back to [`DEFAULT_ACCEPT_TIMEOUT`].
    pub fn with_defaults(pool: Arc<dyn WorkerPool>, accept_timeout: Duration) -> Self {
        let default_accept_timeout = if accept_timeout.is_zero() {
            DEFAULT_ACCEPT_TIMEOUT
        } else {
            accept_timeout
        };
        Self {
            connections: Mutex::new(HashMap::new()),
            default_pool: pool,
            default_accept_timeout,
        }
    }

    /// Register a named acceptor on the registry's default pool and
    /// accept timeout.
    ///
    /// See [`connect_with`](Self::connect_with).
    pub fn connect(
        &self,
        name: impl Into<String>,
        listener: TcpListener,
        factory: Arc<dyn HandlerFactory>,
    ) -> Result<ConnectionId, RegistryError> {
        self.connect_with(name, listener, factory, None, Duration::ZERO)
    }

    /// Register a named acceptor.
    ///
    /// The listener must already be bound. Its accept loop is submitted
    /// to `pool` (the registry default when `None`) and the cancellable
    /// handle recorded; the entry is `Running` once this call returns. A
    /// zero `accept_timeout` selects the registry default so the loop
    /// can poll its cancellation flag instead of blocking indefinitely.
    ///
    /// Fails with [`RegistryError::DuplicateConnection`] if `name` is
    /// taken (the existing entry is untouched) and with
    /// [`RegistryError::Pool`] if the pool refuses the accept loop, in
    /// which case nothing is registered and the listener is closed.
    pub fn connect_with(
        &self,
        name: impl Into<String>,
        listener: TcpListener,
        factory: Arc<dyn HandlerFactory>,
        pool: Option<Arc<dyn WorkerPool>>,
        accept_timeout: Duration,
    ) -> Result<ConnectionId, RegistryError> {
        let name = name.into();
        let accept_timeout = if accept_timeout.is_zero() {
            self.default_accept_timeout
        } else {
            accept_timeout
        };
        let pool = pool.unwrap_or_else(|| self.default_pool.clone());

        let mut connections = self.connections.lock();
        if connections.contains_key(&name) {
            return Err(RegistryError::DuplicateConnection(name));
        }

        let id = ConnectionId::new();
        let cancel = Arc::new(AtomicBool::new(false));
        let workers = Arc::new(Mutex::new(Vec::new()));
        let accept_loop = AcceptLoop::new(
            name.clone(),
            id,
            listener,
            factory,
            pool.clone(),
            cancel.clone(),
            workers.clone(),
            accept_timeout,
        );
        let acceptor = pool.submit(Box::pin(accept_loop.run()))?;

        let mut connection =
            Connection::new(id, name.clone(), accept_timeout, cancel, acceptor, workers);
        connection.mark_running();
        info!(connection = %name, id = %id, "connection registered");
        connections.insert(name, connection);
        Ok(id)
    }

    /// Disconnect a named acceptor.
    ///
    /// The entry leaves the map before its loop is signalled. The wait
    /// for the loop to exit is bounded by one accept-timeout interval
    /// plus grace; `force` skips the wait and also aborts in-flight
    /// handler dispatches, as a best-effort hint.
    ///
    /// Fails with [`RegistryError::UnknownConnection`] if `name` is not
    /// registered, leaving the registry unchanged.
    pub async fn disconnect(&self, name: &str, force: bool) -> Result<(), RegistryError> {
        let connection = {
            let mut connections = self.connections.lock();
            connections
                .remove(name)
                .ok_or_else(|| RegistryError::UnknownConnection(name.to_string()))?
        };

        info!(connection = %name, force, "disconnecting");
        connection.dispose(force).await;
        Ok(())
    }

    /// Disconnect every registered acceptor.
    ///
    /// Snapshots the current names and disconnects each in turn. An
    /// individual failure is logged and the sweep continues; when this
    /// returns, every snapshotted name is gone.
    pub async fn dispose_all(&self) {
        let names: Vec<String> = {
            let connections = self.connections.lock();
            connections.keys().cloned().collect()
        };

        debug!(count = names.len(), "disposing all connections");
        for name in names {
            if let Err(e) = self.disconnect(&name, false).await {
                warn!(connection = %name, error = %e, "failed to disconnect; continuing");
            }
        }
    }

    /// Lifecycle state of a registered connection.
    pub fn state(&self, name: &str) -> Option<ConnectionState> {
        self.connections.lock().get(name).map(|c| c.state())
    }

    /// Snapshot of a registered connection.
    pub fn info(&self, name: &str) -> Option<ConnectionInfo> {
        self.connections.lock().get(name).map(|c| c.info())
    }

    /// Names of all registered connections.
    pub fn names(&self) -> Vec<String> {
        self.connections.lock().keys().cloned().collect()
    }

    /// Number of registered connections.
    pub fn len(&self) -> usize {
        self.connections.lock().len()
    }

    /// Whether no connections are registered.
    pub fn is_empty(&self) -> bool {
        self.connections.lock().is_empty()
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unknown_disconnect_rejected() {
        let registry = ConnectionRegistry::new();

        let err = registry.disconnect("nonexistent", false).await.unwrap_err();
        assert_eq!(
            err,
            RegistryError::UnknownConnection("nonexistent".to_string())
        );
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_empty_registry_accessors() {
        let registry = ConnectionRegistry::new();

        assert_eq!(registry.len(), 0);
        assert!(registry.names().is_empty());
        assert_eq!(registry.state("missing"), None);
        assert!(registry.info("missing").is_none());

        // Sweeping an empty registry is a no-op.
        registry.dispose_all().await;
        assert!(registry.is_empty());
    }

    #[test]
    fn test_zero_default_timeout_replaced() {
        let registry =
            ConnectionRegistry::with_defaults(Arc::new(TokioPool::new()), Duration::ZERO);
        assert_eq!(registry.default_accept_timeout, DEFAULT_ACCEPT_TIMEOUT);
    }
}
