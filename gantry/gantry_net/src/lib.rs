//! # Gantry Net
//!
//! Lifecycle-managed connection handling for the Gantry container. A
//! [`ConnectionRegistry`] owns a set of named acceptors: each entry pairs
//! an already-bound listener with a [`HandlerFactory`] and a
//! [`WorkerPool`], runs a cancellable accept loop on that pool, and moves
//! through the `Registered -> Running -> Disposed` lifecycle.
//!
//! Teardown is isolated per entry: [`ConnectionRegistry::dispose_all`]
//! sweeps every registered name and an individual failure never stops the
//! sweep. Cancellation is observed within one accept-timeout interval, so
//! disconnect latency is bounded rather than open-ended.

mod acceptor;

pub mod connection;
pub mod handler;
pub mod pool;
pub mod registry;

pub use connection::ConnectionInfo;
pub use handler::{ConnectionHandler, HandlerFactory};
pub use pool::{PoolError, TaskHandle, TokioPool, WorkerPool};
pub use registry::{ConnectionRegistry, RegistryError, DEFAULT_ACCEPT_TIMEOUT};
