//! Connection handler capabilities.
//!
//! The registry never interprets traffic itself. Each accepted stream is
//! given to a handler produced by the [`HandlerFactory`] registered with
//! the connection, and the handler runs to completion on a worker pool.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::net::TcpStream;

/// Handles a single accepted connection.
#[async_trait]
pub trait ConnectionHandler: Send + Sync + 'static {
    /// Process one accepted stream until the exchange is over.
    ///
    /// Errors are connection-local: the dispatcher logs them and drops
    /// the stream, nothing propagates to the registry.
    async fn handle(&self, stream: TcpStream, peer: SocketAddr) -> io::Result<()>;
}

/// Produces a handler for each accepted connection.
#[async_trait]
pub trait HandlerFactory: Send + Sync + 'static {
    /// Create the handler for the next accepted connection.
    async fn create_handler(&self) -> anyhow::Result<Arc<dyn ConnectionHandler>>;
}
