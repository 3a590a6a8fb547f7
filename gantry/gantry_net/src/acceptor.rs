//! The accept loop run for every registered connection.
//!
//! One long-lived task per listener: accept with a bounded timeout, check
//! the cancellation flag whenever a timeout elapses, and hand accepted
//! streams to pooled handler tasks. I/O errors other than the timeout are
//! logged and the loop keeps going; only cancellation ends it.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::net::{TcpListener, TcpStream};
use tokio::time;
use tracing::{debug, warn};

use gantry_core::id::ConnectionId;

use crate::handler::HandlerFactory;
use crate::pool::{TaskHandle, WorkerPool};

/// Delay before retrying after a failed accept, so a persistent error
/// cannot spin the loop hot.
const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(100);

/// State owned by one accept-loop task.
pub(crate) struct AcceptLoop {
    name: String,
    id: ConnectionId,
    listener: TcpListener,
    factory: Arc<dyn HandlerFactory>,
    pool: Arc<dyn WorkerPool>,
    cancel: Arc<AtomicBool>,
    workers: Arc<Mutex<Vec<TaskHandle>>>,
    accept_timeout: Duration,
}

impl AcceptLoop {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        name: String,
        id: ConnectionId,
        listener: TcpListener,
        factory: Arc<dyn HandlerFactory>,
        pool: Arc<dyn WorkerPool>,
        cancel: Arc<AtomicBool>,
        workers: Arc<Mutex<Vec<TaskHandle>>>,
        accept_timeout: Duration,
    ) -> Self {
        Self {
            name,
            id,
            listener,
            factory,
            pool,
            cancel,
            workers,
            accept_timeout,
        }
    }

    /// Run until the cancellation flag is observed.
    ///
    /// The only suspension longer than the retry delay is
    /// accept-with-timeout, so cancellation is observed within one
    /// accept-timeout interval.
    pub(crate) async fn run(self) {
        debug!(
            connection = %self.name,
            id = %self.id,
            timeout_ms = self.accept_timeout.as_millis() as u64,
            "accept loop started"
        );

        loop {
            if self.cancel.load(Ordering::Acquire) {
                break;
            }

            match time::timeout(self.accept_timeout, self.listener.accept()).await {
                // Accept timed out; go around and poll the flag.
                Err(_) => continue,
                Ok(Ok((stream, peer))) => {
                    debug!(connection = %self.name, peer = %peer, "connection accepted");
                    self.dispatch(stream, peer).await;
                }
                Ok(Err(e)) => {
                    if self.cancel.load(Ordering::Acquire) {
                        break;
                    }
                    warn!(connection = %self.name, error = %e, "accept failed");
                    time::sleep(ACCEPT_RETRY_DELAY).await;
                }
            }
        }

        debug!(connection = %self.name, id = %self.id, "accept loop stopped");
    }

    /// Obtain a handler for an accepted stream and run it on the pool.
    ///
    /// Factory failures and pool rejections drop this one stream; the
    /// accept loop itself is unaffected.
    async fn dispatch(&self, stream: TcpStream, peer: SocketAddr) {
        let handler = match self.factory.create_handler().await {
            Ok(handler) => handler,
            Err(e) => {
                warn!(
                    connection = %self.name,
                    peer = %peer,
                    error = %e,
                    "handler factory failed; dropping connection"
                );
                return;
            }
        };

        let name = self.name.clone();
        let task = async move {
            if let Err(e) = handler.handle(stream, peer).await {
                debug!(connection = %name, peer = %peer, error = %e, "handler finished with error");
            }
        };

        match self.pool.submit(Box::pin(task)) {
            Ok(handle) => {
                let mut workers = self.workers.lock();
                workers.retain(|w| !w.is_finished());
                workers.push(handle);
            }
            Err(e) => {
                warn!(
                    connection = %self.name,
                    peer = %peer,
                    error = %e,
                    "dispatch rejected; dropping connection"
                );
            }
        }
    }
}
