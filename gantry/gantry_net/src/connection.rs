//! Registry entries for managed acceptors.
//!
//! A [`Connection`] owns the lifecycle bookkeeping for one named
//! acceptor: its cancellation flag, the handle of its accept-loop task
//! and the handles of handler dispatches still in flight. The listener
//! socket itself lives inside the accept-loop task and is closed when
//! that task ends.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, warn};

use gantry_core::id::ConnectionId;
use gantry_core::types::ConnectionState;

use crate::pool::TaskHandle;

/// Extra time allowed for an accept loop to notice cancellation before
/// its task is aborted.
pub(crate) const DISPOSE_GRACE: Duration = Duration::from_millis(100);

/// Point-in-time snapshot of a registered connection.
#[derive(Debug, Clone)]
pub struct ConnectionInfo {
    /// Identifier minted at registration.
    pub id: ConnectionId,
    /// Registered name.
    pub name: String,
    /// Current lifecycle state.
    pub state: ConnectionState,
    /// Effective accept timeout of the accept loop.
    pub accept_timeout: Duration,
}

/// One managed acceptor.
pub(crate) struct Connection {
    id: ConnectionId,
    name: String,
    state: ConnectionState,
    accept_timeout: Duration,
    cancel: Arc<AtomicBool>,
    acceptor: TaskHandle,
    workers: Arc<Mutex<Vec<TaskHandle>>>,
}

impl Connection {
    pub(crate) fn new(
        id: ConnectionId,
        name: String,
        accept_timeout: Duration,
        cancel: Arc<AtomicBool>,
        acceptor: TaskHandle,
        workers: Arc<Mutex<Vec<TaskHandle>>>,
    ) -> Self {
        Self {
            id,
            name,
            state: ConnectionState::Registered,
            accept_timeout,
            cancel,
            acceptor,
            workers,
        }
    }

    pub(crate) fn state(&self) -> ConnectionState {
        self.state
    }

    pub(crate) fn info(&self) -> ConnectionInfo {
        ConnectionInfo {
            id: self.id,
            name: self.name.clone(),
            state: self.state,
            accept_timeout: self.accept_timeout,
        }
    }

    /// Mark the entry live once its accept loop is on a pool.
    pub(crate) fn mark_running(&mut self) {
        self.set_state(ConnectionState::Running);
    }

    /// Tear the acceptor down.
    ///
    /// Signals cancellation, then waits for the accept loop to exit on
    /// its own within one accept-timeout interval plus grace; if the
    /// budget elapses the loop task is aborted. `force` drops the wait
    /// budget to zero and also aborts handler dispatches still in
    /// flight. Either way the entry ends up `Disposed`.
    pub(crate) async fn dispose(mut self, force: bool) {
        self.cancel.store(true, Ordering::Release);

        let budget = if force {
            Duration::ZERO
        } else {
            self.accept_timeout + DISPOSE_GRACE
        };
        if !self.acceptor.wait_timeout(budget).await {
            debug!(connection = %self.name, "accept loop still running; aborting task");
            self.acceptor.cancel();
            self.acceptor.wait_timeout(DISPOSE_GRACE).await;
        }

        if force {
            let workers = {
                let mut workers = self.workers.lock();
                std::mem::take(&mut *workers)
            };
            for worker in workers {
                if !worker.is_finished() {
                    worker.cancel();
                }
            }
        }

        self.set_state(ConnectionState::Disposed);
        debug!(connection = %self.name, id = %self.id, "connection disposed");
    }

    fn set_state(&mut self, next: ConnectionState) {
        if self.state.can_transition_to(next) {
            debug!(connection = %self.name, from = %self.state, to = %next, "connection state change");
            self.state = next;
        } else {
            warn!(connection = %self.name, from = %self.state, to = %next, "invalid connection state transition ignored");
        }
    }
}
