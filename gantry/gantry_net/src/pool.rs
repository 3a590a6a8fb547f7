//! Worker pool capability and its tokio-backed default implementation.
//!
//! The registry treats pools as a black box: one method submits a task
//! and hands back a cancellable [`TaskHandle`]. [`TokioPool`] is the
//! default implementation, spawning onto the ambient tokio runtime with
//! an optional concurrency bound enforced by a semaphore whose permit is
//! held for the lifetime of each task.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use thiserror::Error;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use gantry_core::id::TaskId;

/// Errors raised when submitting a task to a worker pool.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PoolError {
    /// The pool no longer accepts work.
    #[error("Worker pool is shutting down")]
    ShuttingDown,

    /// The pool is at its concurrency bound.
    #[error("Worker pool is saturated")]
    Saturated,
}

/// A capability for asynchronous task execution.
pub trait WorkerPool: Send + Sync {
    /// Submit a task for asynchronous execution, returning a cancellable
    /// handle.
    fn submit(&self, task: BoxFuture<'static, ()>) -> Result<TaskHandle, PoolError>;
}

/// Cancellable handle for a submitted task.
#[derive(Debug)]
pub struct TaskHandle {
    id: TaskId,
    handle: JoinHandle<()>,
}

impl TaskHandle {
    fn new(handle: JoinHandle<()>) -> Self {
        Self {
            id: TaskId::new(),
            handle,
        }
    }

    /// Identifier of the task behind this handle.
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Request cancellation. The task stops at its next await point.
    pub fn cancel(&self) {
        self.handle.abort();
    }

    /// Whether the task has finished (completed, panicked or cancelled).
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the task to finish. Cancellation and panics are logged
    /// and swallowed; the task is gone either way.
    pub async fn wait(self) {
        let TaskHandle { id, handle } = self;
        match handle.await {
            Ok(()) => {}
            Err(e) if e.is_cancelled() => debug!(task = %id, "task cancelled"),
            Err(e) => warn!(task = %id, error = %e, "task panicked"),
        }
    }

    /// Wait for the task to finish within `timeout`.
    ///
    /// Returns `true` if the task finished in time, `false` if the
    /// timeout elapsed first (the handle stays usable).
    pub async fn wait_timeout(&mut self, timeout: Duration) -> bool {
        match tokio::time::timeout(timeout, &mut self.handle).await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                if e.is_cancelled() {
                    debug!(task = %self.id, "task cancelled");
                } else {
                    warn!(task = %self.id, error = %e, "task panicked");
                }
                true
            }
            Err(_) => false,
        }
    }
}

/// Default worker pool backed by the tokio runtime.
///
/// Unbounded by default; [`TokioPool::bounded`] caps the number of tasks
/// in flight and further submissions fail with [`PoolError::Saturated`]
/// until a running task finishes.
pub struct TokioPool {
    limit: Option<Arc<Semaphore>>,
    shutting_down: AtomicBool,
    submitted: AtomicU64,
}

impl TokioPool {
    /// Create an unbounded pool.
    pub fn new() -> Self {
        Self {
            limit: None,
            shutting_down: AtomicBool::new(false),
            submitted: AtomicU64::new(0),
        }
    }

    /// Create a pool that runs at most `max_tasks` tasks concurrently.
    pub fn bounded(max_tasks: usize) -> Self {
        Self {
            limit: Some(Arc::new(Semaphore::new(max_tasks))),
            shutting_down: AtomicBool::new(false),
            submitted: AtomicU64::new(0),
        }
    }

    /// Stop accepting new work. Tasks already running are unaffected.
    pub fn shutdown(&self) {
        self.shutting_down.store(true, Ordering::Release);
        debug!("worker pool shut down");
    }

    /// Whether the pool has been shut down.
    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::Acquire)
    }

    /// Total number of tasks accepted so far.
    pub fn submitted(&self) -> u64 {
        self.submitted.load(Ordering::Relaxed)
    }

    /// Remaining capacity, if the pool is bounded.
    pub fn available_permits(&self) -> Option<usize> {
        self.limit.as_ref().map(|s| s.available_permits())
    }
}

impl WorkerPool for TokioPool {
    fn submit(&self, task: BoxFuture<'static, ()>) -> Result<TaskHandle, PoolError> {
        if self.shutting_down.load(Ordering::Acquire) {
            return Err(PoolError::ShuttingDown);
        }

        let permit = match &self.limit {
            Some(semaphore) => Some(
                semaphore
                    .clone()
                    .try_acquire_owned()
                    .map_err(|_| PoolError::Saturated)?,
            ),
            None => None,
        };

        self.submitted.fetch_add(1, Ordering::Relaxed);
        let handle = tokio::spawn(async move {
            // Holds the permit until the task is done.
            let _permit: Option<OwnedSemaphorePermit> = permit;
            task.await;
        });
        Ok(TaskHandle::new(handle))
    }
}

impl Default for TokioPool {
    fn default() -> Self {
        Self::new()
    }
}
