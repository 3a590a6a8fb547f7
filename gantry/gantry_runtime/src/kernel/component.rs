//! The capability trait for kernel-managed components.

use async_trait::async_trait;

/// A unit of the container driven through `Base -> Started -> Shutdown`.
///
/// Both hooks default to no-ops, so a passive component can implement the
/// trait with an empty body and still take part in dependency ordering.
///
/// Hooks receive `&self`; a component that mutates state on start owns
/// that state behind its own synchronization.
#[async_trait]
pub trait Component: Send + Sync + 'static {
    /// Bring the component into service.
    async fn start(&self) -> anyhow::Result<()> {
        Ok(())
    }

    /// Take the component out of service.
    ///
    /// Called during shutdown and during startup rollback. Errors are
    /// logged by the kernel and never interrupt the sweep.
    async fn stop(&self) -> anyhow::Result<()> {
        Ok(())
    }
}
