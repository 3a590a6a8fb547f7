//! The component kernel.
//!
//! Components register by name with the names of the components they
//! depend on. [`Kernel::startup`] computes a dependency order through
//! [`gantry_assembly`] and drives each component `Base -> Started`,
//! rolling the batch back in reverse if any start hook fails.
//! [`Kernel::shutdown`] walks the same order backwards and never stops
//! early: a failing stop hook is logged and the sweep continues.

pub mod component;
pub mod entry;

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use gantry_assembly::{AssemblyError, DependencyGraph};
use gantry_core::id::ComponentId;
use gantry_core::types::ComponentState;

use self::component::Component;
use self::entry::ComponentEntry;

/// Errors raised by kernel operations.
#[derive(Debug, Error)]
pub enum KernelError {
    /// A component with this name is already registered.
    #[error("Duplicate component: {0}")]
    DuplicateComponent(String),

    /// A component names a dependency nobody registered.
    #[error("Component {component} depends on unknown component {dependency}")]
    UnknownDependency {
        component: String,
        dependency: String,
    },

    /// The dependency relation admits no start order.
    #[error("Dependency cycle: {0}")]
    DependencyCycle(#[from] AssemblyError),

    /// A start hook failed. Components started earlier in the same call
    /// have been stopped again.
    #[error("Component {name} failed to start")]
    StartupFailed {
        name: String,
        #[source]
        source: anyhow::Error,
    },
}

struct KernelInner {
    entries: HashMap<String, ComponentEntry>,
    /// Registration order; the tie-break for mutually unordered components.
    insertion_order: Vec<String>,
}

/// Registry of components plus the lifecycle machinery that starts and
/// stops them in dependency order.
///
/// All operations serialize on one lock, so at most one startup or
/// shutdown sweep runs at a time.
pub struct Kernel {
    inner: RwLock<KernelInner>,
}

impl Kernel {
    /// Create an empty kernel.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(KernelInner {
                entries: HashMap::new(),
                insertion_order: Vec::new(),
            }),
        }
    }

    /// Register a component under a unique name.
    ///
    /// Dependencies are declared by name and may be registered later;
    /// they are resolved when [`startup`](Self::startup) runs.
    pub async fn add_component(
        &self,
        name: impl Into<String>,
        component: Arc<dyn Component>,
        depends_on: &[&str],
    ) -> Result<ComponentId, KernelError> {
        let name = name.into();
        let mut inner = self.inner.write().await;
        if inner.entries.contains_key(&name) {
            return Err(KernelError::DuplicateComponent(name));
        }

        let id = ComponentId::new();
        let depends_on: Vec<String> = depends_on.iter().map(|dep| dep.to_string()).collect();
        debug!(
            component = %name,
            id = %id,
            dependencies = depends_on.len(),
            "component registered"
        );
        inner.insertion_order.push(name.clone());
        inner
            .entries
            .insert(name.clone(), ComponentEntry::new(id, name, component, depends_on));
        Ok(id)
    }

    /// Start every registered component, dependencies first.
    ///
    /// Components already `Started` are skipped, so a second call after a
    /// partial registration round only starts the newcomers. If a start
    /// hook fails, the failing component is marked `Failed`, everything
    /// started by this call is stopped again in reverse order, and the
    /// error names the component that refused.
    pub async fn startup(&self) -> Result<(), KernelError> {
        let mut inner = self.inner.write().await;
        let order = Self::start_order(&inner)?;
        info!(components = order.len(), "starting components");

        let mut started: Vec<String> = Vec::new();
        for name in &order {
            let (state, component) = match inner.entries.get(name) {
                Some(entry) => (entry.state(), entry.component()),
                None => continue,
            };
            match state {
                ComponentState::Base => {}
                ComponentState::Started => continue,
                ComponentState::Failed | ComponentState::Shutdown => {
                    debug!(component = %name, state = %state, "not startable; skipping");
                    continue;
                }
            }

            debug!(component = %name, "starting component");
            match component.start().await {
                Ok(()) => {
                    if let Some(entry) = inner.entries.get_mut(name) {
                        entry.set_state(ComponentState::Started);
                    }
                    info!(component = %name, "component started");
                    started.push(name.clone());
                }
                Err(source) => {
                    if let Some(entry) = inner.entries.get_mut(name) {
                        entry.set_state(ComponentState::Failed);
                    }
                    error!(
                        component = %name,
                        error = %source,
                        "component failed to start; rolling back"
                    );
                    Self::roll_back(&mut inner, &started).await;
                    return Err(KernelError::StartupFailed {
                        name: name.clone(),
                        source,
                    });
                }
            }
        }
        Ok(())
    }

    /// Stop every started component, dependents first.
    ///
    /// The sweep is total: a failing stop hook is logged and the walk
    /// moves on to the next component.
    pub async fn shutdown(&self) -> Result<(), KernelError> {
        let mut inner = self.inner.write().await;
        let order = match Self::start_order(&inner) {
            Ok(order) => order,
            Err(e) => {
                warn!(
                    error = %e,
                    "dependency order unavailable; stopping in reverse registration order"
                );
                inner.insertion_order.clone()
            }
        };
        info!(components = order.len(), "stopping components");

        for name in order.iter().rev() {
            let (state, component) = match inner.entries.get(name) {
                Some(entry) => (entry.state(), entry.component()),
                None => continue,
            };
            if state != ComponentState::Started {
                continue;
            }

            debug!(component = %name, "stopping component");
            if let Err(e) = component.stop().await {
                warn!(component = %name, error = %e, "component stop failed; continuing");
            }
            if let Some(entry) = inner.entries.get_mut(name) {
                entry.set_state(ComponentState::Shutdown);
            }
            info!(component = %name, "component stopped");
        }
        Ok(())
    }

    /// Current lifecycle state of a component.
    pub async fn state(&self, name: &str) -> Option<ComponentState> {
        self.inner.read().await.entries.get(name).map(|e| e.state())
    }

    /// Registered component names in registration order.
    pub async fn names(&self) -> Vec<String> {
        self.inner.read().await.insertion_order.clone()
    }

    /// Number of registered components.
    pub async fn len(&self) -> usize {
        self.inner.read().await.entries.len()
    }

    /// Whether no components are registered.
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.entries.is_empty()
    }

    /// Stop the given components in reverse start order, marking each
    /// `Shutdown`.
    async fn roll_back(inner: &mut KernelInner, started: &[String]) {
        for name in started.iter().rev() {
            let component = match inner.entries.get(name) {
                Some(entry) => entry.component(),
                None => continue,
            };
            if let Err(e) = component.stop().await {
                warn!(component = %name, error = %e, "rollback stop failed");
            }
            if let Some(entry) = inner.entries.get_mut(name) {
                entry.set_state(ComponentState::Shutdown);
            }
        }
    }

    /// Resolve declared dependency names and compute the start order.
    fn start_order(inner: &KernelInner) -> Result<Vec<String>, KernelError> {
        let mut graph: DependencyGraph<()> = DependencyGraph::new();
        for name in &inner.insertion_order {
            graph.add_node(name.clone(), ())?;
        }
        for name in &inner.insertion_order {
            let entry = match inner.entries.get(name) {
                Some(entry) => entry,
                None => continue,
            };
            let from = match graph.node_ref(name) {
                Some(node) => node,
                None => continue,
            };
            for dep in entry.depends_on() {
                let to = graph
                    .node_ref(dep)
                    .ok_or_else(|| KernelError::UnknownDependency {
                        component: name.clone(),
                        dependency: dep.clone(),
                    })?;
                graph.add_dependency(from, to)?;
            }
        }

        let order = graph.sort()?;
        Ok(order
            .iter()
            .filter_map(|node| graph.name(*node).map(String::from))
            .collect())
    }
}

impl Default for Kernel {
    fn default() -> Self {
        Self::new()
    }
}
