//! Bookkeeping for a single registered component.

use std::sync::Arc;

use tracing::{debug, warn};

use gantry_core::id::ComponentId;
use gantry_core::types::ComponentState;

use super::component::Component;

/// A component as the kernel tracks it: identity, declared dependencies
/// and current lifecycle state.
pub struct ComponentEntry {
    id: ComponentId,
    name: String,
    depends_on: Vec<String>,
    state: ComponentState,
    component: Arc<dyn Component>,
}

impl ComponentEntry {
    pub(crate) fn new(
        id: ComponentId,
        name: String,
        component: Arc<dyn Component>,
        depends_on: Vec<String>,
    ) -> Self {
        Self {
            id,
            name,
            depends_on,
            state: ComponentState::Base,
            component,
        }
    }

    pub fn id(&self) -> ComponentId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Names of the components this entry requires, in declaration order.
    pub fn depends_on(&self) -> &[String] {
        &self.depends_on
    }

    pub fn state(&self) -> ComponentState {
        self.state
    }

    pub(crate) fn component(&self) -> Arc<dyn Component> {
        self.component.clone()
    }

    /// Apply a lifecycle transition, ignoring ones the state machine
    /// does not allow.
    pub(crate) fn set_state(&mut self, next: ComponentState) {
        if self.state.can_transition_to(next) {
            debug!(
                component = %self.name,
                from = %self.state,
                to = %next,
                "component state change"
            );
            self.state = next;
        } else {
            warn!(
                component = %self.name,
                from = %self.state,
                to = %next,
                "invalid component state transition ignored"
            );
        }
    }
}

impl std::fmt::Debug for ComponentEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentEntry")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("depends_on", &self.depends_on)
            .field("state", &self.state)
            .finish()
    }
}
