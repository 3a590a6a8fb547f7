//! Component lifecycle states.
//!
//! A component registered with the kernel moves along a single path:
//! `Base` when registered, `Started` once its start hook has completed,
//! `Shutdown` once its stop hook has run. `Failed` is entered when a start
//! hook errors and can only proceed to `Shutdown`. No transition skips a
//! state.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Component state in the lifecycle.
///
/// # Examples
///
/// ```
/// use gantry_core::types::ComponentState;
///
/// let state = ComponentState::Base;
/// assert!(state.can_transition_to(ComponentState::Started));
/// assert!(!state.can_transition_to(ComponentState::Shutdown));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComponentState {
    /// Component is registered but not yet started.
    Base,

    /// Component has started successfully and is in service.
    Started,

    /// Component failed to start.
    Failed,

    /// Component has been stopped. Terminal.
    Shutdown,
}

impl fmt::Display for ComponentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Base => write!(f, "Base"),
            Self::Started => write!(f, "Started"),
            Self::Failed => write!(f, "Failed"),
            Self::Shutdown => write!(f, "Shutdown"),
        }
    }
}

impl ComponentState {
    /// Check if this state represents a component that is in service.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Started)
    }

    /// Check if this state is terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Shutdown)
    }

    /// Get the valid next states from this state.
    pub fn valid_next_states(&self) -> Vec<ComponentState> {
        match self {
            Self::Base => vec![Self::Started, Self::Failed],
            Self::Started => vec![Self::Shutdown, Self::Failed],
            Self::Failed => vec![Self::Shutdown],
            Self::Shutdown => vec![],
        }
    }

    /// Check if a transition to the given state is valid.
    pub fn can_transition_to(&self, next: ComponentState) -> bool {
        self.valid_next_states().contains(&next)
    }
}
