//! Connection lifecycle states.
//!
//! A managed acceptor is `Registered` while its entry is being
//! constructed, `Running` once its accept loop has been submitted to a
//! worker pool, and `Disposed` after disconnection. `Disposed` is
//! terminal; a disposed name can only be reused by registering a fresh
//! connection.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Connection state in the lifecycle.
///
/// # Examples
///
/// ```
/// use gantry_core::types::ConnectionState;
///
/// let state = ConnectionState::Registered;
/// assert!(state.can_transition_to(ConnectionState::Running));
/// assert!(!state.can_transition_to(ConnectionState::Disposed));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionState {
    /// Connection is registered but its accept loop is not yet running.
    Registered,

    /// Accept loop is running on a worker pool.
    Running,

    /// Connection has been disconnected. Terminal.
    Disposed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Registered => write!(f, "Registered"),
            Self::Running => write!(f, "Running"),
            Self::Disposed => write!(f, "Disposed"),
        }
    }
}

impl ConnectionState {
    /// Check if this state represents a live acceptor.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Running)
    }

    /// Check if this state is terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Disposed)
    }

    /// Get the valid next states from this state.
    pub fn valid_next_states(&self) -> Vec<ConnectionState> {
        match self {
            Self::Registered => vec![Self::Running],
            Self::Running => vec![Self::Disposed],
            Self::Disposed => vec![],
        }
    }

    /// Check if a transition to the given state is valid.
    pub fn can_transition_to(&self, next: ConnectionState) -> bool {
        self.valid_next_states().contains(&next)
    }
}
