//! # Gantry Core
//!
//! `gantry_core` provides the shared building blocks for the Gantry
//! component container: strongly-typed identifiers and the closed lifecycle
//! state sets that every other crate in the workspace agrees on.
//!
//! ## Design
//!
//! The container deliberately avoids reflective lifecycle dispatch. A
//! component or connection is always in exactly one state drawn from a
//! closed `enum`, and every legal transition is written down in that enum's
//! transition table. Code that drives a lifecycle asks the state what comes
//! next (`valid_next_states`, `can_transition_to`) instead of probing the
//! object for optional interfaces at runtime.
//!
//! ## Crate Structure
//!
//! - **id**: Strongly-typed identifier types
//! - **types**: Lifecycle state enums shared across the workspace

pub mod id;
pub mod types;

// Re-export key types for convenience
pub use id::{ComponentId, ConnectionId, TaskId};
pub use types::{ComponentState, ConnectionState};
