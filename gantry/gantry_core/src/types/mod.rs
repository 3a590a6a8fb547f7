//! Lifecycle state types shared across the workspace.
//!
//! Each state set is a closed enum with an explicit transition table.
//! Lifecycle-driving code consults the table (`can_transition_to`,
//! `valid_next_states`) rather than probing objects for optional stage
//! interfaces.

pub mod component;
pub mod connection;

pub use component::ComponentState;
pub use connection::ConnectionState;
