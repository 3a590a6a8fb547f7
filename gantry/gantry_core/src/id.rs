//! Strongly-typed identifiers for the Gantry container.
//!
//! This module provides the identifier types used throughout the
//! container, ensuring type safety and clear semantics. Each identifier
//! type is a thin wrapper around a UUID with a phantom type parameter so
//! that identifiers for different entity kinds cannot be mixed up.
//!
//! A fresh identifier is minted for every registration, so two
//! registrations under the same name (for example a connection that is
//! disposed and then re-registered) are distinguishable in logs.
//!
//! # Examples
//!
//! ```
//! use gantry_core::id::{ComponentId, ConnectionId};
//! use std::str::FromStr;
//!
//! // Create new random IDs
//! let component_id = ComponentId::new();
//! let connection_id = ConnectionId::new();
//! assert_ne!(component_id.to_string(), connection_id.to_string());
//!
//! // Create from string
//! let id_str = "550e8400-e29b-41d4-a716-446655440000";
//! let connection_id = ConnectionId::from_str(id_str).unwrap();
//! assert_eq!(connection_id.to_string(), id_str);
//! ```

use serde::{Deserialize, Serialize};
use std::cmp::{Ord, PartialOrd};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// A type-safe identifier based on UUID.
///
/// This is a generic identifier type that is specialized for different
/// entity types using the phantom type parameter `T`. This ensures that
/// identifiers for different entity types cannot be mixed up, even though
/// they share the same underlying UUID structure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct Id<T> {
    uuid: Uuid,
    #[serde(skip)]
    _marker: std::marker::PhantomData<T>,
}

impl<T> Id<T> {
    /// Create a new random identifier.
    ///
    /// # Examples
    ///
    /// ```
    /// use gantry_core::id::ConnectionId;
    ///
    /// let id = ConnectionId::new();
    /// assert!(!id.is_nil());
    /// ```
    pub fn new() -> Self {
        Self {
            uuid: Uuid::new_v4(),
            _marker: std::marker::PhantomData,
        }
    }

    /// Create an identifier from a specific UUID.
    ///
    /// # Examples
    ///
    /// ```
    /// use gantry_core::id::ConnectionId;
    /// use uuid::Uuid;
    ///
    /// let uuid = Uuid::new_v4();
    /// let id = ConnectionId::from_uuid(uuid);
    /// assert_eq!(id.uuid(), uuid);
    /// ```
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self {
            uuid,
            _marker: std::marker::PhantomData,
        }
    }

    /// Get the underlying UUID.
    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    /// Create a nil (all-zeroes) identifier.
    ///
    /// Useful as a placeholder where an identifier is required but no
    /// entity exists yet.
    pub fn nil() -> Self {
        Self {
            uuid: Uuid::nil(),
            _marker: std::marker::PhantomData,
        }
    }

    /// Check whether this is the nil identifier.
    pub fn is_nil(&self) -> bool {
        self.uuid.is_nil()
    }
}

impl<T> Default for Id<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.uuid)
    }
}

impl<T> FromStr for Id<T> {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self {
            uuid: Uuid::parse_str(s)?,
            _marker: std::marker::PhantomData,
        })
    }
}

/// Marker type for connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionMarker;
/// Identifier for a managed connection (one registered acceptor).
pub type ConnectionId = Id<ConnectionMarker>;

/// Marker type for components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ComponentMarker;
/// Identifier for a component registered with the kernel.
pub type ComponentId = Id<ComponentMarker>;

/// Marker type for pooled tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskMarker;
/// Identifier for a task submitted to a worker pool.
pub type TaskId = Id<TaskMarker>;
