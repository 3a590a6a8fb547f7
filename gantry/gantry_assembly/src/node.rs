//! Arena nodes for the dependency graph.
//!
//! A node records its outgoing "depends-on" edges as [`NodeRef`] index
//! lists together with the indegree bookkeeping used by the sort: the
//! fixed `indegree` counts registered dependents, `current_indegree` is
//! counted down as dependents are accounted for during a traversal.

use std::fmt;

/// Copyable handle addressing a node in a [`DependencyGraph`] arena.
///
/// Handles are issued by `add_node` and stay valid for the life of the
/// graph; nodes are never removed.
///
/// [`DependencyGraph`]: crate::graph::DependencyGraph
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeRef(pub(crate) usize);

impl NodeRef {
    /// Position of the node in the arena (insertion order).
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// One arena slot: a named payload plus its dependency edges and sort
/// bookkeeping.
#[derive(Debug, Clone)]
pub(crate) struct Node<T> {
    /// Unique name of the node.
    pub(crate) name: String,

    /// Caller-supplied payload.
    pub(crate) payload: T,

    /// Nodes this node depends on, in edge-insertion order, deduplicated.
    pub(crate) dependencies: Vec<NodeRef>,

    /// Number of registered dependents. Fixed by edge insertion.
    pub(crate) indegree: usize,

    /// Dependents not yet accounted for in the current traversal.
    pub(crate) current_indegree: usize,

    /// Position in the most recent start order, if sorted.
    pub(crate) order: Option<usize>,
}

impl<T> Node<T> {
    pub(crate) fn new(name: String, payload: T) -> Self {
        Self {
            name,
            payload,
            dependencies: Vec::new(),
            indegree: 0,
            current_indegree: 0,
            order: None,
        }
    }

    /// Account for one dependent having been ordered.
    ///
    /// Returns `true` if the node has no unaccounted dependents left and
    /// is now ready to be ordered itself.
    pub(crate) fn account_for_indegree(&mut self) -> bool {
        self.current_indegree = self.current_indegree.saturating_sub(1);
        self.current_indegree == 0
    }

    /// Restore the traversal bookkeeping to its post-construction state.
    pub(crate) fn reset(&mut self) {
        self.current_indegree = self.indegree;
        self.order = None;
    }
}
