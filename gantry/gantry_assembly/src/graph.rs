//! Dependency graph construction and topological ordering.
//!
//! The graph is an arena of named nodes addressed by [`NodeRef`] handles.
//! Edges record "depends-on" relationships; [`DependencyGraph::sort`]
//! produces the start order (dependencies before dependents) with a
//! Kahn-style traversal over the indegree bookkeeping, and
//! [`DependencyGraph::shutdown_order`] the reverse.

use std::collections::{HashMap, VecDeque};

use thiserror::Error;

use crate::node::{Node, NodeRef};

/// Errors raised while building or sorting a dependency graph.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AssemblyError {
    /// A node with this name is already registered.
    #[error("Duplicate node: {0}")]
    DuplicateNode(String),

    /// The dependency relation contains a cycle through the named node.
    #[error("Cyclic dependency detected at node: {0}")]
    CyclicDependency(String),

    /// A node handle does not address a node in this graph.
    #[error("Unknown node reference: {0}")]
    UnknownNode(NodeRef),
}

/// A dependency graph over named nodes with opaque payloads.
///
/// Sorting is deterministic: among mutually unordered nodes the returned
/// sequence preserves insertion order, so repeated sorts of an unmodified
/// graph always agree.
#[derive(Debug)]
pub struct DependencyGraph<T> {
    nodes: Vec<Node<T>>,
    index: HashMap<String, NodeRef>,
}

impl<T> DependencyGraph<T> {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Register a node under a unique name.
    ///
    /// Fails with [`AssemblyError::DuplicateNode`] if the name is already
    /// present.
    pub fn add_node(&mut self, name: impl Into<String>, payload: T) -> Result<NodeRef, AssemblyError> {
        let name = name.into();
        if self.index.contains_key(&name) {
            return Err(AssemblyError::DuplicateNode(name));
        }

        let node_ref = NodeRef(self.nodes.len());
        self.index.insert(name.clone(), node_ref);
        self.nodes.push(Node::new(name, payload));
        Ok(node_ref)
    }

    /// Record that `from` depends on `to`, i.e. `to` must start first.
    ///
    /// Adding the same edge twice is a no-op (checked by containment), so
    /// indegree counts are never inflated. A self-edge is accepted here
    /// and rejected as a cycle by [`sort`](Self::sort).
    pub fn add_dependency(&mut self, from: NodeRef, to: NodeRef) -> Result<(), AssemblyError> {
        if from.0 >= self.nodes.len() {
            return Err(AssemblyError::UnknownNode(from));
        }
        if to.0 >= self.nodes.len() {
            return Err(AssemblyError::UnknownNode(to));
        }

        if self.nodes[from.0].dependencies.contains(&to) {
            return Ok(());
        }

        self.nodes[from.0].dependencies.push(to);
        let dependency = &mut self.nodes[to.0];
        dependency.indegree += 1;
        dependency.current_indegree += 1;
        Ok(())
    }

    /// Compute the start order: dependencies before dependents.
    ///
    /// The traversal seeds a ready-queue with every node whose
    /// `current_indegree` is zero (no unaccounted dependents), then
    /// repeatedly removes a ready node and accounts for it at each of its
    /// dependencies; a dependency whose count reaches zero becomes ready.
    /// If the traversal covers fewer nodes than the graph holds, a cycle
    /// exists and the sort fails with [`AssemblyError::CyclicDependency`]
    /// naming a node on the cycle; no partial order is returned.
    ///
    /// Counters are restored before traversal, so repeated calls on an
    /// unmodified graph are deterministic without an explicit
    /// [`reset`](Self::reset). On success every node's `order` is its
    /// position in the returned sequence.
    pub fn sort(&mut self) -> Result<Vec<NodeRef>, AssemblyError> {
        self.reset();

        let n = self.nodes.len();
        let mut queue: VecDeque<usize> = VecDeque::new();
        // Seed with nodes that have no dependents. The arena is scanned in
        // reverse so that, once the traversal is reversed below, mutually
        // unordered nodes come out in insertion order.
        for idx in (0..n).rev() {
            if self.nodes[idx].current_indegree == 0 {
                queue.push_back(idx);
            }
        }

        let mut sequence: Vec<usize> = Vec::with_capacity(n);
        let mut traversed = vec![false; n];
        while let Some(idx) = queue.pop_front() {
            traversed[idx] = true;
            sequence.push(idx);

            // Account for this node at each of its dependencies. Edge
            // lists are walked in reverse for the same reason the seed
            // scan is.
            let deps: Vec<usize> = self.nodes[idx].dependencies.iter().rev().map(|r| r.0).collect();
            for dep in deps {
                if self.nodes[dep].account_for_indegree() {
                    queue.push_back(dep);
                }
            }
        }

        if sequence.len() != n {
            return Err(AssemblyError::CyclicDependency(self.cycle_member(&traversed)));
        }

        // The traversal visits dependents first; the start order is its
        // reverse.
        sequence.reverse();
        for (position, &idx) in sequence.iter().enumerate() {
            self.nodes[idx].order = Some(position);
        }
        Ok(sequence.into_iter().map(NodeRef).collect())
    }

    /// Compute the teardown order: dependents before dependencies.
    ///
    /// This is the reverse of [`sort`](Self::sort) and shares its failure
    /// semantics.
    pub fn shutdown_order(&mut self) -> Result<Vec<NodeRef>, AssemblyError> {
        let mut order = self.sort()?;
        order.reverse();
        Ok(order)
    }

    /// Restore `current_indegree` from `indegree` and clear assigned
    /// orders, allowing repeated sorts after graph mutation.
    pub fn reset(&mut self) {
        for node in &mut self.nodes {
            node.reset();
        }
    }

    /// Look up the handle for a node name.
    pub fn node_ref(&self, name: &str) -> Option<NodeRef> {
        self.index.get(name).copied()
    }

    /// Name of the node behind a handle.
    pub fn name(&self, node: NodeRef) -> Option<&str> {
        self.nodes.get(node.0).map(|n| n.name.as_str())
    }

    /// Payload of the node behind a handle.
    pub fn payload(&self, node: NodeRef) -> Option<&T> {
        self.nodes.get(node.0).map(|n| &n.payload)
    }

    /// Mutable payload of the node behind a handle.
    pub fn payload_mut(&mut self, node: NodeRef) -> Option<&mut T> {
        self.nodes.get_mut(node.0).map(|n| &mut n.payload)
    }

    /// Declared dependencies of a node, in edge-insertion order.
    pub fn dependencies(&self, node: NodeRef) -> Option<&[NodeRef]> {
        self.nodes.get(node.0).map(|n| n.dependencies.as_slice())
    }

    /// Position assigned by the most recent successful sort, if any.
    pub fn order(&self, node: NodeRef) -> Option<usize> {
        self.nodes.get(node.0).and_then(|n| n.order)
    }

    /// Number of registered nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Pick a node that lies on a cycle, given an incomplete traversal.
    ///
    /// Every node left out of the traversal still has an unaccounted
    /// dependent, and that dependent was left out too. Walking dependents
    /// inside the untraversed set therefore never gets stuck, and the
    /// first node the walk revisits closes a loop in the dependency
    /// relation.
    fn cycle_member(&self, traversed: &[bool]) -> String {
        let n = self.nodes.len();
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); n];
        for (idx, node) in self.nodes.iter().enumerate() {
            if traversed[idx] {
                continue;
            }
            for dep in &node.dependencies {
                if !traversed[dep.0] {
                    dependents[dep.0].push(idx);
                }
            }
        }

        let mut current = (0..n).find(|&i| !traversed[i]).unwrap_or(0);
        let mut seen = vec![false; n];
        loop {
            if seen[current] {
                return self.nodes[current].name.clone();
            }
            seen[current] = true;
            match dependents[current].first() {
                Some(&next) => current = next,
                None => return self.nodes[current].name.clone(),
            }
        }
    }
}

impl<T> Default for DependencyGraph<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Positions of the given handles in a sorted sequence.
    fn position(order: &[NodeRef], node: NodeRef) -> usize {
        order
            .iter()
            .position(|&r| r == node)
            .expect("node missing from order")
    }

    #[test]
    fn test_empty_graph_sorts_to_empty() {
        let mut graph: DependencyGraph<()> = DependencyGraph::new();
        assert!(graph.is_empty());
        assert_eq!(graph.sort().unwrap(), vec![]);
    }

    #[test]
    fn test_single_node() {
        let mut graph = DependencyGraph::new();
        let only = graph.add_node("only", ()).unwrap();
        assert_eq!(graph.sort().unwrap(), vec![only]);
        assert_eq!(graph.order(only), Some(0));
    }

    #[test]
    fn test_chain_sorts_dependencies_first() {
        // a depends on b depends on c: start order is [c, b, a].
        let mut graph = DependencyGraph::new();
        let a = graph.add_node("a", ()).unwrap();
        let b = graph.add_node("b", ()).unwrap();
        let c = graph.add_node("c", ()).unwrap();
        graph.add_dependency(a, b).unwrap();
        graph.add_dependency(b, c).unwrap();

        let order = graph.sort().unwrap();
        assert_eq!(order, vec![c, b, a]);
        assert_eq!(graph.order(c), Some(0));
        assert_eq!(graph.order(b), Some(1));
        assert_eq!(graph.order(a), Some(2));

        assert_eq!(graph.shutdown_order().unwrap(), vec![a, b, c]);
    }

    #[test]
    fn test_diamond_orders_every_edge() {
        let mut graph = DependencyGraph::new();
        let a = graph.add_node("a", ()).unwrap();
        let b = graph.add_node("b", ()).unwrap();
        let c = graph.add_node("c", ()).unwrap();
        let d = graph.add_node("d", ()).unwrap();
        graph.add_dependency(a, b).unwrap();
        graph.add_dependency(a, c).unwrap();
        graph.add_dependency(b, d).unwrap();
        graph.add_dependency(c, d).unwrap();

        let order = graph.sort().unwrap();
        assert_eq!(order, vec![d, b, c, a]);

        // Every dependency sorts before its dependent.
        assert!(position(&order, d) < position(&order, b));
        assert!(position(&order, d) < position(&order, c));
        assert!(position(&order, b) < position(&order, a));
        assert!(position(&order, c) < position(&order, a));

        assert_eq!(graph.shutdown_order().unwrap(), vec![a, c, b, d]);
    }

    #[test]
    fn test_independent_nodes_keep_insertion_order() {
        let mut graph = DependencyGraph::new();
        let x = graph.add_node("x", ()).unwrap();
        let y = graph.add_node("y", ()).unwrap();
        let z = graph.add_node("z", ()).unwrap();

        assert_eq!(graph.sort().unwrap(), vec![x, y, z]);
    }

    #[test]
    fn test_duplicate_node_rejected() {
        let mut graph = DependencyGraph::new();
        graph.add_node("a", ()).unwrap();
        let err = graph.add_node("a", ()).unwrap_err();
        assert_eq!(err, AssemblyError::DuplicateNode("a".to_string()));
        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn test_duplicate_edge_is_noop() {
        let mut graph = DependencyGraph::new();
        let a = graph.add_node("a", ()).unwrap();
        let b = graph.add_node("b", ()).unwrap();
        graph.add_dependency(a, b).unwrap();
        graph.add_dependency(a, b).unwrap();

        assert_eq!(graph.dependencies(a).unwrap(), &[b]);
        // A double-counted indegree would strand b and report a cycle.
        assert_eq!(graph.sort().unwrap(), vec![b, a]);
    }

    #[test]
    fn test_self_dependency_rejected_at_sort() {
        let mut graph = DependencyGraph::new();
        let s = graph.add_node("s", ()).unwrap();
        // Structurally permitted...
        graph.add_dependency(s, s).unwrap();

        // ...but a cycle once sorted.
        match graph.sort() {
            Err(AssemblyError::CyclicDependency(name)) => assert_eq!(name, "s"),
            other => panic!("expected cycle error, got {:?}", other),
        }
    }

    #[test]
    fn test_two_node_cycle_detected() {
        let mut graph = DependencyGraph::new();
        let a = graph.add_node("a", ()).unwrap();
        let b = graph.add_node("b", ()).unwrap();
        graph.add_dependency(a, b).unwrap();
        graph.add_dependency(b, a).unwrap();

        match graph.sort() {
            Err(AssemblyError::CyclicDependency(name)) => {
                assert!(name == "a" || name == "b", "unexpected node: {}", name);
            }
            other => panic!("expected cycle error, got {:?}", other),
        }
    }

    #[test]
    fn test_cycle_error_names_a_node_on_the_cycle() {
        // "base" is depended on by the cycle but not part of it; the
        // error must not name it.
        let mut graph = DependencyGraph::new();
        let base = graph.add_node("base", ()).unwrap();
        let looper1 = graph.add_node("looper1", ()).unwrap();
        let looper2 = graph.add_node("looper2", ()).unwrap();
        graph.add_dependency(looper1, looper2).unwrap();
        graph.add_dependency(looper1, base).unwrap();
        graph.add_dependency(looper2, looper1).unwrap();

        match graph.sort() {
            Err(AssemblyError::CyclicDependency(name)) => {
                assert!(
                    name == "looper1" || name == "looper2",
                    "named a node outside the cycle: {}",
                    name
                );
            }
            other => panic!("expected cycle error, got {:?}", other),
        }
    }

    #[test]
    fn test_failed_sort_assigns_no_order() {
        let mut graph = DependencyGraph::new();
        let a = graph.add_node("a", ()).unwrap();
        let b = graph.add_node("b", ()).unwrap();
        graph.add_dependency(a, b).unwrap();
        graph.add_dependency(b, a).unwrap();

        assert!(graph.sort().is_err());
        assert_eq!(graph.order(a), None);
        assert_eq!(graph.order(b), None);
    }

    #[test]
    fn test_repeated_sorts_are_deterministic() {
        let mut graph = DependencyGraph::new();
        let a = graph.add_node("a", ()).unwrap();
        let b = graph.add_node("b", ()).unwrap();
        let c = graph.add_node("c", ()).unwrap();
        graph.add_dependency(a, b).unwrap();
        graph.add_dependency(b, c).unwrap();

        let first = graph.sort().unwrap();
        let second = graph.sort().unwrap();
        assert_eq!(first, second);

        graph.reset();
        let third = graph.sort().unwrap();
        assert_eq!(first, third);
    }

    #[test]
    fn test_sort_after_mutation() {
        let mut graph = DependencyGraph::new();
        let a = graph.add_node("a", ()).unwrap();
        let b = graph.add_node("b", ()).unwrap();
        let c = graph.add_node("c", ()).unwrap();
        graph.add_dependency(a, b).unwrap();
        graph.add_dependency(b, c).unwrap();
        assert_eq!(graph.sort().unwrap(), vec![c, b, a]);

        let d = graph.add_node("d", ()).unwrap();
        graph.add_dependency(c, d).unwrap();
        assert_eq!(graph.sort().unwrap(), vec![d, c, b, a]);
    }

    #[test]
    fn test_unknown_node_ref_rejected() {
        let mut graph = DependencyGraph::new();
        let a = graph.add_node("a", ()).unwrap();
        let stale = NodeRef(99);

        assert_eq!(
            graph.add_dependency(a, stale),
            Err(AssemblyError::UnknownNode(stale))
        );
        assert_eq!(
            graph.add_dependency(stale, a),
            Err(AssemblyError::UnknownNode(stale))
        );
        assert_eq!(graph.dependencies(a).unwrap(), &[]);
    }

    #[test]
    fn test_name_and_payload_access() {
        let mut graph = DependencyGraph::new();
        let a = graph.add_node("a", 7u32).unwrap();

        assert_eq!(graph.node_ref("a"), Some(a));
        assert_eq!(graph.node_ref("missing"), None);
        assert_eq!(graph.name(a), Some("a"));
        assert_eq!(graph.payload(a), Some(&7));

        if let Some(p) = graph.payload_mut(a) {
            *p = 9;
        }
        assert_eq!(graph.payload(a), Some(&9));
    }

    #[test]
    fn test_reset_clears_order() {
        let mut graph = DependencyGraph::new();
        let a = graph.add_node("a", ()).unwrap();
        graph.sort().unwrap();
        assert_eq!(graph.order(a), Some(0));

        graph.reset();
        assert_eq!(graph.order(a), None);
    }
}
