//! # Gantry Assembly
//!
//! Dependency-ordered assembly for the Gantry container: given a set of
//! named nodes and pairwise "depends-on" edges, [`DependencyGraph`]
//! produces a deterministic start order (dependencies before dependents)
//! and the reverse order for shutdown.
//!
//! Nodes live in an arena and are addressed by copyable [`NodeRef`]
//! handles; dependency edges are stored as index lists. This keeps the
//! graph free of shared mutable references and makes resetting the sort
//! bookkeeping a single pass over the arena.
//!
//! # Examples
//!
//! ```
//! use gantry_assembly::DependencyGraph;
//!
//! let mut graph = DependencyGraph::new();
//! let store = graph.add_node("store", ()).unwrap();
//! let api = graph.add_node("api", ()).unwrap();
//!
//! // The API server depends on the store, so the store starts first.
//! graph.add_dependency(api, store).unwrap();
//!
//! let order = graph.sort().unwrap();
//! assert_eq!(order, vec![store, api]);
//!
//! let teardown = graph.shutdown_order().unwrap();
//! assert_eq!(teardown, vec![api, store]);
//! ```

pub mod graph;
pub mod node;

pub use graph::{AssemblyError, DependencyGraph};
pub use node::NodeRef;
