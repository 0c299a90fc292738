//! Trait definitions for graph abstractions.
//!
//! Algorithms in [`crate::utils::graph::algorithms`] are written against these traits so
//! they can run over any dense `NodeId` graph.

use crate::utils::graph::NodeId;

/// Core graph properties.
pub trait GraphBase {
    /// Returns the number of nodes. Node ids range over `0..node_count()`.
    fn node_count(&self) -> usize;
}

/// Outgoing edge traversal.
pub trait Successors: GraphBase {
    /// Iterates the successors of `node`.
    fn successors(&self, node: NodeId) -> impl Iterator<Item = NodeId>;
}
