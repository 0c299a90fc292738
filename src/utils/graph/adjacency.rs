//! A plain adjacency-list graph.
//!
//! [`AdjacencyGraph`] is the scratch graph used whenever an algorithm needs a dense
//! `NodeId` view of something keyed differently, for example the block graph that
//! structural analysis numbers and computes dominators on.

use crate::utils::graph::{GraphBase, NodeId, Successors};

/// Directed graph stored as successor lists.
#[derive(Debug, Clone, Default)]
pub struct AdjacencyGraph {
    succs: Vec<Vec<NodeId>>,
}

impl AdjacencyGraph {
    /// Creates a graph with `node_count` nodes and no edges.
    #[must_use]
    pub fn new(node_count: usize) -> Self {
        Self {
            succs: vec![Vec::new(); node_count],
        }
    }

    /// Adds the edge `from -> to` unless it already exists.
    ///
    /// Returns `true` if the edge was added.
    pub fn add_edge(&mut self, from: NodeId, to: NodeId) -> bool {
        if self.succs[from.index()].contains(&to) {
            return false;
        }
        self.succs[from.index()].push(to);
        true
    }
}

impl GraphBase for AdjacencyGraph {
    fn node_count(&self) -> usize {
        self.succs.len()
    }
}

impl Successors for AdjacencyGraph {
    fn successors(&self, node: NodeId) -> impl Iterator<Item = NodeId> {
        self.succs[node.index()].iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adjacency_dedup() {
        let mut graph = AdjacencyGraph::new(3);
        assert!(graph.add_edge(NodeId::new(0), NodeId::new(1)));
        assert!(!graph.add_edge(NodeId::new(0), NodeId::new(1)));
        graph.add_edge(NodeId::new(1), NodeId::new(2));
        assert_eq!(
            graph.successors(NodeId::new(1)).collect::<Vec<_>>(),
            vec![NodeId::new(2)]
        );
        assert_eq!(graph.node_count(), 3);
    }
}
