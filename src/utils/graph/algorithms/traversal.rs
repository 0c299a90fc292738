//! Depth-first orderings.
//!
//! [`preorder`] numbers nodes in the order a depth-first search first reaches them,
//! which is the numbering structural analysis works on. Only nodes reachable from
//! `start` are visited, following successors in the order the graph yields them.

use crate::utils::graph::{NodeId, Successors};

/// Returns the reachable nodes in depth-first preorder.
///
/// # Examples
///
/// ```rust
/// use structflow::utils::graph::{algorithms::preorder, AdjacencyGraph, NodeId};
///
/// let mut graph = AdjacencyGraph::new(3);
/// graph.add_edge(NodeId::new(0), NodeId::new(2));
/// graph.add_edge(NodeId::new(2), NodeId::new(1));
/// assert_eq!(preorder(&graph, NodeId::new(0)), vec![NodeId::new(0), NodeId::new(2), NodeId::new(1)]);
/// ```
pub fn preorder<G: Successors>(graph: &G, start: NodeId) -> Vec<NodeId> {
    let node_count = graph.node_count();
    if start.index() >= node_count {
        return Vec::new();
    }

    let mut visited = vec![false; node_count];
    let mut result = Vec::with_capacity(node_count);
    let mut stack = vec![start];

    while let Some(node) = stack.pop() {
        if visited[node.index()] {
            continue;
        }
        visited[node.index()] = true;
        result.push(node);

        let successors: Vec<NodeId> = graph.successors(node).collect();
        for &succ in successors.iter().rev() {
            if !visited[succ.index()] {
                stack.push(succ);
            }
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::graph::AdjacencyGraph;

    fn diamond() -> AdjacencyGraph {
        let mut g = AdjacencyGraph::new(4);
        g.add_edge(NodeId::new(0), NodeId::new(1));
        g.add_edge(NodeId::new(0), NodeId::new(2));
        g.add_edge(NodeId::new(1), NodeId::new(3));
        g.add_edge(NodeId::new(2), NodeId::new(3));
        g
    }

    #[test]
    fn test_preorder_diamond() {
        let order = preorder(&diamond(), NodeId::new(0));
        assert_eq!(
            order,
            vec![NodeId::new(0), NodeId::new(1), NodeId::new(3), NodeId::new(2)]
        );
    }

    #[test]
    fn test_traversal_invalid_start() {
        assert!(preorder(&diamond(), NodeId::new(10)).is_empty());
    }
}
