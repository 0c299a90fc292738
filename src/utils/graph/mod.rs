//! Generic directed graph infrastructure for control-flow analysis.
//!
//! # Key Components
//!
//! - [`NodeId`] - Strongly-typed node identifier
//! - [`GraphBase`], [`Successors`] - Graph abstraction traits
//! - [`AdjacencyGraph`] - Scratch adjacency-list graph
//! - [`algorithms`] - Dominators and depth-first orderings
//!
//! # Usage Examples
//!
//! ```rust
//! use structflow::utils::graph::{algorithms, AdjacencyGraph, NodeId};
//!
//! // Diamond: 0 -> 1, 0 -> 2, 1 -> 3, 2 -> 3
//! let mut graph = AdjacencyGraph::new(4);
//! graph.add_edge(NodeId::new(0), NodeId::new(1));
//! graph.add_edge(NodeId::new(0), NodeId::new(2));
//! graph.add_edge(NodeId::new(1), NodeId::new(3));
//! graph.add_edge(NodeId::new(2), NodeId::new(3));
//!
//! let dom = algorithms::compute_dominators(&graph, NodeId::new(0));
//! assert_eq!(dom.immediate_dominator(NodeId::new(3)), Some(NodeId::new(0)));
//! ```

mod adjacency;
pub mod algorithms;
mod node;
mod traits;

pub use adjacency::AdjacencyGraph;
pub use node::NodeId;
pub use traits::{GraphBase, Successors};
