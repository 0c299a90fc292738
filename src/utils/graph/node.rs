//! Dense node handles for the scratch graphs of structural analysis.

use std::fmt;

/// Position of a node in an [`crate::utils::graph::AdjacencyGraph`].
///
/// Structural analysis maps block numbers one-to-one onto node ids, so a graph over a
/// CFG with number bound `n` uses ids `0..n` whether or not every number is live.
///
/// ```rust
/// use structflow::utils::graph::NodeId;
///
/// assert_eq!(NodeId::new(5).index(), 5);
/// assert_eq!(format!("{:?}", NodeId::new(5)), "n5");
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct NodeId(usize);

impl NodeId {
    /// Wraps a block number or preorder index.
    #[must_use]
    pub const fn new(index: usize) -> Self {
        NodeId(index)
    }

    /// Returns the wrapped index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}
