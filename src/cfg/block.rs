//! Basic blocks.

use crate::{cfg::EdgeKind, ir::Node};

/// A basic block: a statement sequence plus its CFG edges.
///
/// Edges are stored on both endpoints. [`crate::cfg::Cfg`] keeps the two sides in sync;
/// blocks are never edited directly by the analyses.
#[derive(Debug, Clone)]
pub struct Block {
    pub(crate) number: usize,
    pub(crate) statements: Vec<Node>,
    pub(crate) frequency: u32,
    pub(crate) successors: Vec<(usize, EdgeKind)>,
    pub(crate) predecessors: Vec<(usize, EdgeKind)>,
}

impl Block {
    pub(crate) fn new(number: usize, statements: Vec<Node>) -> Self {
        Self {
            number,
            statements,
            frequency: 1,
            successors: Vec::new(),
            predecessors: Vec::new(),
        }
    }

    /// Returns the block number.
    #[must_use]
    pub const fn number(&self) -> usize {
        self.number
    }

    /// Returns the statements in execution order.
    #[must_use]
    pub fn statements(&self) -> &[Node] {
        &self.statements
    }

    /// Returns the profiled execution frequency.
    #[must_use]
    pub const fn frequency(&self) -> u32 {
        self.frequency
    }

    /// Iterates the successors reached through edges of `kind`.
    pub fn successors(&self, kind: EdgeKind) -> impl Iterator<Item = usize> + '_ {
        self.successors
            .iter()
            .filter(move |(_, k)| *k == kind)
            .map(|(n, _)| *n)
    }

    /// Iterates the predecessors reaching this block through edges of `kind`.
    pub fn predecessors(&self, kind: EdgeKind) -> impl Iterator<Item = usize> + '_ {
        self.predecessors
            .iter()
            .filter(move |(_, k)| *k == kind)
            .map(|(n, _)| *n)
    }

    /// Returns every outgoing edge.
    #[must_use]
    pub fn all_successors(&self) -> &[(usize, EdgeKind)] {
        &self.successors
    }

    /// Returns every incoming edge.
    #[must_use]
    pub fn all_predecessors(&self) -> &[(usize, EdgeKind)] {
        &self.predecessors
    }
}
