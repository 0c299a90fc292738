//! Control-flow graph collaborator.
//!
//! The structure tree and the dataflow engine see a CFG only through the [`FlowGraph`]
//! trait: block numbers, normal and exceptional edges, layout order, statements and
//! frequencies. [`Cfg`] is the concrete container used by the compilation driver and the
//! tests. Block numbers are stable handles; removed blocks leave a hole rather than
//! shifting later numbers.
//!
//! # Examples
//!
//! ```rust
//! use structflow::cfg::{Cfg, EdgeKind, FlowGraph};
//!
//! let mut cfg = Cfg::new();
//! let entry = cfg.add_block();
//! let exit = cfg.add_block();
//! cfg.add_edge(entry, exit, EdgeKind::Normal)?;
//!
//! assert_eq!(cfg.successors(entry, EdgeKind::Normal).collect::<Vec<_>>(), vec![exit]);
//! assert_eq!(cfg.next_block(entry), Some(exit));
//! # Ok::<(), structflow::Error>(())
//! ```

mod block;

pub use block::Block;

use strum::{Display, EnumIter};

use crate::{ir::Node, Error, Result};

/// Kind of a control-flow edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumIter)]
pub enum EdgeKind {
    /// Regular control transfer
    Normal,
    /// Transfer to an exception handler
    Exception,
}

/// The view of a control-flow graph that structural analysis and the dataflow engine
/// depend on.
pub trait FlowGraph {
    /// Number of the method entry block.
    fn entry_block(&self) -> usize;

    /// Iterates the live block numbers in ascending order.
    fn block_numbers(&self) -> impl Iterator<Item = usize> + '_;

    /// Returns one more than the largest block number ever allocated.
    fn number_bound(&self) -> usize;

    /// Returns `true` if `block` is a live block.
    fn has_block(&self, block: usize) -> bool;

    /// Iterates the successors of `block` along edges of `kind`.
    fn successors(&self, block: usize, kind: EdgeKind) -> impl Iterator<Item = usize> + '_;

    /// Iterates the predecessors of `block` along edges of `kind`.
    fn predecessors(&self, block: usize, kind: EdgeKind) -> impl Iterator<Item = usize> + '_;

    /// Returns the block that follows `block` in layout order.
    fn next_block(&self, block: usize) -> Option<usize>;

    /// Returns the statements of `block`; unknown blocks have none.
    fn statements(&self, block: usize) -> &[Node];

    /// Returns the execution frequency of `block`.
    fn frequency(&self, block: usize) -> u32;
}

/// A control-flow graph of numbered basic blocks.
#[derive(Debug, Clone, Default)]
pub struct Cfg {
    blocks: Vec<Option<Block>>,
    entry: usize,
    layout: Vec<usize>,
}

impl Cfg {
    /// Creates an empty CFG.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a CFG of `block_count` empty blocks joined by normal `edges`, entered at
    /// block 0.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownBlock`] if an edge names a block outside `0..block_count`.
    pub fn from_edges(block_count: usize, edges: &[(usize, usize)]) -> Result<Self> {
        let mut cfg = Self::new();
        for _ in 0..block_count {
            cfg.add_block();
        }
        for &(from, to) in edges {
            cfg.add_edge(from, to, EdgeKind::Normal)?;
        }
        Ok(cfg)
    }

    /// Appends an empty block and returns its number.
    ///
    /// The new block is placed last in layout order.
    pub fn add_block(&mut self) -> usize {
        self.add_block_with(Vec::new())
    }

    /// Appends a block holding `statements` and returns its number.
    pub fn add_block_with(&mut self, statements: Vec<Node>) -> usize {
        let number = self.blocks.len();
        self.blocks.push(Some(Block::new(number, statements)));
        self.layout.push(number);
        number
    }

    /// Sets the method entry block.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownBlock`] if `block` does not exist.
    pub fn set_entry(&mut self, block: usize) -> Result<()> {
        self.block(block).ok_or(Error::UnknownBlock(block))?;
        self.entry = block;
        Ok(())
    }

    /// Returns the entry block number.
    #[must_use]
    pub const fn entry(&self) -> usize {
        self.entry
    }

    /// Returns the block with the given number.
    #[must_use]
    pub fn block(&self, number: usize) -> Option<&Block> {
        self.blocks.get(number).and_then(Option::as_ref)
    }

    fn block_mut(&mut self, number: usize) -> Result<&mut Block> {
        self.blocks
            .get_mut(number)
            .and_then(Option::as_mut)
            .ok_or(Error::UnknownBlock(number))
    }

    /// Returns the number of live blocks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.blocks.iter().flatten().count()
    }

    /// Returns `true` if the CFG has no blocks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Appends a statement to `block`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownBlock`] if `block` does not exist.
    pub fn push_statement(&mut self, block: usize, statement: Node) -> Result<()> {
        self.block_mut(block)?.statements.push(statement);
        Ok(())
    }

    /// Sets the execution frequency of `block`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownBlock`] if `block` does not exist.
    pub fn set_frequency(&mut self, block: usize, frequency: u32) -> Result<()> {
        self.block_mut(block)?.frequency = frequency;
        Ok(())
    }

    /// Returns the layout order.
    #[must_use]
    pub fn layout(&self) -> &[usize] {
        &self.layout
    }

    /// Replaces the layout order. Blocks missing from `order` keep no layout position.
    pub fn set_layout(&mut self, order: Vec<usize>) {
        self.layout = order.into_iter().filter(|&b| self.block(b).is_some()).collect();
    }

    /// Adds the edge `from -> to` of the given kind.
    ///
    /// Returns `false` if the edge already existed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownBlock`] if either endpoint does not exist.
    pub fn add_edge(&mut self, from: usize, to: usize, kind: EdgeKind) -> Result<bool> {
        self.block(to).ok_or(Error::UnknownBlock(to))?;
        if self.has_edge(from, to, kind) {
            return Ok(false);
        }
        self.block_mut(from)?.successors.push((to, kind));
        self.block_mut(to)?.predecessors.push((from, kind));
        Ok(true)
    }

    /// Returns `true` if the edge `from -> to` of the given kind exists.
    #[must_use]
    pub fn has_edge(&self, from: usize, to: usize, kind: EdgeKind) -> bool {
        self.block(from)
            .is_some_and(|b| b.successors.contains(&(to, kind)))
    }

    /// Removes the edge `from -> to` of the given kind.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownEdge`] if the edge does not exist.
    pub fn remove_edge(&mut self, from: usize, to: usize, kind: EdgeKind) -> Result<()> {
        if !self.has_edge(from, to, kind) {
            return Err(Error::UnknownEdge { from, to });
        }
        self.block_mut(from)?.successors.retain(|&e| e != (to, kind));
        self.block_mut(to)?.predecessors.retain(|&e| e != (from, kind));
        Ok(())
    }

    /// Removes `block` and all of its edges.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownBlock`] if `block` does not exist.
    pub fn remove_block(&mut self, block: usize) -> Result<()> {
        let removed = self
            .blocks
            .get_mut(block)
            .and_then(Option::take)
            .ok_or(Error::UnknownBlock(block))?;
        for (succ, kind) in removed.successors {
            if let Some(Some(b)) = self.blocks.get_mut(succ) {
                b.predecessors.retain(|&e| e != (block, kind));
            }
        }
        for (pred, kind) in removed.predecessors {
            if let Some(Some(b)) = self.blocks.get_mut(pred) {
                b.successors.retain(|&e| e != (block, kind));
            }
        }
        self.layout.retain(|&b| b != block);
        Ok(())
    }

    /// Merges `survivor` into `merged`.
    ///
    /// The resulting block keeps the number of `merged` and runs the statements of
    /// `merged` followed by those of `survivor`. It inherits the outgoing edges of both
    /// blocks except the edges from `merged` to `survivor`, and the incoming edges of
    /// both; edges into `survivor` are redirected to `merged`. Its frequency is the
    /// larger of the two. The `survivor` number is retired.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidMerge`] when both numbers are equal and
    /// [`Error::UnknownBlock`] if either block does not exist.
    pub fn merge_blocks(&mut self, merged: usize, survivor: usize) -> Result<()> {
        if merged == survivor {
            return Err(Error::InvalidMerge { merged, survivor });
        }
        self.block(merged).ok_or(Error::UnknownBlock(merged))?;
        let tail = self
            .blocks
            .get_mut(survivor)
            .and_then(Option::take)
            .ok_or(Error::UnknownBlock(survivor))?;

        for &(succ, kind) in &tail.successors {
            if let Some(Some(b)) = self.blocks.get_mut(succ) {
                b.predecessors.retain(|&e| e != (survivor, kind));
            }
        }
        for &(pred, kind) in &tail.predecessors {
            if let Some(Some(b)) = self.blocks.get_mut(pred) {
                b.successors.retain(|&e| e != (survivor, kind));
            }
        }

        let head = self.block_mut(merged)?;
        head.statements.extend(tail.statements);
        head.frequency = head.frequency.max(tail.frequency);

        for (succ, kind) in tail.successors {
            let target = if succ == survivor { merged } else { succ };
            self.add_edge(merged, target, kind)?;
        }
        for (pred, kind) in tail.predecessors {
            if pred != merged && pred != survivor {
                self.add_edge(pred, merged, kind)?;
            }
        }

        if self.entry == survivor {
            self.entry = merged;
        }
        self.layout.retain(|&b| b != survivor);
        Ok(())
    }

    /// Changes the number of block `old` to `new`, rewriting every edge and the layout.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownBlock`] if `old` does not exist, and [`Error::Error`] if
    /// `new` is already in use.
    pub fn renumber_block(&mut self, old: usize, new: usize) -> Result<()> {
        if old == new {
            return Ok(());
        }
        if self.block(new).is_some() {
            return Err(Error::Error(format!("block number {new} is already in use")));
        }
        let mut block = self
            .blocks
            .get_mut(old)
            .and_then(Option::take)
            .ok_or(Error::UnknownBlock(old))?;

        let rename = |n: usize| if n == old { new } else { n };
        block.number = new;
        for edge in block.successors.iter_mut().chain(block.predecessors.iter_mut()) {
            edge.0 = rename(edge.0);
        }
        for other in self.blocks.iter_mut().flatten() {
            for edge in other.successors.iter_mut().chain(other.predecessors.iter_mut()) {
                edge.0 = rename(edge.0);
            }
        }
        if self.blocks.len() <= new {
            self.blocks.resize_with(new + 1, || None);
        }
        self.blocks[new] = Some(block);
        for b in &mut self.layout {
            *b = rename(*b);
        }
        if self.entry == old {
            self.entry = new;
        }
        Ok(())
    }
}

impl FlowGraph for Cfg {
    fn entry_block(&self) -> usize {
        self.entry
    }

    fn block_numbers(&self) -> impl Iterator<Item = usize> + '_ {
        self.blocks.iter().flatten().map(Block::number)
    }

    fn number_bound(&self) -> usize {
        self.blocks.len()
    }

    fn has_block(&self, block: usize) -> bool {
        self.block(block).is_some()
    }

    fn successors(&self, block: usize, kind: EdgeKind) -> impl Iterator<Item = usize> + '_ {
        self.block(block)
            .into_iter()
            .flat_map(move |b| b.successors(kind))
    }

    fn predecessors(&self, block: usize, kind: EdgeKind) -> impl Iterator<Item = usize> + '_ {
        self.block(block)
            .into_iter()
            .flat_map(move |b| b.predecessors(kind))
    }

    fn next_block(&self, block: usize) -> Option<usize> {
        let pos = self.layout.iter().position(|&b| b == block)?;
        self.layout.get(pos + 1).copied()
    }

    fn statements(&self, block: usize) -> &[Node] {
        self.block(block).map_or(&[], Block::statements)
    }

    fn frequency(&self, block: usize) -> u32 {
        self.block(block).map_or(0, Block::frequency)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Node, SymbolId};

    fn chain(n: usize) -> Cfg {
        let mut cfg = Cfg::new();
        for _ in 0..n {
            cfg.add_block();
        }
        for i in 1..n {
            cfg.add_edge(i - 1, i, EdgeKind::Normal).unwrap();
        }
        cfg
    }

    #[test]
    fn test_cfg_edges() {
        let mut cfg = chain(3);
        assert!(!cfg.add_edge(0, 1, EdgeKind::Normal).unwrap());
        assert!(cfg.add_edge(1, 0, EdgeKind::Exception).unwrap());
        assert_eq!(
            FlowGraph::predecessors(&cfg, 0, EdgeKind::Exception).collect::<Vec<_>>(),
            vec![1]
        );
        cfg.remove_edge(0, 1, EdgeKind::Normal).unwrap();
        assert!(!cfg.has_edge(0, 1, EdgeKind::Normal));
        assert!(matches!(
            cfg.remove_edge(0, 1, EdgeKind::Normal),
            Err(Error::UnknownEdge { from: 0, to: 1 })
        ));
        assert!(matches!(cfg.add_edge(0, 9, EdgeKind::Normal), Err(Error::UnknownBlock(9))));
    }

    #[test]
    fn test_cfg_merge_blocks() {
        let mut cfg = chain(4);
        let x = SymbolId::new(0);
        cfg.push_statement(1, Node::store(x, Node::constant(1))).unwrap();
        cfg.push_statement(2, Node::ret(Some(Node::load(x)))).unwrap();
        cfg.set_frequency(2, 7).unwrap();
        cfg.add_edge(2, 1, EdgeKind::Normal).unwrap();

        cfg.merge_blocks(1, 2).unwrap();

        assert!(cfg.block(2).is_none());
        let merged = cfg.block(1).unwrap();
        assert_eq!(merged.statements().len(), 2);
        assert_eq!(merged.frequency(), 7);
        let mut succs: Vec<usize> = merged.successors(EdgeKind::Normal).collect();
        succs.sort_unstable();
        assert_eq!(succs, vec![1, 3]);
        assert_eq!(cfg.layout(), &[0, 1, 3]);
        assert!(matches!(cfg.merge_blocks(1, 1), Err(Error::InvalidMerge { .. })));
    }

    #[test]
    fn test_cfg_remove_and_renumber() {
        let mut cfg = chain(3);
        cfg.renumber_block(1, 7).unwrap();
        assert!(cfg.has_edge(0, 7, EdgeKind::Normal));
        assert!(cfg.has_edge(7, 2, EdgeKind::Normal));
        assert_eq!(cfg.next_block(0), Some(7));

        cfg.remove_block(7).unwrap();
        assert_eq!(cfg.len(), 2);
        assert_eq!(FlowGraph::successors(&cfg, 0, EdgeKind::Normal).count(), 0);
        assert_eq!(cfg.next_block(0), Some(2));
    }
}
