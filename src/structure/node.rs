//! Structure nodes: the arena entries of a [`crate::structure::StructureTree`].
//!
//! A [`Structure`] is either a leaf wrapping one basic block or a [`Region`] that owns
//! an ordered set of [`SubNode`]s, its internal subgraph and its exit edges. Both kinds
//! share a number (the block number, or the number of the region's entry), a parent
//! link and the nesting bookkeeping.
//!
//! Regions store their edges once, as `(from, to, kind)` triples between subnode
//! numbers. An edge whose target is not one of the region's subnodes is an exit edge;
//! all exits with the same target and kind therefore share one implicit exit node.

use std::fmt;

use bitflags::bitflags;

use crate::{cfg::EdgeKind, ir::SymbolId};

/// Handle of a structure in a [`crate::structure::StructureTree`] arena.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StructureId(pub(crate) usize);

impl StructureId {
    /// Returns the arena slot of this handle.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Debug for StructureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S{}", self.0)
    }
}

impl fmt::Display for StructureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S{}", self.0)
    }
}

bitflags! {
    /// Shape flags of a region.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct RegionFlags: u8 {
        /// The subgraph has a cycle that is not a back edge to the entry
        const CONTAINS_INTERNAL_CYCLES = 0x01;
        /// The loop has been brought into canonical form by a loop canonicalizer
        const CANONICALIZED_LOOP = 0x02;
        /// The loop may be inverted by later passes
        const INVERTIBLE_LOOP = 0x04;
    }
}

/// A node of a region's internal subgraph, wrapping exactly one child structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubNode {
    /// Number of the wrapped structure
    pub number: usize,
    /// The wrapped structure
    pub structure: StructureId,
}

/// An edge of a region's subgraph, either internal or leaving the region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegionEdge {
    /// Number of the source subnode
    pub from: usize,
    /// Number of the target, inside or outside the region
    pub to: usize,
    /// Edge kind
    pub kind: EdgeKind,
}

impl RegionEdge {
    /// Creates a new edge.
    #[must_use]
    pub const fn new(from: usize, to: usize, kind: EdgeKind) -> Self {
        Self { from, to, kind }
    }
}

/// Describes a basic induction variable of a loop region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InductionVariable {
    /// The variable
    pub symbol: SymbolId,
    /// Constant value on loop entry, if known
    pub entry_value: Option<i64>,
    /// Constant step applied once per iteration
    pub increment: i64,
    /// Constant the variable is compared against to leave the loop, if known
    pub exit_bound: Option<i64>,
}

/// The composite part of a region structure.
#[derive(Debug, Clone, Default)]
pub struct Region {
    pub(crate) sub_nodes: Vec<SubNode>,
    pub(crate) entry: usize,
    pub(crate) edges: Vec<RegionEdge>,
    pub(crate) flags: RegionFlags,
    pub(crate) induction_variables: Vec<InductionVariable>,
}

impl Region {
    pub(crate) fn new(entry: usize) -> Self {
        Self {
            entry,
            ..Self::default()
        }
    }

    /// Returns the subnodes in insertion order.
    #[must_use]
    pub fn sub_nodes(&self) -> &[SubNode] {
        &self.sub_nodes
    }

    /// Returns the number of the entry subnode.
    #[must_use]
    pub const fn entry(&self) -> usize {
        self.entry
    }

    /// Returns the entry subnode.
    #[must_use]
    pub fn entry_node(&self) -> Option<&SubNode> {
        self.sub_node(self.entry)
    }

    /// Returns the subnode with the given number.
    #[must_use]
    pub fn sub_node(&self, number: usize) -> Option<&SubNode> {
        self.sub_nodes.iter().find(|n| n.number == number)
    }

    /// Returns `true` if a subnode carries `number`.
    #[must_use]
    pub fn has_sub_node(&self, number: usize) -> bool {
        self.sub_nodes.iter().any(|n| n.number == number)
    }

    /// Returns every edge, internal and exit.
    #[must_use]
    pub fn edges(&self) -> &[RegionEdge] {
        &self.edges
    }

    /// Iterates the edges between subnodes.
    pub fn internal_edges(&self) -> impl Iterator<Item = &RegionEdge> + '_ {
        self.edges.iter().filter(|e| self.has_sub_node(e.to))
    }

    /// Iterates the edges that leave the region.
    pub fn exit_edges(&self) -> impl Iterator<Item = &RegionEdge> + '_ {
        self.edges.iter().filter(|e| !self.has_sub_node(e.to))
    }

    /// Returns `true` if the edge exists, internal or exit.
    #[must_use]
    pub fn has_edge(&self, from: usize, to: usize, kind: EdgeKind) -> bool {
        self.edges.contains(&RegionEdge::new(from, to, kind))
    }

    /// Iterates the internal successors of subnode `number` with their edge kinds.
    pub fn successors(&self, number: usize) -> impl Iterator<Item = (usize, EdgeKind)> + '_ {
        self.internal_edges()
            .filter(move |e| e.from == number)
            .map(|e| (e.to, e.kind))
    }

    /// Iterates the internal predecessors of subnode `number` with their edge kinds.
    pub fn predecessors(&self, number: usize) -> impl Iterator<Item = (usize, EdgeKind)> + '_ {
        self.edges
            .iter()
            .filter(move |e| e.to == number)
            .map(|e| (e.from, e.kind))
    }

    /// Iterates the exit edges that leave from subnode `number`.
    pub fn exits_from(&self, number: usize) -> impl Iterator<Item = &RegionEdge> + '_ {
        self.exit_edges().filter(move |e| e.from == number)
    }

    /// Returns the shape flags.
    #[must_use]
    pub const fn flags(&self) -> RegionFlags {
        self.flags
    }

    /// Returns `true` if the region is improper.
    #[must_use]
    pub const fn contains_internal_cycles(&self) -> bool {
        self.flags.contains(RegionFlags::CONTAINS_INTERNAL_CYCLES)
    }

    /// Returns `true` if the region is a natural loop: no internal cycles, and the
    /// entry is the target of at least one back edge.
    #[must_use]
    pub fn is_natural_loop(&self) -> bool {
        !self.contains_internal_cycles() && self.predecessors(self.entry).next().is_some()
    }

    /// Returns `true` if the region has no cycles at all.
    #[must_use]
    pub fn is_acyclic(&self) -> bool {
        !self.contains_internal_cycles() && self.predecessors(self.entry).next().is_none()
    }

    /// Returns `true` if a loop canonicalizer has marked this loop.
    #[must_use]
    pub const fn is_canonicalized_loop(&self) -> bool {
        self.flags.contains(RegionFlags::CANONICALIZED_LOOP)
    }

    /// Returns `true` if the entry has an edge to itself.
    #[must_use]
    pub fn has_entry_self_edge(&self) -> bool {
        self.edges
            .iter()
            .any(|e| e.from == self.entry && e.to == self.entry)
    }

    /// Returns the induction variables recorded for this loop.
    #[must_use]
    pub fn induction_variables(&self) -> &[InductionVariable] {
        &self.induction_variables
    }

    pub(crate) fn add_edge(&mut self, from: usize, to: usize, kind: EdgeKind) -> bool {
        let edge = RegionEdge::new(from, to, kind);
        if self.edges.contains(&edge) {
            return false;
        }
        self.edges.push(edge);
        true
    }

    pub(crate) fn remove_edge(&mut self, from: usize, to: usize, kind: EdgeKind) -> bool {
        let before = self.edges.len();
        self.edges.retain(|e| *e != RegionEdge::new(from, to, kind));
        self.edges.len() != before
    }

    pub(crate) fn remove_sub_node(&mut self, number: usize) -> Option<SubNode> {
        let pos = self.sub_nodes.iter().position(|n| n.number == number)?;
        Some(self.sub_nodes.remove(pos))
    }

    /// Recomputes whether the subgraph has a cycle other than back edges to the entry.
    ///
    /// Normal edges into the entry are ignored; an exceptional edge into the entry
    /// closes a cycle. Subnodes not reachable from the entry are searched as well.
    #[must_use]
    pub fn compute_internal_cycles(&self) -> bool {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            New,
            Active,
            Done,
        }

        let index_of = |number: usize| self.sub_nodes.iter().position(|n| n.number == number);
        let mut succs: Vec<Vec<usize>> = vec![Vec::new(); self.sub_nodes.len()];
        for edge in &self.edges {
            if edge.to == self.entry && edge.kind == EdgeKind::Normal {
                continue;
            }
            if let (Some(from), Some(to)) = (index_of(edge.from), index_of(edge.to)) {
                succs[from].push(to);
            }
        }

        let mut marks = vec![Mark::New; self.sub_nodes.len()];
        let roots = index_of(self.entry)
            .into_iter()
            .chain(0..self.sub_nodes.len());
        for root in roots {
            if marks[root] != Mark::New {
                continue;
            }
            let mut stack = vec![(root, 0usize)];
            marks[root] = Mark::Active;
            while let Some(top) = stack.last_mut() {
                let node = top.0;
                if let Some(&succ) = succs[node].get(top.1) {
                    top.1 += 1;
                    match marks[succ] {
                        Mark::Active => return true,
                        Mark::New => {
                            marks[succ] = Mark::Active;
                            stack.push((succ, 0));
                        }
                        Mark::Done => {}
                    }
                } else {
                    marks[node] = Mark::Done;
                    stack.pop();
                }
            }
        }
        false
    }

    pub(crate) fn update_cycle_flag(&mut self) -> bool {
        let cycles = self.compute_internal_cycles();
        self.flags.set(RegionFlags::CONTAINS_INTERNAL_CYCLES, cycles);
        cycles
    }
}

/// Leaf or composite.
#[derive(Debug, Clone)]
pub enum StructureKind {
    /// Wraps one basic block
    Block,
    /// Owns child structures and their subgraph
    Region(Region),
}

/// One entry of the structure arena.
#[derive(Debug, Clone)]
pub struct Structure {
    pub(crate) number: usize,
    pub(crate) parent: Option<StructureId>,
    pub(crate) nesting_depth: usize,
    pub(crate) max_nesting_depth: usize,
    pub(crate) contains_improper_region: bool,
    pub(crate) kind: StructureKind,
}

impl Structure {
    pub(crate) fn block(number: usize) -> Self {
        Self {
            number,
            parent: None,
            nesting_depth: 0,
            max_nesting_depth: 0,
            contains_improper_region: false,
            kind: StructureKind::Block,
        }
    }

    pub(crate) fn region(region: Region) -> Self {
        Self {
            number: region.entry,
            parent: None,
            nesting_depth: 0,
            max_nesting_depth: 0,
            contains_improper_region: false,
            kind: StructureKind::Region(region),
        }
    }

    /// Returns the block number, or the number of the region's entry.
    #[must_use]
    pub const fn number(&self) -> usize {
        self.number
    }

    /// Returns the enclosing region, `None` for the root.
    #[must_use]
    pub const fn parent(&self) -> Option<StructureId> {
        self.parent
    }

    /// Returns the number of natural loops enclosing this structure.
    #[must_use]
    pub const fn nesting_depth(&self) -> usize {
        self.nesting_depth
    }

    /// Returns the deepest loop nesting found inside this structure.
    #[must_use]
    pub const fn max_nesting_depth(&self) -> usize {
        self.max_nesting_depth
    }

    /// Returns `true` if an improper region is nested anywhere inside.
    #[must_use]
    pub const fn contains_improper_region(&self) -> bool {
        self.contains_improper_region
    }

    /// Returns the kind.
    #[must_use]
    pub const fn kind(&self) -> &StructureKind {
        &self.kind
    }

    /// Returns the region part, or `None` for a block.
    #[must_use]
    pub const fn as_region(&self) -> Option<&Region> {
        match &self.kind {
            StructureKind::Region(region) => Some(region),
            StructureKind::Block => None,
        }
    }

    pub(crate) fn as_region_mut(&mut self) -> Option<&mut Region> {
        match &mut self.kind {
            StructureKind::Region(region) => Some(region),
            StructureKind::Block => None,
        }
    }

    /// Returns `true` for a block structure.
    #[must_use]
    pub const fn is_block(&self) -> bool {
        matches!(self.kind, StructureKind::Block)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region(entry: usize, nodes: &[usize], edges: &[(usize, usize, EdgeKind)]) -> Region {
        let mut region = Region::new(entry);
        for (i, &n) in nodes.iter().enumerate() {
            region.sub_nodes.push(SubNode {
                number: n,
                structure: StructureId(i),
            });
        }
        for &(from, to, kind) in edges {
            region.add_edge(from, to, kind);
        }
        region
    }

    #[test]
    fn test_region_shapes() {
        let acyclic = region(0, &[0, 1], &[(0, 1, EdgeKind::Normal), (1, 9, EdgeKind::Normal)]);
        assert!(acyclic.is_acyclic());
        assert!(!acyclic.compute_internal_cycles());
        assert_eq!(acyclic.exit_edges().count(), 1);
        assert_eq!(acyclic.internal_edges().count(), 1);

        let natural = region(0, &[0, 1], &[(0, 1, EdgeKind::Normal), (1, 0, EdgeKind::Normal)]);
        assert!(!natural.compute_internal_cycles());
        assert!(natural.is_natural_loop());
    }

    #[test]
    fn test_region_internal_cycles() {
        let improper = region(
            0,
            &[0, 1, 2],
            &[
                (0, 1, EdgeKind::Normal),
                (0, 2, EdgeKind::Normal),
                (1, 2, EdgeKind::Normal),
                (2, 1, EdgeKind::Normal),
            ],
        );
        assert!(improper.compute_internal_cycles());

        let exceptional = region(0, &[0, 1], &[(0, 1, EdgeKind::Normal), (1, 0, EdgeKind::Exception)]);
        assert!(exceptional.compute_internal_cycles());

        let unreachable_cycle = region(0, &[0, 1, 2], &[(1, 2, EdgeKind::Normal), (2, 1, EdgeKind::Normal)]);
        assert!(unreachable_cycle.compute_internal_cycles());
    }

    #[test]
    fn test_region_edge_dedup() {
        let mut r = region(0, &[0], &[]);
        assert!(r.add_edge(0, 0, EdgeKind::Normal));
        assert!(!r.add_edge(0, 0, EdgeKind::Normal));
        assert!(r.has_entry_self_edge());
        assert!(r.remove_edge(0, 0, EdgeKind::Normal));
        assert!(!r.remove_edge(0, 0, EdgeKind::Normal));
    }
}
