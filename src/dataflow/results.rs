//! Solved dataflow sets.

use std::collections::HashMap;

use crate::structure::StructureId;

/// Counters collected while solving.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SolveStats {
    /// Subnodes taken off a worklist in improper regions
    pub worklist_pops: usize,
    /// Subnodes put back on a worklist after a dependency changed
    pub re_enqueues: usize,
    /// Sweeps over natural loops
    pub loop_sweeps: usize,
    /// Region solves, including summary computations
    pub regions_solved: usize,
}

/// Results of a dataflow analysis.
///
/// Holds the in-set and out-set of every reachable block, keyed by block number, and the
/// in-set of every region. For a forward analysis a region's in-set is the value
/// arriving at its entry; for a backward analysis it is the value at the start of its
/// entry block.
///
/// For a backward analysis, a block's out-set joins the in-sets of all its
/// successors, or uses the boundary when the block has no normal successor.
#[derive(Debug, Clone)]
pub struct DataflowResults<S> {
    pub(crate) in_states: HashMap<usize, S>,
    pub(crate) out_states: HashMap<usize, S>,
    pub(crate) structure_states: HashMap<StructureId, S>,
    pub(crate) stats: SolveStats,
}

impl<S> DataflowResults<S> {
    pub(crate) fn new() -> Self {
        Self {
            in_states: HashMap::new(),
            out_states: HashMap::new(),
            structure_states: HashMap::new(),
            stats: SolveStats::default(),
        }
    }

    /// Returns the state at the start of `block`.
    ///
    /// # Arguments
    ///
    /// * `block` - The block number
    ///
    /// # Returns
    ///
    /// `None` if the block is unknown or was not reachable.
    #[must_use]
    pub fn in_state(&self, block: usize) -> Option<&S> {
        self.in_states.get(&block)
    }

    /// Returns the state at the end of `block`.
    ///
    /// # Arguments
    ///
    /// * `block` - The block number
    ///
    /// # Returns
    ///
    /// `None` if the block is unknown or was not reachable.
    #[must_use]
    pub fn out_state(&self, block: usize) -> Option<&S> {
        self.out_states.get(&block)
    }

    /// Returns the in-set recorded for a region.
    #[must_use]
    pub fn structure_state(&self, id: StructureId) -> Option<&S> {
        self.structure_states.get(&id)
    }

    /// Returns the number of blocks with results.
    #[must_use]
    pub fn block_count(&self) -> usize {
        self.in_states.len()
    }

    /// Iterates block numbers that have results, in ascending order.
    pub fn blocks(&self) -> impl Iterator<Item = usize> + '_ {
        let mut blocks: Vec<usize> = self.in_states.keys().copied().collect();
        blocks.sort_unstable();
        blocks.into_iter()
    }

    /// Returns the solver counters.
    #[must_use]
    pub const fn stats(&self) -> &SolveStats {
        &self.stats
    }
}
