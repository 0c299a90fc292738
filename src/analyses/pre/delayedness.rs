//! Delayedness: how far down a computation can be pushed from its earliest point.
//!
//! - `IN[B]` = ∩{`OUT[P]` | P is a predecessor of B}, empty at the method entry
//! - `OUT[B]` = (`IN[B]` ∪ `EARLIEST[B]`) - `LANT[B]`
//! - `DELAYED[B]` = `IN[B]` ∪ `EARLIEST[B]`

use std::collections::HashMap;

use crate::{
    analyses::pre::{BlockEffects, LocalPreInfo},
    cfg::FlowGraph,
    dataflow::{AnalysisKind, BitVectorAnalysis, Confluence, DataflowResults, Direction, GenKill},
    ir::Node,
    utils::{BitSet, OrderedBitSet},
};

/// Delayedness analysis.
pub struct Delayedness {
    effects: BlockEffects,
    earliest: HashMap<usize, BitSet>,
}

impl Delayedness {
    /// Builds the analysis from local information and `EARLIEST` of every block.
    #[must_use]
    pub fn new<G: FlowGraph>(cfg: &G, info: &LocalPreInfo, earliest: HashMap<usize, BitSet>) -> Self {
        let mut effects = BlockEffects::new(info.width());
        for block in cfg.block_numbers() {
            let mut gen = earliest
                .get(&block)
                .cloned()
                .unwrap_or_else(|| BitSet::new(info.width()));
            gen.difference_with(info.lant(block));
            effects.insert(block, GenKill::new(gen, info.lant(block).clone()));
        }
        Self { effects, earliest }
    }

    /// Computes `DELAYED` for every solved block.
    #[must_use]
    pub fn delayed(&self, results: &DataflowResults<BitSet>) -> HashMap<usize, BitSet> {
        results
            .blocks()
            .filter_map(|block| {
                let mut delayed = results.in_state(block)?.clone();
                if let Some(earliest) = self.earliest.get(&block) {
                    delayed.union_with(earliest);
                }
                Some((block, delayed))
            })
            .collect()
    }
}

impl BitVectorAnalysis for Delayedness {
    type Set = BitSet;
    const DIRECTION: Direction = Direction::Forward;
    const CONFLUENCE: Confluence = Confluence::Intersection;

    fn kind(&self) -> AnalysisKind {
        AnalysisKind::Delayedness
    }

    fn bit_count(&self) -> usize {
        self.effects.width()
    }

    fn supports_gen_and_kill(&self) -> bool {
        true
    }

    fn block_gen_kill(&self, block: usize, _statements: &[Node]) -> GenKill<BitSet> {
        self.effects.get(block)
    }

    fn transfer_block(&self, block: usize, _statements: &[Node], set: &mut BitSet) {
        self.effects.apply(block, set);
    }
}
