//! Earliestness: the first points where a computation could be placed.
//!
//! - `IN[B]` = ∪{`OUT[P]` | P is a predecessor of B}, universal at the method entry
//! - `OUT[B]` = (`IN[B]` - `ANTIN[B]`) ∪ ¬`TRANSP[B]`
//! - `EARLIEST[B]` = `ANTIN[B]` ∩ `IN[B]`

use std::collections::HashMap;

use crate::{
    analyses::pre::{BlockEffects, LocalPreInfo},
    cfg::FlowGraph,
    dataflow::{AnalysisKind, BitVectorAnalysis, Confluence, DataflowResults, Direction, GenKill},
    ir::Node,
    utils::{BitSet, OrderedBitSet},
};

/// Earliestness analysis.
pub struct Earliestness {
    effects: BlockEffects,
    anticipatable: HashMap<usize, BitSet>,
}

impl Earliestness {
    /// Builds the analysis from local information and `ANTIN` of every block.
    #[must_use]
    pub fn new<G: FlowGraph>(cfg: &G, info: &LocalPreInfo, anticipatable: HashMap<usize, BitSet>) -> Self {
        let mut effects = BlockEffects::new(info.width());
        for block in cfg.block_numbers() {
            let opaque = info.transp(block).complement();
            let antin = anticipatable
                .get(&block)
                .cloned()
                .unwrap_or_else(|| BitSet::new(info.width()));
            effects.insert(block, GenKill::new(opaque, antin));
        }
        Self {
            effects,
            anticipatable,
        }
    }

    /// Computes `EARLIEST` for every solved block.
    #[must_use]
    pub fn earliest(&self, results: &DataflowResults<BitSet>) -> HashMap<usize, BitSet> {
        results
            .blocks()
            .filter_map(|block| {
                let mut earliest = self.anticipatable.get(&block)?.clone();
                earliest.intersect_with(results.in_state(block)?);
                Some((block, earliest))
            })
            .collect()
    }
}

impl BitVectorAnalysis for Earliestness {
    type Set = BitSet;
    const DIRECTION: Direction = Direction::Forward;
    const CONFLUENCE: Confluence = Confluence::Union;

    fn kind(&self) -> AnalysisKind {
        AnalysisKind::Earliestness
    }

    fn bit_count(&self) -> usize {
        self.effects.width()
    }

    fn boundary(&self) -> BitSet {
        BitSet::full(self.effects.width())
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
