//! Isolatedness: computations whose value is used only where they are placed.
//!
//! - `OUT[B]` = ∩{`IN[S]` | S is a successor of B}, universal without successors
//! - `IN[B]` = `LATEST[B]` ∪ (`OUT[B]` - `LANT[B]`)

use std::collections::HashMap;

use crate::{
    analyses::pre::{BlockEffects, LocalPreInfo},
    cfg::FlowGraph,
    dataflow::{AnalysisKind, BitVectorAnalysis, Confluence, DataflowResults, Direction, GenKill},
    ir::Node,
    utils::BitSet,
};

/// Isolatedness analysis.
pub struct Isolatedness {
    effects: BlockEffects,
}

impl Isolatedness {
    /// Builds the analysis from local information and `LATEST` of every block.
    #[must_use]
    pub fn new<G: FlowGraph>(cfg: &G, info: &LocalPreInfo, latest: &HashMap<usize, BitSet>) -> Self {
        let mut effects = BlockEffects::new(info.width());
        for block in cfg.block_numbers() {
            let gen = latest
                .get(&block)
                .cloned()
                .unwrap_or_else(|| BitSet::new(info.width()));
            effects.insert(block, GenKill::new(gen, info.lant(block).clone()));
        }
        Self { effects }
    }

    /// Returns `ISOLATEDOUT` for every solved block.
    #[must_use]
    pub fn isolated_out(results: &DataflowResults<BitSet>) -> HashMap<usize, BitSet> {
        results
            .blocks()
            .filter_map(|block| Some((block, results.out_state(block)?.clone())))
            .collect()
    }
}

impl BitVectorAnalysis for Isolatedness {
    type Set = BitSet;
    const DIRECTION: Direction = Direction::Backward;
    const CONFLUENCE: Confluence = Confluence::Intersection;

    fn kind(&self) -> AnalysisKind {
        AnalysisKind::Isolatedness
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
