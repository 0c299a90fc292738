//! Latestness: the last points a delayed computation can reach.
//!
//! - `IN[B]` = `DELAYED[B]`
//! - `OUT[B]` = ∩{`IN[S]` | S is a successor of B}, empty without successors
//! - `LATEST[B]` = `DELAYED[B]` ∩ (`LANT[B]` ∪ ¬`OUT[B]`)

use std::collections::HashMap;

use crate::{
    analyses::pre::{BlockEffects, LocalPreInfo},
    cfg::FlowGraph,
    dataflow::{AnalysisKind, BitVectorAnalysis, Confluence, DataflowResults, Direction, GenKill},
    ir::Node,
    utils::{BitSet, OrderedBitSet},
};

/// Latestness analysis.
pub struct Latestness {
    effects: BlockEffects,
    delayed: HashMap<usize, BitSet>,
    lant: HashMap<usize, BitSet>,
}

impl Latestness {
    /// Builds the analysis from local information and `DELAYED` of every block.
    #[must_use]
    pub fn new<G: FlowGraph>(cfg: &G, info: &LocalPreInfo, delayed: HashMap<usize, BitSet>) -> Self {
        let mut effects = BlockEffects::new(info.width());
        let mut lant = HashMap::new();
        for block in cfg.block_numbers() {
            let set = delayed
                .get(&block)
                .cloned()
                .unwrap_or_else(|| BitSet::new(info.width()));
            effects.insert(block, GenKill::constant(set));
            lant.insert(block, info.lant(block).clone());
        }
        Self {
            effects,
            delayed,
            lant,
        }
    }

    /// Computes `LATEST` for every solved block.
    #[must_use]
    pub fn latest(&self, results: &DataflowResults<BitSet>) -> HashMap<usize, BitSet> {
        results
            .blocks()
            .filter_map(|block| {
                let mut allowed = results.out_state(block)?.complement();
                if let Some(lant) = self.lant.get(&block) {
                    allowed.union_with(lant);
                }
                let mut latest = self.delayed.get(&block)?.clone();
                latest.intersect_with(&allowed);
                Some((block, latest))
            })
            .collect()
    }
}

impl BitVectorAnalysis for Latestness {
    type Set = BitSet;
    const DIRECTION: Direction = Direction::Backward;
    const CONFLUENCE: Confluence = Confluence::Intersection;

    fn kind(&self) -> AnalysisKind {
        AnalysisKind::Latestness
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
