//! Global anticipatability.
//!
//! An expression is anticipatable at a point if every path from that point computes
//! it before any of its operands changes.
//!
//! - `ANTIN[B]` = `LANT[B]` ∪ (`TRANSP[B]` ∩ `ANTOUT[B]`)
//! - `ANTOUT[B]` = ∩{`ANTIN[S]` | S is a successor of B}
//!
//! # Speculation
//!
//! A block that branches into a loop and also to code outside of it treats the cold
//! successors as anticipating every expression that cannot raise an exception. Hoisting
//! out of the loop then no longer requires the exit path to compute the expression.
//! Hotness is the static execution weight of the structure tree.

use std::collections::HashSet;

use crate::{
    analyses::pre::{BlockEffects, LocalPreInfo},
    cfg::{EdgeKind, FlowGraph},
    dataflow::{AnalysisKind, BitVectorAnalysis, Confluence, Direction, GenKill},
    ir::Node,
    structure::StructureTree,
    utils::{BitSet, OrderedBitSet},
    Result,
};

/// Global anticipatability with frequency-guided speculation.
pub struct GlobalAnticipatability {
    effects: BlockEffects,
    speculative_edges: HashSet<(usize, usize)>,
    speculation: GenKill<BitSet>,
}

impl GlobalAnticipatability {
    /// Builds the analysis from local information and block weights of `tree`.
    ///
    /// # Errors
    ///
    /// Fails if `tree` is invalidated or does not contain a reachable block of `cfg`.
    pub fn new<G: FlowGraph>(cfg: &G, tree: &StructureTree, info: &LocalPreInfo) -> Result<Self> {
        let width = info.width();
        let mut effects = BlockEffects::new(width);
        for block in cfg.block_numbers() {
            let mut kill = info.transp(block).complement();
            kill.difference_with(info.lant(block));
            effects.insert(block, GenKill::new(info.lant(block).clone(), kill));
        }

        let mut speculative_edges = HashSet::new();
        for block in cfg.block_numbers().filter(|b| tree.has_block(*b)) {
            let mut weighted = Vec::new();
            for successor in cfg.successors(block, EdgeKind::Normal) {
                if tree.has_block(successor) {
                    let weight = tree.frequency_of_execution(tree.block_structure(successor)?)?;
                    weighted.push((successor, weight));
                }
            }
            if weighted.iter().any(|(_, weight)| *weight > 1) {
                for (successor, weight) in weighted {
                    if weight <= 1 {
                        speculative_edges.insert((block, successor));
                    }
                }
            }
        }
        if !speculative_edges.is_empty() {
            log::debug!("anticipatability speculates on {} edges", speculative_edges.len());
        }

        Ok(Self {
            effects,
            speculative_edges,
            speculation: GenKill::new(info.checks().complement(), BitSet::new(width)),
        })
    }

    /// Returns `true` if the edge `from -> to` is speculated on.
    #[must_use]
    pub fn is_speculative(&self, from: usize, to: usize) -> bool {
        self.speculative_edges.contains(&(from, to))
    }
}

impl BitVectorAnalysis for GlobalAnticipatability {
    type Set = BitSet;
    const DIRECTION: Direction = Direction::Backward;
    const CONFLUENCE: Confluence = Confluence::Intersection;

    fn kind(&self) -> AnalysisKind {
        AnalysisKind::GlobalAnticipatability
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

    fn edge_transfer(&self, from: usize, to: usize, kind: EdgeKind) -> Option<GenKill<BitSet>> {
        (kind == EdgeKind::Normal && self.is_speculative(from, to)).then(|| self.speculation.clone())
    }
}
