//! Partial redundancy elimination by lazy code motion.
//!
//! PRE is split into a chain of bit-vector passes over the candidate expressions of
//! [`LocalPreInfo`]. Each pass consumes the per-block sets of the previous one:
//!
//! 1. [`GlobalAnticipatability`] - `ANTIN`, backward intersection
//! 2. [`Earliestness`] - `EARLIEST`, forward union
//! 3. [`Delayedness`] - `DELAYED`, forward intersection
//! 4. [`Latestness`] - `LATEST`, backward intersection
//! 5. [`Isolatedness`] - `ISOLATEDOUT`, backward intersection
//!
//! [`PartialRedundancy::run`] chains them and derives the final placement: where to
//! insert a computation of each expression and which original computations to replace
//! with a temporary.

mod anticipatability;
mod delayedness;
mod earliestness;
mod expressions;
mod isolatedness;
mod latestness;

use std::collections::HashMap;

pub use anticipatability::GlobalAnticipatability;
pub use delayedness::Delayedness;
pub use earliestness::Earliestness;
pub use expressions::{ExpressionTable, LocalInfo, LocalPreInfo};
pub use isolatedness::Isolatedness;
pub use latestness::Latestness;

use crate::{
    cfg::FlowGraph,
    dataflow::{BitVectorAnalysis, CancellationToken, DataflowResults, DataflowSolver, GenKill},
    ir::SymbolTable,
    structure::StructureTree,
    utils::{BitSet, OrderedBitSet},
    Result,
};

/// Precomputed gen/kill pair of every block.
#[derive(Debug, Clone)]
pub(crate) struct BlockEffects {
    width: usize,
    effects: HashMap<usize, GenKill<BitSet>>,
}

impl BlockEffects {
    pub(crate) fn new(width: usize) -> Self {
        Self {
            width,
            effects: HashMap::new(),
        }
    }

    pub(crate) fn insert(&mut self, block: usize, effect: GenKill<BitSet>) {
        self.effects.insert(block, effect);
    }

    pub(crate) const fn width(&self) -> usize {
        self.width
    }

    /// Returns the effect of `block`; identity for unknown blocks.
    pub(crate) fn get(&self, block: usize) -> GenKill<BitSet> {
        self.effects
            .get(&block)
            .cloned()
            .unwrap_or_else(|| GenKill::identity(self.width))
    }

    pub(crate) fn apply(&self, block: usize, set: &mut BitSet) {
        if let Some(effect) = self.effects.get(&block) {
            effect.apply_in_place(set);
        }
    }
}

/// Where one block inserts and replaces computations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    /// Expressions to compute into a temporary at this block
    pub insert: BitSet,
    /// Original computations to replace by the temporary
    pub replace: BitSet,
}

/// Results of the whole PRE pass chain.
#[derive(Debug, Clone)]
pub struct PartialRedundancy {
    info: LocalPreInfo,
    anticipatable: HashMap<usize, BitSet>,
    earliest: HashMap<usize, BitSet>,
    delayed: HashMap<usize, BitSet>,
    latest: HashMap<usize, BitSet>,
    isolated_out: HashMap<usize, BitSet>,
    placements: HashMap<usize, Placement>,
}

impl PartialRedundancy {
    /// Runs every PRE pass over the method.
    ///
    /// # Arguments
    ///
    /// * `cfg` - The method's control flow graph
    /// * `tree` - Its structure tree, also the source of block weights
    /// * `symbols` - The method's symbols
    /// * `token` - Optional cancellation token, polled by every pass
    ///
    /// # Errors
    ///
    /// Fails if any pass fails, with [`crate::Error::Interrupted`] on cancellation.
    pub fn run<G: FlowGraph>(
        cfg: &G,
        tree: &StructureTree,
        symbols: &SymbolTable,
        token: Option<&CancellationToken>,
    ) -> Result<Self> {
        let info = LocalPreInfo::new(cfg, symbols);
        log::debug!("partial redundancy over {} candidate expressions", info.width());

        let anticipatability = GlobalAnticipatability::new(cfg, tree, &info)?;
        let results = run_pass(&anticipatability, cfg, tree, token)?;
        let anticipatable: HashMap<usize, BitSet> = results
            .blocks()
            .filter_map(|block| Some((block, results.in_state(block)?.clone())))
            .collect();

        let earliestness = Earliestness::new(cfg, &info, anticipatable.clone());
        let earliest = earliestness.earliest(&run_pass(&earliestness, cfg, tree, token)?);

        let delayedness = Delayedness::new(cfg, &info, earliest.clone());
        let delayed = delayedness.delayed(&run_pass(&delayedness, cfg, tree, token)?);

        let latestness = Latestness::new(cfg, &info, delayed.clone());
        let latest = latestness.latest(&run_pass(&latestness, cfg, tree, token)?);

        let isolatedness = Isolatedness::new(cfg, &info, &latest);
        let isolated_out = Isolatedness::isolated_out(&run_pass(&isolatedness, cfg, tree, token)?);

        let mut placements = HashMap::new();
        for (&block, latest_here) in &latest {
            let isolated = isolated_out
                .get(&block)
                .cloned()
                .unwrap_or_else(|| BitSet::full(info.width()));
            let mut insert = latest_here.clone();
            insert.difference_with(&isolated);

            let mut kept = latest_here.clone();
            kept.intersect_with(&isolated);
            let mut replace = info.lant(block).clone();
            replace.difference_with(&kept);

            if !insert.is_empty() || !replace.is_empty() {
                log::trace!("PRE block {block}: insert {insert:?} replace {replace:?}");
            }
            placements.insert(block, Placement { insert, replace });
        }

        Ok(Self {
            info,
            anticipatable,
            earliest,
            delayed,
            latest,
            isolated_out,
            placements,
        })
    }

    /// Returns the local information and candidate table.
    #[must_use]
    pub const fn info(&self) -> &LocalPreInfo {
        &self.info
    }

    /// `ANTIN` of `block`.
    #[must_use]
    pub fn anticipatable_in(&self, block: usize) -> Option<&BitSet> {
        self.anticipatable.get(&block)
    }

    /// `EARLIEST` of `block`.
    #[must_use]
    pub fn earliest(&self, block: usize) -> Option<&BitSet> {
        self.earliest.get(&block)
    }

    /// `DELAYED` of `block`.
    #[must_use]
    pub fn delayed(&self, block: usize) -> Option<&BitSet> {
        self.delayed.get(&block)
    }

    /// `LATEST` of `block`.
    #[must_use]
    pub fn latest(&self, block: usize) -> Option<&BitSet> {
        self.latest.get(&block)
    }

    /// `ISOLATEDOUT` of `block`.
    #[must_use]
    pub fn isolated_out(&self, block: usize) -> Option<&BitSet> {
        self.isolated_out.get(&block)
    }

    /// Insert and replace sets of `block`.
    #[must_use]
    pub fn placement(&self, block: usize) -> Option<&Placement> {
        self.placements.get(&block)
    }

    /// Returns every block's placement, sorted by block number.
    #[must_use]
    pub fn placements(&self) -> Vec<(usize, &Placement)> {
        let mut placements: Vec<(usize, &Placement)> =
            self.placements.iter().map(|(b, p)| (*b, p)).collect();
        placements.sort_unstable_by_key(|(block, _)| *block);
        placements
    }

    /// Iterates `(block, expression bit)` for every insertion, in block order.
    pub fn insertions(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.placements()
            .into_iter()
            .flat_map(|(block, placement)| placement.insert.iter_ones().map(move |bit| (block, bit)))
    }
}

fn run_pass<A, G>(
    analysis: &A,
    cfg: &G,
    tree: &StructureTree,
    token: Option<&CancellationToken>,
) -> Result<DataflowResults<A::Set>>
where
    A: BitVectorAnalysis,
    G: FlowGraph,
{
    let mut solver = DataflowSolver::new(analysis, cfg, tree);
    if let Some(token) = token {
        solver = solver.with_cancellation(token.clone());
    }
    solver.solve()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::AnalysisConfig,
        ir::{Node, Opcode, SymbolId},
        test::factories::scenario_b,
    };

    fn symbol(symbols: &SymbolTable, name: &str) -> SymbolId {
        symbols
            .iter()
            .find(|(_, s)| s.name == name)
            .map(|(id, _)| id)
            .unwrap()
    }

    #[test]
    fn test_loop_invariant_chain() {
        let method = scenario_b();
        let tree = StructureTree::build(&method.cfg, &AnalysisConfig::strict()).unwrap();
        let pre = PartialRedundancy::run(&method.cfg, &tree, &method.symbols, None).unwrap();
        let (a, b) = (symbol(&method.symbols, "a"), symbol(&method.symbols, "b"));
        let e = pre
            .info()
            .table()
            .bit(&Node::binary(Opcode::Add, Node::load(a), Node::load(b)))
            .unwrap();

        // Anticipated at the header through speculation on the cold exit edge
        assert!(pre.anticipatable_in(1).unwrap().contains(e));
        assert!(pre.earliest(1).unwrap().contains(e));
        assert!(!pre.earliest(2).unwrap().contains(e));

        // Without a preheader the computation is delayed back into the body, where it
        // is isolated, so nothing moves
        assert!(pre.delayed(2).unwrap().contains(e));
        assert!(pre.latest(2).unwrap().contains(e));
        assert!(pre.isolated_out(2).unwrap().contains(e));
        assert!(!pre.placement(2).unwrap().replace.contains(e));
        assert_eq!(pre.insertions().count(), 0);
        assert!(pre.placements().windows(2).all(|w| w[0].0 < w[1].0));
    }

    #[test]
    fn test_cancelled_chain_fails() {
        let method = scenario_b();
        let tree = StructureTree::build(&method.cfg, &AnalysisConfig::strict()).unwrap();
        let token = CancellationToken::new();
        token.cancel();
        assert_eq!(
            PartialRedundancy::run(&method.cfg, &tree, &method.symbols, Some(&token)).err(),
            Some(crate::Error::Interrupted)
        );
    }
}
