//! Locals that are live on every path.
//!
//! A local is live on all paths at a point if every path from that point to a
//! method exit loads it before storing it. This is the intersection counterpart of
//! [`crate::analyses::Liveness`], with the same USE and DEF sets.

use std::collections::HashMap;

use crate::{
    analyses::LocalIndex,
    cfg::FlowGraph,
    dataflow::{AnalysisKind, BitVectorAnalysis, Confluence, Direction, GenKill},
    ir::{Node, SymbolId, SymbolTable},
    utils::BitSet,
};

/// Live-on-all-paths analysis.
pub struct LiveOnAllPaths {
    locals: LocalIndex,
    effects: HashMap<usize, GenKill<BitSet>>,
}

impl LiveOnAllPaths {
    /// Creates the analysis for the method described by `cfg` and `symbols`.
    #[must_use]
    pub fn new<G: FlowGraph>(cfg: &G, symbols: &SymbolTable) -> Self {
        let locals = LocalIndex::new(symbols);
        let effects = cfg
            .block_numbers()
            .map(|block| (block, locals.block_effect(cfg.statements(block))))
            .collect();
        Self { locals, effects }
    }

    /// Returns the bit tracking `symbol`.
    #[must_use]
    pub fn bit(&self, symbol: SymbolId) -> Option<usize> {
        self.locals.bit(symbol)
    }
}

impl BitVectorAnalysis for LiveOnAllPaths {
    type Set = BitSet;
    const DIRECTION: Direction = Direction::Backward;
    const CONFLUENCE: Confluence = Confluence::Intersection;

    fn kind(&self) -> AnalysisKind {
        AnalysisKind::LiveOnAllPaths
    }

    fn bit_count(&self) -> usize {
        self.locals.len()
    }

    fn supports_gen_and_kill(&self) -> bool {
        true
    }

    fn block_gen_kill(&self, block: usize, statements: &[Node]) -> GenKill<BitSet> {
        self.effects
            .get(&block)
            .cloned()
            .unwrap_or_else(|| self.locals.block_effect(statements))
    }

    fn analyze_node(&self, _block: usize, node: &Node, set: &mut BitSet) {
        self.locals.statement_effect(node).apply_in_place(set);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        cfg::{Cfg, EdgeKind},
        config::AnalysisConfig,
        dataflow::DataflowSolver,
        ir::SymbolKind,
        structure::StructureTree,
        utils::OrderedBitSet,
    };

    #[test]
    fn test_use_on_one_arm_is_not_live_on_all_paths() {
        let mut symbols = SymbolTable::new();
        let x = symbols.add("x", SymbolKind::Local);
        let y = symbols.add("y", SymbolKind::Local);
        let mut cfg = Cfg::new();
        let entry = cfg.add_block();
        let left = cfg.add_block_with(vec![Node::ret(Some(Node::load(x)))]);
        let right = cfg.add_block_with(vec![Node::store(y, Node::load(x)), Node::ret(Some(Node::load(y)))]);
        cfg.add_edge(entry, left, EdgeKind::Normal).unwrap();
        cfg.add_edge(entry, right, EdgeKind::Normal).unwrap();

        let tree = StructureTree::build(&cfg, &AnalysisConfig::strict()).unwrap();
        let analysis = LiveOnAllPaths::new(&cfg, &symbols);
        let (bx, by) = (analysis.bit(x).unwrap(), analysis.bit(y).unwrap());
        for fast in [true, false] {
            let results = DataflowSolver::new(&analysis, &cfg, &tree)
                .with_gen_kill(fast)
                .solve()
                .unwrap();
            let at_entry = results.in_state(entry).unwrap();
            assert!(at_entry.contains(bx));
            assert!(!at_entry.contains(by));
            assert!(results.out_state(left).unwrap().is_empty());
        }
    }
}
