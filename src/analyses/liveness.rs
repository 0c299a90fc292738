//! Live variable analysis.
//!
//! A local is *live* at a program point if some path from that point reaches a load
//! of the local without passing a store to it.
//!
//! # Uses
//!
//! - **Dead store elimination**: a store whose target is not live afterwards is dead
//! - **Register allocation**: locals live at the same time interfere
//!
//! # Algorithm
//!
//! This is a backward union analysis over locals and parameters:
//!
//! - `USE[B]` = locals loaded in B before any store to them
//! - `DEF[B]` = locals stored in B
//! - `OUT[B]` = ∪{IN[S] | S is a successor of B}
//! - `IN[B]` = USE[B] ∪ (OUT[B] - DEF[B])

use std::collections::HashMap;

use crate::{
    analyses::LocalIndex,
    cfg::FlowGraph,
    dataflow::{AnalysisKind, BitVectorAnalysis, Confluence, Direction, GenKill},
    ir::{Node, SymbolId, SymbolTable},
    utils::{BitSet, OrderedBitSet},
};

/// Live variable analysis.
///
/// # Example
///
/// ```rust,ignore
/// let liveness = Liveness::new(&cfg, &symbols);
/// let results = DataflowSolver::new(&liveness, &cfg, &tree).solve()?;
///
/// // Locals live at the exit of a block
/// if let Some(live) = results.out_state(block) {
///     for symbol in liveness.symbols(live) {
///         println!("{symbol:?} is live at the exit of block {block}");
///     }
/// }
/// ```
pub struct Liveness {
    locals: LocalIndex,
    /// USE and DEF of every block, as a gen/kill pair
    effects: HashMap<usize, GenKill<BitSet>>,
}

impl Liveness {
    /// Creates a live variable analysis for the method described by `cfg` and `symbols`.
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

    /// Returns the local numbering.
    #[must_use]
    pub const fn locals(&self) -> &LocalIndex {
        &self.locals
    }

    /// Returns the USE set for a block.
    #[must_use]
    pub fn use_set(&self, block: usize) -> Option<&BitSet> {
        self.effects.get(&block).map(|e| &e.gen)
    }

    /// Returns the DEF set for a block, without the locals it also uses first.
    #[must_use]
    pub fn def_set(&self, block: usize) -> Option<&BitSet> {
        self.effects.get(&block).map(|e| &e.kill)
    }

    /// Maps a result set back to symbols.
    pub fn symbols<'a>(&'a self, set: &'a BitSet) -> impl Iterator<Item = SymbolId> + 'a {
        set.iter_ones().filter_map(|bit| self.locals.symbol(bit))
    }
}

impl BitVectorAnalysis for Liveness {
    type Set = BitSet;
    const DIRECTION: Direction = Direction::Backward;
    const CONFLUENCE: Confluence = Confluence::Union;

    fn kind(&self) -> AnalysisKind {
        AnalysisKind::Liveness
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
        ir::{Opcode, SymbolKind},
        structure::StructureTree,
        test::factories::scenario_a,
    };

    #[test]
    fn test_liveness_diamond() {
        let (method, x) = scenario_a();
        let tree = StructureTree::build(&method.cfg, &AnalysisConfig::strict()).unwrap();
        let liveness = Liveness::new(&method.cfg, &method.symbols);
        let bit = liveness.bit(x).unwrap();
        for fast in [true, false] {
            let results = DataflowSolver::new(&liveness, &method.cfg, &tree)
                .with_gen_kill(fast)
                .solve()
                .unwrap();
            assert!(results.in_state(1).unwrap().contains(bit));
            assert!(results.in_state(2).unwrap().contains(bit));
            assert!(results.out_state(0).unwrap().contains(bit));
            assert!(!results.in_state(0).unwrap().contains(bit));
            assert!(results.out_state(3).unwrap().is_empty());
        }
    }

    #[test]
    fn test_loop_carried_local_stays_live() {
        let mut symbols = SymbolTable::new();
        let i = symbols.add("i", SymbolKind::Local);
        let mut cfg = Cfg::new();
        let init = cfg.add_block_with(vec![Node::store(i, Node::constant(0))]);
        let header = cfg.add_block_with(vec![Node::branch(Node::binary(
            Opcode::CmpLt,
            Node::load(i),
            Node::constant(10),
        ))]);
        let body = cfg.add_block_with(vec![Node::store(
            i,
            Node::binary(Opcode::Add, Node::load(i), Node::constant(1)),
        )]);
        let exit = cfg.add_block_with(vec![Node::ret(None)]);
        for (from, to) in [(init, header), (header, body), (body, header), (header, exit)] {
            cfg.add_edge(from, to, EdgeKind::Normal).unwrap();
        }

        let tree = StructureTree::build(&cfg, &AnalysisConfig::strict()).unwrap();
        let liveness = Liveness::new(&cfg, &symbols);
        let results = DataflowSolver::new(&liveness, &cfg, &tree).solve().unwrap();
        assert!(results.out_state(body).unwrap().contains(0));
        assert!(results.in_state(header).unwrap().contains(0));
        assert!(!results.in_state(exit).unwrap().contains(0));
        assert_eq!(liveness.symbols(results.in_state(body).unwrap()).collect::<Vec<_>>(), vec![i]);
    }
}
