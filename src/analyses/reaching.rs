//! Reaching definitions and reaching blocks.
//!
//! Reaching definitions computes, for each program point, which store statements may
//! reach that point without an intervening store to the same symbol.
//!
//! # Algorithm
//!
//! For each block B:
//! - `GEN[B]` = stores in B not followed by another store to the same symbol in B
//! - `KILL[B]` = every other store to a symbol that B stores to
//! - `IN[B]` = ∪{OUT[P] | P is a predecessor of B}
//! - `OUT[B]` = GEN[B] ∪ (IN[B] - KILL[B])
//!
//! Reaching blocks is the degenerate case with one bit per block, `GEN[B] = {B}` and
//! nothing killed: a block reaches a point if some path leads from it to that point.

use std::collections::HashMap;

use crate::{
    cfg::FlowGraph,
    dataflow::{AnalysisKind, BitVectorAnalysis, Confluence, Direction, GenKill},
    ir::{Node, SymbolId},
    utils::{BitSet, OrderedBitSet, SparseBitSet},
};

/// A store statement, identified by its position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Definition {
    /// Block containing the store
    pub block: usize,
    /// Index of the store among the block's statements
    pub index: usize,
    /// The stored symbol
    pub symbol: SymbolId,
}

/// Reaching definitions analysis.
///
/// Every store of the method gets one bit, numbered by block then statement order.
/// Sets are sparse since only a few definitions reach any one point of a large method.
///
/// # Example
///
/// ```rust,ignore
/// let analysis = ReachingDefinitions::new(&cfg);
/// let results = DataflowSolver::new(&analysis, &cfg, &tree).solve()?;
///
/// if let Some(reaching) = results.in_state(block) {
///     for def in analysis.definitions(reaching) {
///         println!("store in block {} reaches block {}", def.block, block);
///     }
/// }
/// ```
pub struct ReachingDefinitions {
    definitions: Vec<Definition>,
    by_position: HashMap<(usize, usize), usize>,
    by_symbol: HashMap<SymbolId, Vec<usize>>,
}

impl ReachingDefinitions {
    /// Numbers every store of `cfg`.
    #[must_use]
    pub fn new<G: FlowGraph>(cfg: &G) -> Self {
        let mut blocks: Vec<usize> = cfg.block_numbers().collect();
        blocks.sort_unstable();

        let mut definitions = Vec::new();
        let mut by_position = HashMap::new();
        let mut by_symbol: HashMap<SymbolId, Vec<usize>> = HashMap::new();
        for block in blocks {
            for (index, statement) in cfg.statements(block).iter().enumerate() {
                if let Some(symbol) = statement.stored_symbol() {
                    let bit = definitions.len();
                    definitions.push(Definition {
                        block,
                        index,
                        symbol,
                    });
                    by_position.insert((block, index), bit);
                    by_symbol.entry(symbol).or_default().push(bit);
                }
            }
        }
        Self {
            definitions,
            by_position,
            by_symbol,
        }
    }

    /// Returns the bit of the store at `index` in `block`.
    #[must_use]
    pub fn bit(&self, block: usize, index: usize) -> Option<usize> {
        self.by_position.get(&(block, index)).copied()
    }

    /// Returns the definition behind `bit`.
    #[must_use]
    pub fn definition(&self, bit: usize) -> Option<&Definition> {
        self.definitions.get(bit)
    }

    /// Maps a result set back to definitions.
    pub fn definitions<'a>(&'a self, set: &'a SparseBitSet) -> impl Iterator<Item = &'a Definition> + 'a {
        set.iter_ones().filter_map(|bit| self.definitions.get(bit))
    }

    fn statement_effect(&self, block: usize, index: usize, statement: &Node) -> GenKill<SparseBitSet> {
        let width = self.definitions.len();
        let mut gen = SparseBitSet::new(width);
        let mut kill = SparseBitSet::new(width);
        if let (Some(symbol), Some(bit)) = (statement.stored_symbol(), self.bit(block, index)) {
            for &other in self.by_symbol.get(&symbol).into_iter().flatten() {
                kill.insert(other);
            }
            gen.insert(bit);
        }
        GenKill::new(gen, kill)
    }
}

impl BitVectorAnalysis for ReachingDefinitions {
    type Set = SparseBitSet;
    const DIRECTION: Direction = Direction::Forward;
    const CONFLUENCE: Confluence = Confluence::Union;

    fn kind(&self) -> AnalysisKind {
        AnalysisKind::ReachingDefinitions
    }

    fn bit_count(&self) -> usize {
        self.definitions.len()
    }

    fn supports_gen_and_kill(&self) -> bool {
        true
    }

    fn block_gen_kill(&self, block: usize, statements: &[Node]) -> GenKill<SparseBitSet> {
        statements.iter().enumerate().fold(
            GenKill::identity(self.bit_count()),
            |acc, (index, statement)| acc.then(&self.statement_effect(block, index, statement)),
        )
    }

    fn transfer_block(&self, block: usize, statements: &[Node], set: &mut SparseBitSet) {
        for (index, statement) in statements.iter().enumerate() {
            self.statement_effect(block, index, statement)
                .apply_in_place(set);
        }
    }
}

/// Reaching blocks analysis: which blocks may execute before a given point.
pub struct ReachingBlocks {
    width: usize,
}

impl ReachingBlocks {
    /// Creates the analysis with one bit per block number of `cfg`.
    #[must_use]
    pub fn new<G: FlowGraph>(cfg: &G) -> Self {
        Self {
            width: cfg.number_bound(),
        }
    }
}

impl BitVectorAnalysis for ReachingBlocks {
    type Set = BitSet;
    const DIRECTION: Direction = Direction::Forward;
    const CONFLUENCE: Confluence = Confluence::Union;

    fn kind(&self) -> AnalysisKind {
        AnalysisKind::ReachingBlocks
    }

    fn bit_count(&self) -> usize {
        self.width
    }

    fn supports_gen_and_kill(&self) -> bool {
        true
    }

    fn block_gen_kill(&self, block: usize, _statements: &[Node]) -> GenKill<BitSet> {
        let mut gen = BitSet::new(self.width);
        if block < self.width {
            gen.insert(block);
        }
        GenKill::new(gen, BitSet::new(self.width))
    }

    fn transfer_block(&self, block: usize, _statements: &[Node], set: &mut BitSet) {
        if block < self.width {
            set.insert(block);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::AnalysisConfig,
        dataflow::DataflowSolver,
        structure::StructureTree,
        test::factories::{nested_loops, scenario_a, straight_line},
    };

    #[test]
    fn test_definition_reaches_merge() {
        let (method, x) = scenario_a();
        let tree = StructureTree::build(&method.cfg, &AnalysisConfig::strict()).unwrap();
        let analysis = ReachingDefinitions::new(&method.cfg);
        let results = DataflowSolver::new(&analysis, &method.cfg, &tree).solve().unwrap();
        let reaching: Vec<_> = analysis
            .definitions(results.in_state(3).unwrap())
            .copied()
            .collect();
        assert_eq!(
            reaching,
            vec![Definition {
                block: 0,
                index: 0,
                symbol: x
            }]
        );
    }

    #[test]
    fn test_later_store_kills_earlier() {
        let (method, [x, _, _]) = straight_line();
        let analysis = ReachingDefinitions::new(&method.cfg);
        let tree = StructureTree::build(&method.cfg, &AnalysisConfig::strict()).unwrap();
        for fast in [true, false] {
            let results = DataflowSolver::new(&analysis, &method.cfg, &tree)
                .with_gen_kill(fast)
                .solve()
                .unwrap();
            let last = method.cfg.len() - 1;
            let stores_of_x: Vec<_> = analysis
                .definitions(results.out_state(last).unwrap())
                .filter(|d| d.symbol == x)
                .collect();
            assert_eq!(stores_of_x.len(), 1);
        }
    }

    #[test]
    fn test_reaching_blocks_in_loops() {
        let cfg = nested_loops();
        let tree = StructureTree::build(&cfg, &AnalysisConfig::strict()).unwrap();
        let results = DataflowSolver::new(&ReachingBlocks::new(&cfg), &cfg, &tree)
            .solve()
            .unwrap();
        assert!(results.in_state(2).unwrap().iter_ones().eq([0, 1, 2, 3, 4]));
        assert!(!results.in_state(1).unwrap().contains(5));
    }
}
