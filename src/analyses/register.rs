//! Register save and restore placement.
//!
//! Both analyses take a per-block set of the registers a block uses and find where
//! that use is guaranteed:
//!
//! - [`RegisterAnticipatability`]: backward intersection, `IN[B]` = `USE[B]` ∪ `OUT[B]`.
//!   A register in `IN[B]` is used on every path from the start of B.
//! - [`RegisterAvailability`]: forward intersection, `OUT[B]` = `USE[B]` ∪ `IN[B]`.
//!   A register in `OUT[B]` has been used on every path to the end of B.
//!
//! Saves go where a register becomes anticipatable; restores where it stops being
//! available.

use std::collections::HashMap;

use crate::{
    dataflow::{AnalysisKind, BitVectorAnalysis, Confluence, Direction, GenKill},
    ir::Node,
    utils::{BitSet, OrderedBitSet},
    Error, Result,
};

fn usage_effects(width: usize, usage: &HashMap<usize, BitSet>) -> Result<HashMap<usize, GenKill<BitSet>>> {
    usage
        .iter()
        .map(|(&block, used)| {
            if used.width() == width {
                Ok((block, GenKill::new(used.clone(), BitSet::new(width))))
            } else {
                Err(Error::WidthMismatch {
                    expected: width,
                    found: used.width(),
                })
            }
        })
        .collect()
}

/// Registers used on every path forward.
pub struct RegisterAnticipatability {
    width: usize,
    effects: HashMap<usize, GenKill<BitSet>>,
}

impl RegisterAnticipatability {
    /// Creates the analysis over `width` registers.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WidthMismatch`] if a usage set is not `width` wide.
    pub fn new(width: usize, usage: &HashMap<usize, BitSet>) -> Result<Self> {
        Ok(Self {
            width,
            effects: usage_effects(width, usage)?,
        })
    }
}

impl BitVectorAnalysis for RegisterAnticipatability {
    type Set = BitSet;
    const DIRECTION: Direction = Direction::Backward;
    const CONFLUENCE: Confluence = Confluence::Intersection;

    fn kind(&self) -> AnalysisKind {
        AnalysisKind::RegisterAnticipatability
    }

    fn bit_count(&self) -> usize {
        self.width
    }

    fn supports_gen_and_kill(&self) -> bool {
        true
    }

    fn block_gen_kill(&self, block: usize, _statements: &[Node]) -> GenKill<BitSet> {
        self.effects
            .get(&block)
            .cloned()
            .unwrap_or_else(|| GenKill::identity(self.width))
    }

    fn transfer_block(&self, block: usize, _statements: &[Node], set: &mut BitSet) {
        if let Some(effect) = self.effects.get(&block) {
            effect.apply_in_place(set);
        }
    }
}

/// Registers used on every path backward.
pub struct RegisterAvailability {
    width: usize,
    effects: HashMap<usize, GenKill<BitSet>>,
}

impl RegisterAvailability {
    /// Creates the analysis over `width` registers.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WidthMismatch`] if a usage set is not `width` wide.
    pub fn new(width: usize, usage: &HashMap<usize, BitSet>) -> Result<Self> {
        Ok(Self {
            width,
            effects: usage_effects(width, usage)?,
        })
    }
}

impl BitVectorAnalysis for RegisterAvailability {
    type Set = BitSet;
    const DIRECTION: Direction = Direction::Forward;
    const CONFLUENCE: Confluence = Confluence::Intersection;

    fn kind(&self) -> AnalysisKind {
        AnalysisKind::RegisterAvailability
    }

    fn bit_count(&self) -> usize {
        self.width
    }

    fn supports_gen_and_kill(&self) -> bool {
        true
    }

    fn block_gen_kill(&self, block: usize, _statements: &[Node]) -> GenKill<BitSet> {
        self.effects
            .get(&block)
            .cloned()
            .unwrap_or_else(|| GenKill::identity(self.width))
    }

    fn transfer_block(&self, block: usize, _statements: &[Node], set: &mut BitSet) {
        if let Some(effect) = self.effects.get(&block) {
            effect.apply_in_place(set);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::AnalysisConfig, dataflow::DataflowSolver, structure::StructureTree,
        test::factories::cfg_from_edges,
    };

    fn regs(bits: &[usize]) -> BitSet {
        let mut set = BitSet::new(3);
        for &b in bits {
            set.insert(b);
        }
        set
    }

    #[test]
    fn test_register_use_on_both_arms() {
        // 0 -> {1, 2} -> 3, register 0 used on both arms, register 1 on one
        let cfg = cfg_from_edges(4, &[(0, 1), (0, 2), (1, 3), (2, 3)]);
        let tree = StructureTree::build(&cfg, &AnalysisConfig::strict()).unwrap();
        let usage: HashMap<usize, BitSet> = [(1, regs(&[0, 1])), (2, regs(&[0]))].into_iter().collect();

        let anticipatable = RegisterAnticipatability::new(3, &usage).unwrap();
        let results = DataflowSolver::new(&anticipatable, &cfg, &tree).solve().unwrap();
        assert_eq!(results.in_state(0), Some(&regs(&[0])));
        assert_eq!(results.in_state(3), Some(&regs(&[])));

        let available = RegisterAvailability::new(3, &usage).unwrap();
        let results = DataflowSolver::new(&available, &cfg, &tree).solve().unwrap();
        assert_eq!(results.in_state(3), Some(&regs(&[0])));
        assert_eq!(results.out_state(1), Some(&regs(&[0, 1])));
    }

    #[test]
    fn test_usage_width_checked() {
        let usage: HashMap<usize, BitSet> = [(0, BitSet::new(5))].into_iter().collect();
        assert!(matches!(
            RegisterAvailability::new(3, &usage),
            Err(Error::WidthMismatch { expected: 3, found: 5 })
        ));
    }
}
