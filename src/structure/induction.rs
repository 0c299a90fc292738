//! Loop metadata: basic induction variables and loop marks.

use std::collections::{HashMap, HashSet};

use crate::{
    cfg::{EdgeKind, FlowGraph},
    ir::{Node, Opcode, SymbolId},
    structure::{InductionVariable, RegionFlags, StructureId, StructureTree},
    Result,
};

/// Returns the constant step if `value` is `x + c`, `c + x` or `x - c`.
fn step_of(symbol: SymbolId, value: &Node) -> Option<i64> {
    let is_self = |n: &Node| n.opcode() == Opcode::Load && n.symbol() == Some(symbol);
    let constant = |n: &Node| (n.opcode() == Opcode::Const).then(|| n.value());
    match (value.opcode(), value.children()) {
        (Opcode::Add, [lhs, rhs]) if is_self(lhs) => constant(rhs),
        (Opcode::Add, [lhs, rhs]) if is_self(rhs) => constant(lhs),
        (Opcode::Sub, [lhs, rhs]) if is_self(lhs) => constant(rhs).map(i64::wrapping_neg),
        _ => None,
    }
}

/// Returns `n` if `condition` is `x < n`.
fn bound_of(symbol: SymbolId, condition: &Node) -> Option<i64> {
    match (condition.opcode(), condition.children()) {
        (Opcode::CmpLt, [lhs, rhs])
            if lhs.opcode() == Opcode::Load
                && lhs.symbol() == Some(symbol)
                && rhs.opcode() == Opcode::Const =>
        {
            Some(rhs.value())
        }
        _ => None,
    }
}

impl StructureTree {
    /// Records `variable` on `region`, replacing any earlier entry for the same symbol.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::NotARegion`] if `region` is a block.
    pub fn add_induction_variable(
        &mut self,
        region: StructureId,
        variable: InductionVariable,
    ) -> Result<()> {
        let region = self.region_mut(region)?;
        region
            .induction_variables
            .retain(|v| v.symbol != variable.symbol);
        region.induction_variables.push(variable);
        Ok(())
    }

    /// Marks or unmarks `region` as a canonicalized loop.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::NotARegion`] if `region` is a block.
    pub fn set_canonicalized_loop(&mut self, region: StructureId, value: bool) -> Result<()> {
        self.region_mut(region)?
            .flags
            .set(RegionFlags::CANONICALIZED_LOOP, value);
        Ok(())
    }

    /// Finds the basic induction variables of every natural loop and records them.
    ///
    /// A variable qualifies when it is stored exactly once inside the loop and that
    /// store adds a constant to the variable itself. Its entry value is taken from the
    /// last store in the single block entering the loop, and its exit bound from a
    /// branch testing `x < n` inside the loop. Returns the number of variables found.
    ///
    /// # Errors
    ///
    /// Fails if the tree is invalidated or inconsistent.
    pub fn detect_induction_variables<G: FlowGraph>(&mut self, cfg: &G) -> Result<usize> {
        let loops: Vec<StructureId> = self
            .iter()
            .filter(|(_, s)| s.as_region().is_some_and(|r| r.is_natural_loop()))
            .map(|(id, _)| id)
            .collect();

        let mut found = 0;
        for lp in loops {
            let blocks: HashSet<usize> = self.blocks_in(lp)?.into_iter().collect();
            let header = self.get(lp)?.number;

            let mut stores: HashMap<SymbolId, Vec<&Node>> = HashMap::new();
            for &block in &blocks {
                for statement in cfg.statements(block) {
                    if let Some(symbol) = statement.stored_symbol() {
                        stores.entry(symbol).or_default().push(statement);
                    }
                }
            }

            let outside_preds: Vec<usize> = cfg
                .predecessors(header, EdgeKind::Normal)
                .filter(|p| !blocks.contains(p))
                .collect();

            let mut variables = Vec::new();
            for (symbol, defs) in stores {
                let [def] = defs.as_slice() else { continue };
                let Some(increment) = def.children().first().and_then(|v| step_of(symbol, v)) else {
                    continue;
                };

                let entry_value = match outside_preds.as_slice() {
                    [pred] => cfg
                        .statements(*pred)
                        .iter()
                        .rev()
                        .find(|s| s.stored_symbol() == Some(symbol))
                        .and_then(|s| s.children().first())
                        .filter(|v| v.opcode() == Opcode::Const)
                        .map(Node::value),
                    _ => None,
                };
                let exit_bound = blocks.iter().find_map(|&b| {
                    cfg.statements(b)
                        .iter()
                        .filter(|s| s.opcode() == Opcode::Branch)
                        .find_map(|s| s.children().first().and_then(|c| bound_of(symbol, c)))
                });

                variables.push(InductionVariable {
                    symbol,
                    entry_value,
                    increment,
                    exit_bound,
                });
            }

            variables.sort_by_key(|v| v.symbol);
            found += variables.len();
            for variable in variables {
                self.add_induction_variable(lp, variable)?;
            }
        }
        log::debug!("found {found} induction variables");
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        cfg::{Cfg, EdgeKind},
        config::AnalysisConfig,
        ir::{Node, Opcode, SymbolId},
        structure::StructureTree,
    };

    #[test]
    fn test_detect_counting_loop() {
        let i = SymbolId::new(0);
        let mut cfg = Cfg::new();
        let entry = cfg.add_block_with(vec![Node::store(i, Node::constant(0))]);
        let header = cfg.add_block_with(vec![Node::branch(Node::binary(
            Opcode::CmpLt,
            Node::load(i),
            Node::constant(10),
        ))]);
        let body = cfg.add_block_with(vec![Node::store(
            i,
            Node::binary(Opcode::Add, Node::load(i), Node::constant(1)),
        )]);
        let exit = cfg.add_block();
        cfg.add_edge(entry, header, EdgeKind::Normal).unwrap();
        cfg.add_edge(header, body, EdgeKind::Normal).unwrap();
        cfg.add_edge(body, header, EdgeKind::Normal).unwrap();
        cfg.add_edge(header, exit, EdgeKind::Normal).unwrap();

        let mut tree = StructureTree::build(&cfg, &AnalysisConfig::default()).unwrap();
        assert_eq!(tree.detect_induction_variables(&cfg).unwrap(), 1);

        let lp = tree.parent(tree.block_structure(header).unwrap()).unwrap().unwrap();
        let iv = tree.region(lp).unwrap().induction_variables()[0];
        assert_eq!(iv.symbol, i);
        assert_eq!(iv.entry_value, Some(0));
        assert_eq!(iv.increment, 1);
        assert_eq!(iv.exit_bound, Some(10));

        tree.set_canonicalized_loop(lp, true).unwrap();
        assert!(tree.region(lp).unwrap().is_canonicalized_loop());
    }
}
