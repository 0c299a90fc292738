//! Per-method compilation units and parallel compilation.
//!
//! A [`Compilation`] owns everything one method needs: its CFG, its symbols, its
//! structure tree and a cancellation token. Edits go through paired operations that
//! update the CFG and the structure tree together, so the tree never describes a
//! graph other than the current one. Independent compilations run in parallel through
//! [`compile_all`]; they share nothing but their read-only configuration and,
//! optionally, a cancellation token.

use rayon::prelude::*;

use crate::{
    analyses::PartialRedundancy,
    cfg::{Cfg, EdgeKind, FlowGraph},
    config::AnalysisConfig,
    dataflow::{BitVectorAnalysis, CancellationToken, DataflowResults, DataflowSolver},
    ir::SymbolTable,
    structure::{ExtractionOutcome, StructureTree},
    Result,
};

/// One method under optimization.
#[derive(Debug, Clone)]
pub struct Compilation {
    name: String,
    cfg: Cfg,
    symbols: SymbolTable,
    tree: Option<StructureTree>,
    config: AnalysisConfig,
    token: CancellationToken,
}

impl Compilation {
    /// Creates a compilation unit. The structure tree is built on first use.
    #[must_use]
    pub fn new(name: &str, cfg: Cfg, symbols: SymbolTable, config: AnalysisConfig) -> Self {
        Self {
            name: name.to_string(),
            cfg,
            symbols,
            tree: None,
            config,
            token: CancellationToken::new(),
        }
    }

    /// Shares `token` with this unit; every solve polls it.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.token = token;
        self
    }

    /// Returns the method name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the control flow graph.
    #[must_use]
    pub const fn cfg(&self) -> &Cfg {
        &self.cfg
    }

    /// Returns the symbol table.
    #[must_use]
    pub const fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Returns the cancellation token.
    #[must_use]
    pub const fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Returns the structure tree if one is built and still valid.
    #[must_use]
    pub fn tree(&self) -> Option<&StructureTree> {
        self.tree.as_ref().filter(|t| t.is_valid())
    }

    /// Returns the structure tree, building it from the CFG if it is absent or was
    /// invalidated.
    ///
    /// # Errors
    ///
    /// Fails if building fails, e.g. with [`crate::Error::ResourceExhausted`].
    pub fn structure(&mut self) -> Result<&StructureTree> {
        if self.tree().is_none() {
            self.rebuild_structure()?;
        }
        match &self.tree {
            Some(tree) => Ok(tree),
            None => Err(crate::Error::StructureInvalidated),
        }
    }

    /// Discards the structure tree and builds a new one from the CFG.
    ///
    /// # Errors
    ///
    /// Fails if building fails.
    pub fn rebuild_structure(&mut self) -> Result<()> {
        log::debug!("{}: building structure over {} blocks", self.name, self.cfg.len());
        self.tree = Some(StructureTree::build(&self.cfg, &self.config)?);
        Ok(())
    }

    /// Adds the edge `from -> to` to the CFG and the structure tree.
    ///
    /// Edges leaving blocks the tree does not hold (unreachable code) only change the
    /// CFG. An edge that makes a block with successors reachable invalidates the tree.
    ///
    /// # Errors
    ///
    /// Fails if a block is unknown or the tree cannot absorb the edge.
    pub fn add_edge(&mut self, from: usize, to: usize, kind: EdgeKind) -> Result<()> {
        if !self.cfg.add_edge(from, to, kind)? {
            return Ok(());
        }
        let Some(tree) = self.tree.as_mut().filter(|t| t.is_valid()) else {
            return Ok(());
        };
        if !tree.has_block(from) {
            log::debug!("{}: edge {from} -> {to} leaves unreachable code", self.name);
            return Ok(());
        }
        let reaches_new_code = !tree.has_block(to)
            && [EdgeKind::Normal, EdgeKind::Exception]
                .into_iter()
                .any(|k| self.cfg.successors(to, k).next().is_some());
        if reaches_new_code {
            log::debug!("{}: edge {from} -> {to} reaches unstructured code", self.name);
            tree.invalidate();
            return Ok(());
        }
        tree.add_edge(from, to, kind)
    }

    /// Removes the edge `from -> to` from the CFG and the structure tree, then moves
    /// nodes that no longer belong to their loop outwards.
    ///
    /// Edges leaving blocks the tree does not hold only change the CFG.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::UnknownEdge`] if the edge does not exist.
    pub fn remove_edge(&mut self, from: usize, to: usize, kind: EdgeKind) -> Result<ExtractionOutcome> {
        self.cfg.remove_edge(from, to, kind)?;
        let Some(tree) = self.tree.as_mut().filter(|t| t.is_valid() && t.has_block(from)) else {
            return Ok(ExtractionOutcome::Unchanged);
        };
        tree.remove_edge_of_kind(from, to, kind)?;
        let outcome = tree.extract_unconditional_exits(&[from])?;
        if outcome == ExtractionOutcome::Invalidated {
            log::debug!("{}: structure invalidated after removing {from} -> {to}", self.name);
        }
        Ok(outcome)
    }

    /// Appends block `survivor` to `merged` in the structure tree and the CFG. The
    /// `survivor` number is retired.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidMerge`] for merges the tree cannot represent and
    /// [`crate::Error::UnknownBlock`] if either block is missing from the CFG. Nothing
    /// is changed on error.
    pub fn merge_blocks(&mut self, merged: usize, survivor: usize) -> Result<()> {
        if merged == survivor {
            return Err(crate::Error::InvalidMerge { merged, survivor });
        }
        for block in [merged, survivor] {
            if !self.cfg.has_block(block) {
                return Err(crate::Error::UnknownBlock(block));
            }
        }
        if let Some(tree) = self.tree.as_mut().filter(|t| t.is_valid()) {
            tree.merge_blocks(merged, survivor)?;
        }
        self.cfg.merge_blocks(merged, survivor)
    }

    /// Solves `analysis` over this method.
    ///
    /// # Errors
    ///
    /// Fails if the structure cannot be built or the solve is interrupted.
    pub fn solve<A: BitVectorAnalysis>(&mut self, analysis: &A) -> Result<DataflowResults<A::Set>> {
        self.structure()?;
        let tree = self.tree.as_ref().ok_or(crate::Error::StructureInvalidated)?;
        DataflowSolver::new(analysis, &self.cfg, tree)
            .with_cancellation(self.token.clone())
            .solve()
    }

    /// Runs the partial redundancy pass chain over this method.
    ///
    /// # Errors
    ///
    /// Fails if the structure cannot be built or a pass is interrupted.
    pub fn partial_redundancy(&mut self) -> Result<PartialRedundancy> {
        self.structure()?;
        let tree = self.tree.as_ref().ok_or(crate::Error::StructureInvalidated)?;
        PartialRedundancy::run(&self.cfg, tree, &self.symbols, Some(&self.token))
    }
}

/// Runs `pass` over every unit in parallel.
///
/// Each unit is processed on a single worker; results come back in input order. A
/// failing unit does not affect the others.
pub fn compile_all<T, F>(units: &mut [Compilation], pass: F) -> Vec<Result<T>>
where
    T: Send,
    F: Fn(&mut Compilation) -> Result<T> + Sync,
{
    units.par_iter_mut().map(|unit| pass(unit)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        analyses::Liveness,
        test::factories::{cfg_from_edges, nested_loops, scenario_a, scenario_c_cfg},
        Error,
    };

    #[test]
    fn test_paired_edits_keep_tree_in_sync() {
        let mut unit = Compilation::new("c", scenario_c_cfg(), SymbolTable::new(), AnalysisConfig::strict());
        unit.structure().unwrap();
        let outcome = unit.remove_edge(7, 4, EdgeKind::Normal).unwrap();
        assert_eq!(outcome, ExtractionOutcome::Extracted(vec![7, 6]));
        assert!(!unit.cfg().has_edge(7, 4, EdgeKind::Normal));
        unit.tree().unwrap().check_structure().unwrap();

        unit.add_edge(8, 4, EdgeKind::Normal).unwrap();
        unit.tree().unwrap().check_structure().unwrap();
        assert_eq!(unit.tree().unwrap().block_successors(8).unwrap(), vec![(4, EdgeKind::Normal)]);
    }

    #[test]
    fn test_compile_all_in_parallel() {
        let mut units: Vec<Compilation> = (0..8)
            .map(|i| {
                let (method, _) = scenario_a();
                Compilation::new(&format!("m{i}"), method.cfg, method.symbols, AnalysisConfig::default())
            })
            .collect();
        let results = compile_all(&mut units, |unit| {
            let liveness = Liveness::new(unit.cfg(), unit.symbols());
            let results = unit.solve(&liveness)?;
            Ok(results.block_count())
        });
        assert!(results.iter().all(|r| r == &Ok(4)));
    }

    #[test]
    fn test_shared_token_cancels_units() {
        let token = CancellationToken::new();
        let mut units = vec![
            Compilation::new("a", nested_loops(), SymbolTable::new(), AnalysisConfig::default())
                .with_cancellation(token.clone()),
        ];
        token.cancel();
        let results = compile_all(&mut units, |unit| {
            let analysis = crate::analyses::ReachingBlocks::new(unit.cfg());
            unit.solve(&analysis).map(|r| r.block_count())
        });
        assert_eq!(results, vec![Err(Error::Interrupted)]);
    }

    #[test]
    fn test_edits_from_unreachable_block_only_touch_cfg() {
        let mut unit = Compilation::new("u", cfg_from_edges(3, &[(0, 1)]), SymbolTable::new(), AnalysisConfig::strict());
        unit.structure().unwrap();
        assert!(!unit.tree().unwrap().has_block(2));

        unit.add_edge(2, 1, EdgeKind::Normal).unwrap();
        assert!(unit.cfg().has_edge(2, 1, EdgeKind::Normal));
        unit.tree().unwrap().check_structure().unwrap();

        let outcome = unit.remove_edge(2, 1, EdgeKind::Normal).unwrap();
        assert_eq!(outcome, ExtractionOutcome::Unchanged);
        assert!(!unit.cfg().has_edge(2, 1, EdgeKind::Normal));
        unit.tree().unwrap().check_structure().unwrap();
    }

    #[test]
    fn test_edge_into_unstructured_code_invalidates() {
        let cfg = cfg_from_edges(4, &[(0, 1), (2, 3)]);
        let mut unit = Compilation::new("u", cfg, SymbolTable::new(), AnalysisConfig::default());
        unit.structure().unwrap();

        unit.add_edge(1, 2, EdgeKind::Normal).unwrap();
        assert!(unit.tree().is_none());
        let tree = unit.structure().unwrap();
        assert!(tree.has_block(2) && tree.has_block(3));
        tree.check_structure().unwrap();
    }

    #[test]
    fn test_merge_into_stale_loop_header() {
        let cfg = cfg_from_edges(4, &[(0, 1), (1, 2), (2, 1), (1, 3)]);
        let mut unit = Compilation::new("m", cfg, SymbolTable::new(), AnalysisConfig::default());
        unit.structure().unwrap();
        unit.remove_edge(1, 2, EdgeKind::Normal).unwrap();

        unit.merge_blocks(1, 3).unwrap();
        assert!(!unit.cfg().has_block(3));
        assert!(unit.tree().is_none());
        unit.structure().unwrap().check_structure().unwrap();
    }

    #[test]
    fn test_rejected_merge_changes_nothing() {
        let mut unit = Compilation::new("m", nested_loops(), SymbolTable::new(), AnalysisConfig::default());
        unit.structure().unwrap();
        let blocks = unit.cfg().len();
        assert_eq!(unit.merge_blocks(0, 99), Err(Error::UnknownBlock(99)));
        assert_eq!(unit.cfg().len(), blocks);
        assert!(unit.tree().is_some());
    }
}
