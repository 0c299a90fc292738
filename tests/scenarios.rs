//! End-to-end scenarios through [`Compilation`].
//!
//! Each scenario builds a small method, lets the compilation unit build its structure
//! on demand and checks the facts an optimizer would act on.

use structflow::{
    analyses::{Definition, Liveness, ReachingDefinitions},
    cfg::{Cfg, EdgeKind},
    compilation::Compilation,
    config::{AnalysisConfig, ExitExtractionPolicy},
    ir::{Node, Opcode, SymbolKind, SymbolTable},
    structure::ExtractionOutcome,
    utils::OrderedBitSet,
    Error, Result,
};

/// Diamond `0 -> {1, 2} -> 3` defining x in 0 and using it in 3.
fn diamond() -> Result<Compilation> {
    let mut symbols = SymbolTable::new();
    let x = symbols.add("x", SymbolKind::Local);
    let mut cfg = Cfg::new();
    let entry = cfg.add_block_with(vec![Node::store(x, Node::constant(1))]);
    let left = cfg.add_block();
    let right = cfg.add_block();
    let merge = cfg.add_block_with(vec![Node::ret(Some(Node::load(x)))]);
    cfg.add_edge(entry, left, EdgeKind::Normal)?;
    cfg.add_edge(entry, right, EdgeKind::Normal)?;
    cfg.add_edge(left, merge, EdgeKind::Normal)?;
    cfg.add_edge(right, merge, EdgeKind::Normal)?;
    Ok(Compilation::new("diamond", cfg, symbols, AnalysisConfig::default()))
}

/// Loop `1 <-> 2` exiting to 3, where 2 computes `a + b` with a and b set in 0.
fn invariant_loop() -> Result<(Compilation, Node)> {
    let mut symbols = SymbolTable::new();
    let a = symbols.add("a", SymbolKind::Local);
    let b = symbols.add("b", SymbolKind::Local);
    let t = symbols.add("t", SymbolKind::Local);
    let invariant = Node::binary(Opcode::Add, Node::load(a), Node::load(b));

    let mut cfg = Cfg::new();
    let entry = cfg.add_block_with(vec![
        Node::store(a, Node::constant(3)),
        Node::store(b, Node::constant(4)),
    ]);
    let header = cfg.add_block_with(vec![Node::branch(Node::binary(
        Opcode::CmpLt,
        Node::load(t),
        Node::constant(100),
    ))]);
    let body = cfg.add_block_with(vec![Node::store(t, invariant.clone())]);
    let after = cfg.add_block_with(vec![Node::ret(Some(Node::load(t)))]);
    cfg.add_edge(entry, header, EdgeKind::Normal)?;
    cfg.add_edge(header, body, EdgeKind::Normal)?;
    cfg.add_edge(body, header, EdgeKind::Normal)?;
    cfg.add_edge(header, after, EdgeKind::Normal)?;
    let unit = Compilation::new("invariant", cfg, symbols, AnalysisConfig::strict());
    Ok((unit, invariant))
}

fn latch_chain(policy: ExitExtractionPolicy) -> Result<Compilation> {
    let cfg = Cfg::from_edges(
        9,
        &[(0, 1), (1, 2), (2, 3), (3, 4), (4, 5), (5, 4), (5, 6), (6, 7), (7, 4), (7, 8)],
    )?;
    let config = AnalysisConfig {
        exit_extraction_policy: policy,
        ..AnalysisConfig::strict()
    };
    Ok(Compilation::new("latch", cfg, SymbolTable::new(), config))
}

#[test]
fn test_diamond_definition_and_liveness() -> Result<()> {
    let mut unit = diamond()?;
    let x = unit.symbols().iter().map(|(id, _)| id).next().ok_or(Error::UnknownBlock(0))?;

    let reaching = ReachingDefinitions::new(unit.cfg());
    let results = unit.solve(&reaching)?;
    let at_merge: Vec<Definition> = reaching
        .definitions(results.in_state(3).ok_or(Error::UnknownBlock(3))?)
        .copied()
        .collect();
    assert_eq!(at_merge, vec![Definition { block: 0, index: 0, symbol: x }]);

    let liveness = Liveness::new(unit.cfg(), unit.symbols());
    let results = unit.solve(&liveness)?;
    let bit = liveness.bit(x).ok_or(Error::UnknownBlock(0))?;
    for branch in [1, 2] {
        assert!(results.in_state(branch).is_some_and(|s| s.contains(bit)));
        assert!(results.out_state(branch).is_some_and(|s| s.contains(bit)));
    }
    assert!(results.in_state(0).is_some_and(|s| !s.contains(bit)));
    Ok(())
}

#[test]
fn test_invariant_anticipated_at_header() -> Result<()> {
    let (mut unit, invariant) = invariant_loop()?;
    let pre = unit.partial_redundancy()?;
    let e = pre.info().table().bit(&invariant).ok_or(Error::UnknownBlock(2))?;

    assert!(pre.anticipatable_in(1).is_some_and(|s| s.contains(e)));
    assert!(pre.earliest(1).is_some_and(|s| s.contains(e)));
    assert!(pre.earliest(2).is_some_and(|s| !s.contains(e)));
    Ok(())
}

#[test]
fn test_removed_latch_promotes_chain() -> Result<()> {
    let mut unit = latch_chain(ExitExtractionPolicy::Repair)?;
    unit.structure()?;
    let outcome = unit.remove_edge(7, 4, EdgeKind::Normal)?;
    assert_eq!(outcome, ExtractionOutcome::Extracted(vec![7, 6]));

    let tree = unit.structure()?;
    tree.check_structure()?;
    let header = tree.parent(tree.block_structure(5)?)?.ok_or(Error::NotARegion(5))?;
    let mut blocks = tree.blocks_in(header)?;
    blocks.sort_unstable();
    assert_eq!(blocks, vec![4, 5]);
    assert!(tree.region(header)?.is_natural_loop());
    Ok(())
}

#[test]
fn test_invalidate_policy_rebuilds_on_demand() -> Result<()> {
    let mut unit = latch_chain(ExitExtractionPolicy::Invalidate)?;
    unit.structure()?;
    let outcome = unit.remove_edge(7, 4, EdgeKind::Normal)?;
    assert_eq!(outcome, ExtractionOutcome::Invalidated);
    assert!(unit.tree().is_none());

    let tree = unit.structure()?;
    tree.check_structure()?;
    let header = tree.parent(tree.block_structure(5)?)?.ok_or(Error::NotARegion(5))?;
    let mut blocks = tree.blocks_in(header)?;
    blocks.sort_unstable();
    assert_eq!(blocks, vec![4, 5]);
    Ok(())
}
