#![no_main]

use libfuzzer_sys::fuzz_target;
use structflow::{
    cfg::{Cfg, EdgeKind, FlowGraph},
    compilation::Compilation,
    config::AnalysisConfig,
    ir::SymbolTable,
};

// Byte 0 picks the block count, byte pairs up to the first 0xff form the initial
// edges, and every following triple is one edit: opcode, source, target.
fuzz_target!(|data: &[u8]| {
    let Some((&count, rest)) = data.split_first() else {
        return;
    };
    let blocks = usize::from(count % 16) + 2;
    let split = rest.iter().position(|&b| b == 0xff).unwrap_or(rest.len());
    let (edges, edits) = rest.split_at(split);

    let mut chain: Vec<(usize, usize)> = (1..blocks).map(|b| (b - 1, b)).collect();
    for pair in edges.chunks_exact(2) {
        chain.push((usize::from(pair[0]) % blocks, usize::from(pair[1]) % blocks));
    }
    let Ok(cfg) = Cfg::from_edges(blocks, &chain) else {
        return;
    };
    let mut unit = Compilation::new("fuzz", cfg, SymbolTable::new(), AnalysisConfig::strict());

    for edit in edits.iter().skip(1).copied().collect::<Vec<u8>>().chunks_exact(3) {
        if unit.structure().is_err() {
            return;
        }
        let Some(tree) = unit.tree() else {
            return;
        };
        let from = usize::from(edit[1]) % blocks;
        let to = usize::from(edit[2]) % blocks;
        if !tree.has_block(from) || !tree.has_block(to) {
            continue;
        }
        let kind = if edit[0] & 0x80 == 0 { EdgeKind::Normal } else { EdgeKind::Exception };
        let result = match edit[0] % 3 {
            0 if to != unit.cfg().entry() => unit.add_edge(from, to, kind),
            1 if unit.cfg().has_edge(from, to, kind) => unit.remove_edge(from, to, kind).map(|_| ()),
            2 if from != to
                && unit.cfg().successors(from, EdgeKind::Normal).eq([to])
                && unit.cfg().predecessors(to, EdgeKind::Normal).eq([from]) =>
            {
                unit.merge_blocks(from, to)
            }
            _ => Ok(()),
        };
        if let Err(error) = result {
            if matches!(error, structflow::Error::InvalidMerge { .. }) {
                continue;
            }
            panic!("edit {edit:?} failed: {error}");
        }
        if let Some(tree) = unit.tree() {
            if let Err(error) = tree.check_structure() {
                panic!("invariant broken after {edit:?}: {error}");
            }
        }
    }
});
