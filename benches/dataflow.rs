//! Benchmarks for structure building and dataflow solving.
//!
//! Measures performance on synthetic methods of growing size:
//! - Structure tree construction over nested loops
//! - Liveness on the gen/kill summary path and the statement path
//! - Reaching definitions with sparse sets
//! - The full partial redundancy chain

extern crate structflow;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::hint::black_box;
use structflow::{
    analyses::{Liveness, PartialRedundancy, ReachingDefinitions},
    cfg::{Cfg, EdgeKind},
    config::AnalysisConfig,
    dataflow::DataflowSolver,
    ir::{Node, Opcode, SymbolId, SymbolKind, SymbolTable},
    structure::StructureTree,
};

/// Builds `loops` sequential loops, each a header, a body with a nested self loop and
/// a latch, all computing over eight locals.
fn synthetic_method(loops: usize) -> (Cfg, SymbolTable) {
    let mut symbols = SymbolTable::new();
    let locals: Vec<SymbolId> = (0..8)
        .map(|i| symbols.add(&format!("v{i}"), SymbolKind::Local))
        .collect();
    let statement = |i: usize| {
        let target = locals[i % locals.len()];
        let lhs = locals[(i + 3) % locals.len()];
        let rhs = locals[(i + 5) % locals.len()];
        Node::store(
            target,
            Node::binary(Opcode::Add, Node::load(lhs), Node::load(rhs)),
        )
    };

    let mut cfg = Cfg::new();
    let mut previous = cfg.add_block_with(vec![statement(0), statement(1)]);
    for l in 0..loops {
        let header = cfg.add_block_with(vec![Node::branch(Node::load(locals[l % 8]))]);
        let body = cfg.add_block_with(vec![statement(l), statement(l + 1)]);
        let latch = cfg.add_block_with(vec![statement(l + 2)]);
        cfg.add_edge(previous, header, EdgeKind::Normal).unwrap();
        cfg.add_edge(header, body, EdgeKind::Normal).unwrap();
        cfg.add_edge(body, body, EdgeKind::Normal).unwrap();
        cfg.add_edge(body, latch, EdgeKind::Normal).unwrap();
        cfg.add_edge(latch, header, EdgeKind::Normal).unwrap();
        previous = header;
    }
    let exit = cfg.add_block_with(vec![Node::ret(Some(Node::load(locals[0])))]);
    cfg.add_edge(previous, exit, EdgeKind::Normal).unwrap();
    (cfg, symbols)
}

fn bench_structure_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("structure_build");
    for loops in [10, 100, 400] {
        let (cfg, _) = synthetic_method(loops);
        group.bench_with_input(BenchmarkId::from_parameter(loops), &cfg, |b, cfg| {
            b.iter(|| {
                let tree = StructureTree::build(black_box(cfg), &AnalysisConfig::fast()).unwrap();
                black_box(tree)
            });
        });
    }
    group.finish();
}

fn bench_liveness(c: &mut Criterion) {
    let mut group = c.benchmark_group("liveness");
    for loops in [10, 100, 400] {
        let (cfg, symbols) = synthetic_method(loops);
        let tree = StructureTree::build(&cfg, &AnalysisConfig::fast()).unwrap();
        let liveness = Liveness::new(&cfg, &symbols);
        for gen_kill in [true, false] {
            let name = if gen_kill { "summaries" } else { "statements" };
            group.bench_with_input(BenchmarkId::new(name, loops), &loops, |b, _| {
                b.iter(|| {
                    let results = DataflowSolver::new(&liveness, &cfg, &tree)
                        .with_gen_kill(gen_kill)
                        .solve()
                        .unwrap();
                    black_box(results)
                });
            });
        }
    }
    group.finish();
}

fn bench_reaching_definitions(c: &mut Criterion) {
    let (cfg, _) = synthetic_method(200);
    let tree = StructureTree::build(&cfg, &AnalysisConfig::fast()).unwrap();
    let analysis = ReachingDefinitions::new(&cfg);

    c.bench_function("reaching_definitions_200", |b| {
        b.iter(|| {
            let results = DataflowSolver::new(&analysis, &cfg, &tree).solve().unwrap();
            black_box(results)
        });
    });
}

fn bench_partial_redundancy(c: &mut Criterion) {
    let (cfg, symbols) = synthetic_method(100);
    let tree = StructureTree::build(&cfg, &AnalysisConfig::fast()).unwrap();

    c.bench_function("partial_redundancy_100", |b| {
        b.iter(|| {
            let pre = PartialRedundancy::run(black_box(&cfg), &tree, &symbols, None).unwrap();
            black_box(pre)
        });
    });
}

criterion_group!(
    benches,
    bench_structure_build,
    bench_liveness,
    bench_reaching_definitions,
    bench_partial_redundancy
);
criterion_main!(benches);
