//! CFG factories used across the unit tests.

use crate::{
    cfg::{Cfg, EdgeKind},
    ir::{Node, Opcode, SymbolId, SymbolKind, SymbolTable},
};

// Helper function to create a CFG of empty blocks from normal edges
pub fn cfg_from_edges(block_count: usize, edges: &[(usize, usize)]) -> Cfg {
    Cfg::from_edges(block_count, edges).unwrap()
}

// Outer loop headed by 1 around an inner loop headed by 2, leaving to 5
pub fn nested_loops() -> Cfg {
    cfg_from_edges(6, &[(0, 1), (1, 2), (2, 3), (3, 2), (3, 4), (4, 1), (1, 5)])
}

// Two-entry cycle between 1 and 2
pub fn irreducible() -> Cfg {
    cfg_from_edges(4, &[(0, 1), (0, 2), (1, 2), (2, 1), (1, 3), (2, 3)])
}

// Loop headed by 4 with latch chain 5 -> 6 -> 7 -> 4 and exit 7 -> 8
pub fn scenario_c_cfg() -> Cfg {
    cfg_from_edges(
        9,
        &[
            (0, 1),
            (1, 2),
            (2, 3),
            (3, 4),
            (4, 5),
            (5, 4),
            (5, 6),
            (6, 7),
            (7, 4),
            (7, 8),
        ],
    )
}

/// A method with its symbols.
pub struct Method {
    pub cfg: Cfg,
    pub symbols: SymbolTable,
}

// Diamond 0 -> {1, 2} -> 3 defining x in 0 and using it in 3
pub fn scenario_a() -> (Method, SymbolId) {
    let mut symbols = SymbolTable::new();
    let x = symbols.add("x", SymbolKind::Local);

    let mut cfg = Cfg::new();
    let entry = cfg.add_block_with(vec![Node::store(x, Node::constant(1))]);
    let left = cfg.add_block();
    let right = cfg.add_block();
    let merge = cfg.add_block_with(vec![Node::ret(Some(Node::load(x)))]);
    cfg.add_edge(entry, left, EdgeKind::Normal).unwrap();
    cfg.add_edge(entry, right, EdgeKind::Normal).unwrap();
    cfg.add_edge(left, merge, EdgeKind::Normal).unwrap();
    cfg.add_edge(right, merge, EdgeKind::Normal).unwrap();
    (Method { cfg, symbols }, x)
}

// Loop 1 <-> 2 leaving to 3, where 2 computes the invariant a + b defined in 0
pub fn scenario_b() -> Method {
    let mut symbols = SymbolTable::new();
    let a = symbols.add("a", SymbolKind::Local);
    let b = symbols.add("b", SymbolKind::Local);
    let t = symbols.add("t", SymbolKind::Local);

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
    let body = cfg.add_block_with(vec![Node::store(
        t,
        Node::binary(Opcode::Add, Node::load(a), Node::load(b)),
    )]);
    let after = cfg.add_block_with(vec![Node::ret(Some(Node::load(t)))]);
    cfg.add_edge(entry, header, EdgeKind::Normal).unwrap();
    cfg.add_edge(header, body, EdgeKind::Normal).unwrap();
    cfg.add_edge(body, header, EdgeKind::Normal).unwrap();
    cfg.add_edge(header, after, EdgeKind::Normal).unwrap();
    Method { cfg, symbols }
}

// Straight-line method with a store, a call and a check, for local-information tests
pub fn straight_line() -> (Method, [SymbolId; 3]) {
    let mut symbols = SymbolTable::new();
    let x = symbols.add("x", SymbolKind::Local);
    let y = symbols.add("y", SymbolKind::Parameter);
    let g = symbols.add("g", SymbolKind::Static);

    let mut cfg = Cfg::new();
    let first = cfg.add_block_with(vec![
        Node::store(x, Node::binary(Opcode::Add, Node::load(y), Node::load(g))),
        Node::null_check(Node::load(x)),
    ]);
    let second = cfg.add_block_with(vec![
        Node::call(vec![Node::load(x)]),
        Node::store(x, Node::binary(Opcode::Add, Node::load(y), Node::load(g))),
        Node::ret(Some(Node::load(x))),
    ]);
    cfg.add_edge(first, second, EdgeKind::Normal).unwrap();
    (Method { cfg, symbols }, [x, y, g])
}
