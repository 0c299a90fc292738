//! Candidate expressions and local PRE information.
//!
//! Candidates are found syntactically: every distinct movable subtree of the method
//! gets one bit. Local information then records, per block, how each candidate relates
//! to the block's own statements:
//!
//! - `LANT[B]`: B computes the expression before modifying any of its operands
//! - `TRANSP[B]`: B modifies none of its operands
//! - `COMP[B]`: B computes the expression and leaves its operands alone afterwards
//!
//! A store modifies its symbol; a call modifies every static symbol.

use std::collections::HashMap;

use crate::{
    cfg::FlowGraph,
    ir::{Node, Opcode, SymbolId, SymbolKind, SymbolTable},
    utils::{BitSet, OrderedBitSet},
};

/// The candidate expressions of a method.
#[derive(Debug, Clone, Default)]
pub struct ExpressionTable {
    expressions: Vec<Node>,
    index: HashMap<Node, usize>,
    /// Expressions loading each symbol
    users: HashMap<SymbolId, Vec<usize>>,
    /// Expressions loading a static symbol
    static_users: Vec<usize>,
}

impl ExpressionTable {
    /// Collects the candidates of `cfg`, numbered by first occurrence in block order.
    #[must_use]
    pub fn new<G: FlowGraph>(cfg: &G, symbols: &SymbolTable) -> Self {
        let mut blocks: Vec<usize> = cfg.block_numbers().collect();
        blocks.sort_unstable();

        let mut table = Self::default();
        for block in blocks {
            for statement in cfg.statements(block) {
                statement.visit_postorder(&mut |node| {
                    if is_candidate(node) && !table.index.contains_key(node) {
                        table.insert(node, symbols);
                    }
                });
            }
        }
        table
    }

    fn insert(&mut self, node: &Node, symbols: &SymbolTable) {
        let bit = self.expressions.len();
        self.expressions.push(node.clone());
        self.index.insert(node.clone(), bit);
        let operands = node.loaded_symbols();
        if operands
            .iter()
            .any(|s| symbols.kind(*s) == Some(SymbolKind::Static))
        {
            self.static_users.push(bit);
        }
        for operand in operands {
            self.users.entry(operand).or_default().push(bit);
        }
    }

    /// Number of candidates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.expressions.len()
    }

    /// Returns `true` if the method has no candidate.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.expressions.is_empty()
    }

    /// Returns the bit of `node`, if it is a candidate.
    #[must_use]
    pub fn bit(&self, node: &Node) -> Option<usize> {
        self.index.get(node).copied()
    }

    /// Returns the candidate behind `bit`.
    #[must_use]
    pub fn expression(&self, bit: usize) -> Option<&Node> {
        self.expressions.get(bit)
    }

    /// Returns the candidates that may raise an exception.
    #[must_use]
    pub fn checks(&self) -> BitSet {
        let mut checks = BitSet::new(self.len());
        for (bit, expression) in self.expressions.iter().enumerate() {
            if expression.is_check() || expression.opcode() == Opcode::Div {
                checks.insert(bit);
            }
        }
        checks
    }

    fn modified_by_store(&self, symbol: SymbolId) -> &[usize] {
        self.users.get(&symbol).map_or(&[], Vec::as_slice)
    }
}

fn is_candidate(node: &Node) -> bool {
    node.opcode().is_movable_expression() && !node.contains_call()
}

/// LANT, TRANSP and COMP of one block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalInfo {
    /// Locally anticipatable
    pub lant: BitSet,
    /// Transparent
    pub transp: BitSet,
    /// Locally available
    pub comp: BitSet,
}

/// Local PRE information for every block of a method.
#[derive(Debug, Clone)]
pub struct LocalPreInfo {
    table: ExpressionTable,
    blocks: HashMap<usize, LocalInfo>,
    checks: BitSet,
    empty: BitSet,
    universal: BitSet,
}

impl LocalPreInfo {
    /// Computes the candidates of `cfg` and their local information.
    #[must_use]
    pub fn new<G: FlowGraph>(cfg: &G, symbols: &SymbolTable) -> Self {
        let table = ExpressionTable::new(cfg, symbols);
        let blocks = cfg
            .block_numbers()
            .map(|block| (block, scan_block(&table, cfg.statements(block))))
            .collect();
        let width = table.len();
        Self {
            checks: table.checks(),
            table,
            blocks,
            empty: BitSet::new(width),
            universal: BitSet::full(width),
        }
    }

    /// Returns the candidate table.
    #[must_use]
    pub const fn table(&self) -> &ExpressionTable {
        &self.table
    }

    /// Number of candidates.
    #[must_use]
    pub fn width(&self) -> usize {
        self.table.len()
    }

    /// Returns the check expressions.
    #[must_use]
    pub const fn checks(&self) -> &BitSet {
        &self.checks
    }

    /// Returns the local information of `block`, if it exists.
    #[must_use]
    pub fn block(&self, block: usize) -> Option<&LocalInfo> {
        self.blocks.get(&block)
    }

    /// LANT of `block`; empty for unknown blocks.
    #[must_use]
    pub fn lant(&self, block: usize) -> &BitSet {
        self.blocks.get(&block).map_or(&self.empty, |i| &i.lant)
    }

    /// TRANSP of `block`; universal for unknown blocks.
    #[must_use]
    pub fn transp(&self, block: usize) -> &BitSet {
        self.blocks.get(&block).map_or(&self.universal, |i| &i.transp)
    }

    /// COMP of `block`; empty for unknown blocks.
    #[must_use]
    pub fn comp(&self, block: usize) -> &BitSet {
        self.blocks.get(&block).map_or(&self.empty, |i| &i.comp)
    }
}

fn scan_block(table: &ExpressionTable, statements: &[Node]) -> LocalInfo {
    let width = table.len();
    let mut lant = BitSet::new(width);
    let mut modified = BitSet::new(width);
    let mut available = BitSet::new(width);

    for statement in statements {
        statement.visit_postorder(&mut |node| {
            if let Some(bit) = table.bit(node) {
                if !modified.contains(bit) {
                    lant.insert(bit);
                }
                available.insert(bit);
            }
            if node.is_call() {
                for &bit in &table.static_users {
                    modified.insert(bit);
                    available.remove(bit);
                }
            }
        });
        if let Some(symbol) = statement.stored_symbol() {
            for &bit in table.modified_by_store(symbol) {
                modified.insert(bit);
                available.remove(bit);
            }
        }
    }

    LocalInfo {
        lant,
        transp: modified.complement(),
        comp: available,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::factories::straight_line;

    #[test]
    fn test_local_information() {
        let (method, [x, y, g]) = straight_line();
        let info = LocalPreInfo::new(&method.cfg, &method.symbols);
        let sum = info
            .table()
            .bit(&Node::binary(Opcode::Add, Node::load(y), Node::load(g)))
            .unwrap();
        let check = info.table().bit(&Node::null_check(Node::load(x))).unwrap();
        assert_eq!(info.width(), 2);
        assert!(info.checks().iter_ones().eq([check]));

        // Block 0 computes y + g, then stores x, then checks x
        assert!(info.lant(0).contains(sum));
        assert!(info.comp(0).contains(sum));
        assert!(info.transp(0).contains(sum));
        assert!(!info.lant(0).contains(check));
        assert!(info.comp(0).contains(check));
        assert!(!info.transp(0).contains(check));

        // Block 1 calls first, which modifies g, then recomputes y + g
        assert!(!info.lant(1).contains(sum));
        assert!(!info.transp(1).contains(sum));
        assert!(info.comp(1).contains(sum));
        assert!(!info.comp(1).contains(check));
    }
}
