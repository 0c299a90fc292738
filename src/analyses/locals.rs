//! Bit numbering of method-local symbols.

use std::collections::HashMap;

use crate::{
    dataflow::GenKill,
    ir::{Node, SymbolId, SymbolTable},
    utils::{BitSet, OrderedBitSet},
};

/// Assigns a dense bit index to every local and parameter of a method.
///
/// Statics are not tracked: their value may change behind any call.
#[derive(Debug, Clone, Default)]
pub struct LocalIndex {
    bits: HashMap<SymbolId, usize>,
    symbols: Vec<SymbolId>,
}

impl LocalIndex {
    /// Numbers the method-local symbols of `symbols` in table order.
    #[must_use]
    pub fn new(symbols: &SymbolTable) -> Self {
        let mut index = Self::default();
        for (id, symbol) in symbols.iter() {
            if symbol.kind.is_method_local() {
                index.bits.insert(id, index.symbols.len());
                index.symbols.push(id);
            }
        }
        index
    }

    /// Returns the bit of `symbol`, or `None` if it is not tracked.
    #[must_use]
    pub fn bit(&self, symbol: SymbolId) -> Option<usize> {
        self.bits.get(&symbol).copied()
    }

    /// Returns the symbol behind `bit`.
    #[must_use]
    pub fn symbol(&self, bit: usize) -> Option<SymbolId> {
        self.symbols.get(bit).copied()
    }

    /// Number of tracked symbols.
    #[must_use]
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// Returns `true` if no symbol is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Backward effect of one statement on the set of live locals: the symbols it
    /// loads are generated, the symbol it stores is killed. Loads are evaluated before
    /// the store, so `x = x + 1` keeps `x` live.
    #[must_use]
    pub fn statement_effect(&self, statement: &Node) -> GenKill<BitSet> {
        let mut uses = BitSet::new(self.len());
        for symbol in statement.loaded_symbols() {
            if let Some(bit) = self.bit(symbol) {
                uses.insert(bit);
            }
        }
        let mut defs = BitSet::new(self.len());
        if let Some(bit) = statement.stored_symbol().and_then(|s| self.bit(s)) {
            defs.insert(bit);
        }
        GenKill::new(uses, defs)
    }

    /// Backward effect of a whole statement sequence, last statement first.
    #[must_use]
    pub fn block_effect(&self, statements: &[Node]) -> GenKill<BitSet> {
        statements
            .iter()
            .rev()
            .fold(GenKill::identity(self.len()), |acc, statement| {
                acc.then(&self.statement_effect(statement))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Opcode, SymbolKind};

    #[test]
    fn test_only_locals_are_numbered() {
        let mut table = SymbolTable::new();
        let x = table.add("x", SymbolKind::Local);
        let g = table.add("g", SymbolKind::Static);
        let p = table.add("p", SymbolKind::Parameter);
        let index = LocalIndex::new(&table);
        assert_eq!(index.len(), 2);
        assert_eq!(index.bit(x), Some(0));
        assert_eq!(index.bit(g), None);
        assert_eq!(index.symbol(1), Some(p));
    }

    #[test]
    fn test_block_effect_uses_before_defs() {
        let mut table = SymbolTable::new();
        let x = table.add("x", SymbolKind::Local);
        let y = table.add("y", SymbolKind::Local);
        let index = LocalIndex::new(&table);

        // y = x; x = x + 1
        let block = vec![
            Node::store(y, Node::load(x)),
            Node::store(x, Node::binary(Opcode::Add, Node::load(x), Node::constant(1))),
        ];
        let effect = index.block_effect(&block);
        assert!(effect.gen.iter_ones().eq([0]));
        assert!(effect.kill.iter_ones().eq([1]));
    }
}
