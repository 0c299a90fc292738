//! Symbols referenced by IR loads and stores.

use std::fmt;

use strum::{Display, EnumIter};

/// Identifier of a symbol in a [`SymbolTable`].
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SymbolId(pub(crate) u32);

impl SymbolId {
    /// Creates a symbol id from a raw index.
    #[must_use]
    pub const fn new(index: u32) -> Self {
        SymbolId(index)
    }

    /// Returns the raw index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Storage class of a symbol.
///
/// Locals and parameters are private to the method and only change through explicit
/// stores. Statics may additionally change across any call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum SymbolKind {
    /// Method-local temporary or variable
    Local,
    /// Incoming parameter
    Parameter,
    /// Static (global) field
    Static,
}

impl SymbolKind {
    /// Returns `true` for symbols tracked by liveness (locals and parameters).
    #[must_use]
    pub const fn is_method_local(self) -> bool {
        matches!(self, SymbolKind::Local | SymbolKind::Parameter)
    }
}

/// A named symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    /// Human-readable name used in traces
    pub name: String,
    /// Storage class
    pub kind: SymbolKind,
}

/// All symbols of one method.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    symbols: Vec<Symbol>,
}

impl SymbolTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a symbol and returns its id.
    pub fn add(&mut self, name: &str, kind: SymbolKind) -> SymbolId {
        let id = SymbolId(u32::try_from(self.symbols.len()).unwrap_or(u32::MAX));
        self.symbols.push(Symbol {
            name: name.to_string(),
            kind,
        });
        id
    }

    /// Returns the symbol with the given id.
    #[must_use]
    pub fn get(&self, id: SymbolId) -> Option<&Symbol> {
        self.symbols.get(id.index())
    }

    /// Returns the kind of a symbol, or `None` if the id is unknown.
    #[must_use]
    pub fn kind(&self, id: SymbolId) -> Option<SymbolKind> {
        self.get(id).map(|s| s.kind)
    }

    /// Returns the number of symbols.
    #[must_use]
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// Returns `true` if the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Iterates all symbols with their ids.
    pub fn iter(&self) -> impl Iterator<Item = (SymbolId, &Symbol)> {
        self.symbols
            .iter()
            .enumerate()
            .map(|(i, s)| (SymbolId(i as u32), s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_table() {
        let mut table = SymbolTable::new();
        let x = table.add("x", SymbolKind::Local);
        let g = table.add("g", SymbolKind::Static);
        assert_eq!(table.len(), 2);
        assert_eq!(table.kind(x), Some(SymbolKind::Local));
        assert!(!table.kind(g).is_some_and(SymbolKind::is_method_local));
        assert_eq!(table.get(g).map(|s| s.name.as_str()), Some("g"));
        assert_eq!(table.iter().count(), 2);
    }
}
