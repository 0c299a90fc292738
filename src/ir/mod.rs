//! Minimal tree IR consumed by the transfer functions.
//!
//! Each basic block holds a sequence of statement trees ([`Node`]). The analyses only ask
//! a handful of questions of a node: which symbol it references, whether it stores,
//! whether it is a call or a check, and what its operand children are. Everything else
//! about the IR is opaque to this crate.
//!
//! # Key Types
//!
//! - [`Node`] - A statement or expression tree node
//! - [`Opcode`] - The operation a node performs
//! - [`SymbolTable`] / [`SymbolId`] / [`SymbolKind`] - Symbols referenced by loads and stores
//!
//! # Examples
//!
//! ```rust
//! use structflow::ir::{Node, Opcode, SymbolKind, SymbolTable};
//!
//! let mut symbols = SymbolTable::new();
//! let a = symbols.add("a", SymbolKind::Local);
//! let b = symbols.add("b", SymbolKind::Local);
//!
//! // b = a + 1
//! let stmt = Node::store(b, Node::binary(Opcode::Add, Node::load(a), Node::constant(1)));
//! assert!(stmt.is_store());
//! assert_eq!(stmt.stored_symbol(), Some(b));
//! ```

mod node;
mod symbol;

pub use node::{Node, Opcode};
pub use symbol::{Symbol, SymbolId, SymbolKind, SymbolTable};
