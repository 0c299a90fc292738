//! IR tree nodes.

use std::fmt;

use strum::{Display, EnumCount, EnumIter};

use crate::ir::SymbolId;

/// The operation performed by a [`Node`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumIter, EnumCount)]
pub enum Opcode {
    /// Integer constant
    Const,
    /// Load of a symbol
    Load,
    /// Store to a symbol; child 0 is the value
    Store,
    /// Addition
    Add,
    /// Subtraction
    Sub,
    /// Multiplication
    Mul,
    /// Division, may raise an exception
    Div,
    /// Negation
    Neg,
    /// Signed less-than comparison
    CmpLt,
    /// Equality comparison
    CmpEq,
    /// Call; children are the arguments
    Call,
    /// Null check of child 0
    NullCheck,
    /// Bounds check of child 0 against child 1
    BoundsCheck,
    /// Conditional branch on child 0
    Branch,
    /// Method return, with an optional value
    Return,
    /// Throw of child 0
    Throw,
}

impl Opcode {
    /// Returns `true` for explicit exception checks.
    #[must_use]
    pub const fn is_check(self) -> bool {
        matches!(self, Opcode::NullCheck | Opcode::BoundsCheck)
    }

    /// Returns `true` if evaluating this operation may raise an exception.
    #[must_use]
    pub const fn can_throw(self) -> bool {
        matches!(
            self,
            Opcode::NullCheck | Opcode::BoundsCheck | Opcode::Div | Opcode::Call | Opcode::Throw
        )
    }

    /// Returns `true` for side-effect free computations that redundancy elimination may
    /// move or share.
    #[must_use]
    pub const fn is_movable_expression(self) -> bool {
        matches!(
            self,
            Opcode::Add
                | Opcode::Sub
                | Opcode::Mul
                | Opcode::Div
                | Opcode::Neg
                | Opcode::CmpLt
                | Opcode::CmpEq
                | Opcode::NullCheck
                | Opcode::BoundsCheck
        )
    }
}

/// A statement or expression tree node.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Node {
    opcode: Opcode,
    symbol: Option<SymbolId>,
    value: i64,
    children: Vec<Node>,
}

impl Node {
    /// Creates a node from its parts.
    #[must_use]
    pub fn new(opcode: Opcode, symbol: Option<SymbolId>, children: Vec<Node>) -> Self {
        Self {
            opcode,
            symbol,
            value: 0,
            children,
        }
    }

    /// Integer constant.
    #[must_use]
    pub fn constant(value: i64) -> Self {
        Self {
            opcode: Opcode::Const,
            symbol: None,
            value,
            children: Vec::new(),
        }
    }

    /// Load of `symbol`.
    #[must_use]
    pub fn load(symbol: SymbolId) -> Self {
        Self::new(Opcode::Load, Some(symbol), Vec::new())
    }

    /// Store of `value` into `symbol`.
    #[must_use]
    pub fn store(symbol: SymbolId, value: Node) -> Self {
        Self::new(Opcode::Store, Some(symbol), vec![value])
    }

    /// Binary operation.
    #[must_use]
    pub fn binary(opcode: Opcode, lhs: Node, rhs: Node) -> Self {
        Self::new(opcode, None, vec![lhs, rhs])
    }

    /// Call with the given arguments.
    #[must_use]
    pub fn call(args: Vec<Node>) -> Self {
        Self::new(Opcode::Call, None, args)
    }

    /// Null check of `value`.
    #[must_use]
    pub fn null_check(value: Node) -> Self {
        Self::new(Opcode::NullCheck, None, vec![value])
    }

    /// Conditional branch on `condition`.
    #[must_use]
    pub fn branch(condition: Node) -> Self {
        Self::new(Opcode::Branch, None, vec![condition])
    }

    /// Return, optionally with a value.
    #[must_use]
    pub fn ret(value: Option<Node>) -> Self {
        Self::new(Opcode::Return, None, value.into_iter().collect())
    }

    /// Returns the opcode.
    #[must_use]
    pub const fn opcode(&self) -> Opcode {
        self.opcode
    }

    /// Returns the constant value of a `Const` node.
    #[must_use]
    pub const fn value(&self) -> i64 {
        self.value
    }

    /// Returns the referenced symbol, if any.
    #[must_use]
    pub const fn symbol(&self) -> Option<SymbolId> {
        self.symbol
    }

    /// Returns `true` if this node references a symbol.
    #[must_use]
    pub const fn has_symbol_reference(&self) -> bool {
        self.symbol.is_some()
    }

    /// Returns the operand children.
    #[must_use]
    pub fn children(&self) -> &[Node] {
        &self.children
    }

    /// Returns `true` for stores.
    #[must_use]
    pub const fn is_store(&self) -> bool {
        matches!(self.opcode, Opcode::Store)
    }

    /// Returns `true` for calls.
    #[must_use]
    pub const fn is_call(&self) -> bool {
        matches!(self.opcode, Opcode::Call)
    }

    /// Returns `true` for explicit exception checks.
    #[must_use]
    pub const fn is_check(&self) -> bool {
        self.opcode.is_check()
    }

    /// Returns the symbol written by a store.
    #[must_use]
    pub fn stored_symbol(&self) -> Option<SymbolId> {
        if self.is_store() {
            self.symbol
        } else {
            None
        }
    }

    /// Returns `true` if this tree contains a call anywhere.
    #[must_use]
    pub fn contains_call(&self) -> bool {
        self.is_call() || self.children.iter().any(Node::contains_call)
    }

    /// Visits the tree in evaluation order: children first, left to right, then the node.
    pub fn visit_postorder<'a>(&'a self, f: &mut impl FnMut(&'a Node)) {
        for child in &self.children {
            child.visit_postorder(f);
        }
        f(self);
    }

    /// Collects every symbol loaded anywhere in this tree.
    #[must_use]
    pub fn loaded_symbols(&self) -> Vec<SymbolId> {
        let mut result = Vec::new();
        self.visit_postorder(&mut |n| {
            if n.opcode == Opcode::Load {
                if let Some(sym) = n.symbol {
                    if !result.contains(&sym) {
                        result.push(sym);
                    }
                }
            }
        });
        result
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.opcode {
            Opcode::Const => write!(f, "{}", self.value),
            Opcode::Load => match self.symbol {
                Some(sym) => write!(f, "{sym:?}"),
                None => write!(f, "load ?"),
            },
            _ => {
                write!(f, "({}", self.opcode)?;
                if let Some(sym) = self.symbol {
                    write!(f, " {sym:?}")?;
                }
                for child in &self.children {
                    write!(f, " {child:?}")?;
                }
                write!(f, ")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::{EnumCount, IntoEnumIterator};

    #[test]
    fn test_node_queries() {
        let a = SymbolId::new(0);
        let b = SymbolId::new(1);
        let stmt = Node::store(
            b,
            Node::binary(Opcode::Add, Node::load(a), Node::call(vec![Node::load(b)])),
        );
        assert!(stmt.is_store());
        assert!(stmt.has_symbol_reference());
        assert!(stmt.contains_call());
        assert_eq!(stmt.loaded_symbols(), vec![a, b]);
        assert_eq!(format!("{stmt:?}"), "(Store #1 (Add #0 (Call #1)))");
    }

    #[test]
    fn test_postorder_visits_children_first() {
        let tree = Node::binary(Opcode::Sub, Node::constant(1), Node::constant(2));
        let mut seen = Vec::new();
        tree.visit_postorder(&mut |n| seen.push(n.opcode()));
        assert_eq!(seen, vec![Opcode::Const, Opcode::Const, Opcode::Sub]);
    }

    #[test]
    fn test_opcode_classes() {
        let checks: Vec<Opcode> = Opcode::iter().filter(|o| o.is_check()).collect();
        assert_eq!(checks, vec![Opcode::NullCheck, Opcode::BoundsCheck]);
        assert!(checks.iter().all(|o| o.can_throw()));
        assert!(!Opcode::Store.is_movable_expression());
        assert_eq!(Opcode::COUNT, 16);
    }
}
