//! Graph algorithms used by structural analysis.
//!
//! - **Dominators**: [`compute_dominators`] (Lengauer-Tarjan)
//! - **Orderings**: [`preorder`]

mod dominators;
mod traversal;

pub use dominators::{compute_dominators, DominatorTree};
pub use traversal::preorder;
