//! Shared utilities: bit sets and graph algorithms.

mod bitset;
pub mod graph;
mod sparse;

pub use bitset::{BitSet, OrderedBitSet};
pub use sparse::SparseBitSet;
