//! Sparse bit set backed by an ordered index set.
//!
//! Analyses over large universes with few live facts per program point (reaching
//! definitions over every store of a big method, for instance) spend most of their time on
//! empty words with a dense representation. [`SparseBitSet`] stores only the members.

use std::{collections::BTreeSet, fmt};

use crate::utils::OrderedBitSet;

/// An ordered set of indices within a fixed universe.
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct SparseBitSet {
    members: BTreeSet<usize>,
    width: usize,
}

impl SparseBitSet {
    /// Creates an empty set over `width` elements.
    #[must_use]
    pub fn new(width: usize) -> Self {
        Self {
            members: BTreeSet::new(),
            width,
        }
    }

    fn check_width(&self, other: &Self) {
        assert_eq!(self.width, other.width, "bit sets must have same length");
    }
}

impl OrderedBitSet for SparseBitSet {
    fn empty(width: usize) -> Self {
        Self::new(width)
    }

    fn universal(width: usize) -> Self {
        Self {
            members: (0..width).collect(),
            width,
        }
    }

    fn width(&self) -> usize {
        self.width
    }

    fn insert(&mut self, index: usize) {
        assert!(index < self.width, "index out of bounds");
        self.members.insert(index);
    }

    fn remove(&mut self, index: usize) {
        self.members.remove(&index);
    }

    fn contains(&self, index: usize) -> bool {
        self.members.contains(&index)
    }

    fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    fn count(&self) -> usize {
        self.members.len()
    }

    fn union_with(&mut self, other: &Self) -> bool {
        self.check_width(other);
        let before = self.members.len();
        self.members.extend(other.members.iter().copied());
        self.members.len() != before
    }

    fn intersect_with(&mut self, other: &Self) -> bool {
        self.check_width(other);
        let before = self.members.len();
        self.members.retain(|i| other.members.contains(i));
        self.members.len() != before
    }

    fn difference_with(&mut self, other: &Self) -> bool {
        self.check_width(other);
        let before = self.members.len();
        self.members.retain(|i| !other.members.contains(i));
        self.members.len() != before
    }

    fn iter_ones(&self) -> impl Iterator<Item = usize> + '_ {
        self.members.iter().copied()
    }

    fn clear(&mut self) {
        self.members.clear();
    }
}

impl fmt::Debug for SparseBitSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.members.iter()).finish()
    }
}
