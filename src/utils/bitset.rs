//! Fixed-width bit sets for dataflow facts.
//!
//! This module provides the [`OrderedBitSet`] capability that the dataflow engine is generic
//! over, and [`BitSet`], the dense word-backed implementation of it. The sparse counterpart
//! lives in [`crate::utils::SparseBitSet`].
//!
//! Every set has a fixed width (the universe size). Combining two sets of different widths
//! is a programming error and panics.
//!
//! # Example
//!
//! ```rust
//! use structflow::utils::{BitSet, OrderedBitSet};
//!
//! let mut set = BitSet::new(100);
//! set.insert(0);
//! set.insert(50);
//! set.insert(99);
//!
//! assert!(set.contains(50));
//! assert_eq!(set.count(), 3);
//! assert_eq!(set.iter_ones().collect::<Vec<_>>(), vec![0, 50, 99]);
//! ```

use std::fmt;

/// The minimal set interface the dataflow engine needs.
///
/// Implementations represent subsets of `0..width()`. Mutating operations that combine two
/// sets return `true` if the receiver changed, which is what fixed-point drivers use to
/// detect convergence.
pub trait OrderedBitSet: Clone + PartialEq + Eq + fmt::Debug + Send + Sync {
    /// Creates the empty set over `width` elements.
    fn empty(width: usize) -> Self;

    /// Creates the set containing every element of `0..width`.
    fn universal(width: usize) -> Self;

    /// Returns the universe size.
    fn width(&self) -> usize;

    /// Adds `index` to the set.
    fn insert(&mut self, index: usize);

    /// Removes `index` from the set.
    fn remove(&mut self, index: usize);

    /// Returns `true` if `index` is in the set.
    fn contains(&self, index: usize) -> bool;

    /// Returns `true` if no element is set.
    fn is_empty(&self) -> bool;

    /// Returns the number of elements in the set.
    fn count(&self) -> usize;

    /// In-place union. Returns `true` if `self` changed.
    fn union_with(&mut self, other: &Self) -> bool;

    /// In-place intersection. Returns `true` if `self` changed.
    fn intersect_with(&mut self, other: &Self) -> bool;

    /// In-place difference (`self - other`). Returns `true` if `self` changed.
    fn difference_with(&mut self, other: &Self) -> bool;

    /// Iterates the elements in ascending order.
    fn iter_ones(&self) -> impl Iterator<Item = usize> + '_;

    /// Removes every element.
    fn clear(&mut self) {
        *self = Self::empty(self.width());
    }

    /// Returns the complement with respect to `0..width`.
    #[must_use]
    fn complement(&self) -> Self {
        let mut result = Self::universal(self.width());
        result.difference_with(self);
        result
    }

    /// Returns `true` if every element of `self` is in `other`.
    fn is_subset(&self, other: &Self) -> bool {
        self.iter_ones().all(|i| other.contains(i))
    }
}

/// A dense bit vector backed by 64-bit words.
///
/// This is the representation of choice for analyses whose sets are expected to be
/// populated, such as liveness over a handful of locals. Bits at or above the width in
/// the last word are always zero.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct BitSet {
    words: Box<[u64]>,
    width: usize,
}

const WORD_BITS: usize = u64::BITS as usize;

impl BitSet {
    /// Creates an empty set over `width` elements.
    #[must_use]
    pub fn new(width: usize) -> Self {
        Self {
            words: vec![0; width.div_ceil(WORD_BITS)].into_boxed_slice(),
            width,
        }
    }

    /// Creates the set holding every element of `0..width`.
    #[must_use]
    pub fn full(width: usize) -> Self {
        let mut set = Self::new(width);
        set.fill();
        set
    }

    /// Returns the universe size.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.width
    }

    /// Returns `true` for a zero-width set.
    #[must_use]
    pub const fn is_zero_width(&self) -> bool {
        self.width == 0
    }

    /// Inserts every element of `0..width`.
    pub fn fill(&mut self) {
        self.words.fill(u64::MAX);
        let tail = self.width % WORD_BITS;
        if tail != 0 {
            if let Some(last) = self.words.last_mut() {
                *last = (1u64 << tail) - 1;
            }
        }
    }

    const fn locate(index: usize) -> (usize, u64) {
        (index / WORD_BITS, 1u64 << (index % WORD_BITS))
    }

    fn zip_words(&mut self, other: &Self, op: impl Fn(u64, u64) -> u64) -> bool {
        assert_eq!(self.width, other.width, "bit sets must have same length");
        self.words
            .iter_mut()
            .zip(other.words.iter())
            .fold(false, |changed, (word, &rhs)| {
                let next = op(*word, rhs);
                let differs = next != *word;
                *word = next;
                changed | differs
            })
    }
}

impl OrderedBitSet for BitSet {
    fn empty(width: usize) -> Self {
        Self::new(width)
    }

    fn universal(width: usize) -> Self {
        Self::full(width)
    }

    fn width(&self) -> usize {
        self.width
    }

    /// # Panics
    ///
    /// Panics if `index >= self.width()`.
    fn insert(&mut self, index: usize) {
        assert!(index < self.width, "index out of bounds");
        let (word, mask) = Self::locate(index);
        self.words[word] |= mask;
    }

    /// # Panics
    ///
    /// Panics if `index >= self.width()`.
    fn remove(&mut self, index: usize) {
        assert!(index < self.width, "index out of bounds");
        let (word, mask) = Self::locate(index);
        self.words[word] &= !mask;
    }

    fn contains(&self, index: usize) -> bool {
        let (word, mask) = Self::locate(index);
        index < self.width && self.words[word] & mask != 0
    }

    fn is_empty(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    fn count(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    fn union_with(&mut self, other: &Self) -> bool {
        self.zip_words(other, |a, b| a | b)
    }

    fn intersect_with(&mut self, other: &Self) -> bool {
        self.zip_words(other, |a, b| a & b)
    }

    fn difference_with(&mut self, other: &Self) -> bool {
        self.zip_words(other, |a, b| a & !b)
    }

    fn iter_ones(&self) -> impl Iterator<Item = usize> + '_ {
        self.words.iter().enumerate().flat_map(|(i, &word)| {
            let mut rest = word;
            std::iter::from_fn(move || {
                if rest == 0 {
                    return None;
                }
                let bit = rest.trailing_zeros() as usize;
                rest &= rest - 1;
                Some(i * WORD_BITS + bit)
            })
        })
    }

    fn clear(&mut self) {
        self.words.fill(0);
    }
}

impl fmt::Debug for BitSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter_ones()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(width: usize, members: &[usize]) -> BitSet {
        let mut set = BitSet::new(width);
        for &m in members {
            set.insert(m);
        }
        set
    }

    #[test]
    fn test_membership_across_words() {
        let mut bs = set(130, &[0, 63, 64, 129]);
        assert_eq!(bs.count(), 4);
        assert!(bs.contains(63) && bs.contains(64));
        assert!(!bs.contains(65));
        assert!(!bs.contains(130));
        bs.remove(64);
        assert_eq!(bs.iter_ones().collect::<Vec<_>>(), vec![0, 63, 129]);
    }

    #[test]
    fn test_full_masks_tail() {
        assert_eq!(BitSet::full(70).count(), 70);
        assert_eq!(BitSet::full(128).count(), 128);
        assert!(BitSet::full(0).is_empty());
        assert!(BitSet::new(0).is_zero_width());
        assert_eq!(BitSet::full(70).complement(), BitSet::new(70));
    }

    #[test]
    fn test_combinators_report_change() {
        let a = set(70, &[0, 1, 65]);
        let b = set(70, &[1, 2]);

        let mut union = a.clone();
        assert!(union.union_with(&b));
        assert!(!union.union_with(&b));
        assert_eq!(union, set(70, &[0, 1, 2, 65]));

        let mut inter = a.clone();
        assert!(inter.intersect_with(&b));
        assert_eq!(inter, set(70, &[1]));

        let mut diff = a.clone();
        assert!(diff.difference_with(&b));
        assert!(!diff.difference_with(&b));
        assert_eq!(diff, set(70, &[0, 65]));
        assert!(diff.is_subset(&a));
        assert!(!a.is_subset(&diff));
    }

    #[test]
    #[should_panic(expected = "same length")]
    fn test_width_mismatch_panics() {
        let mut a = BitSet::new(3);
        a.union_with(&BitSet::new(4));
    }

    #[test]
    fn test_debug_lists_members() {
        assert_eq!(format!("{:?}", set(8, &[2, 7])), "{2, 7}");
        let mut cleared = set(8, &[1]);
        cleared.clear();
        assert_eq!(format!("{cleared:?}"), "{}");
    }
}
