//! Symbolic dataflow values used to summarize regions.
//!
//! A [`Summary`] describes a set as a function of the sets arriving at a region's
//! input ports:
//!
//! ```text
//! value = f_1(port_1) ⋄ f_2(port_2) ⋄ ... ⋄ constant
//! ```
//!
//! where every `f_i` is a [`GenKill`] function and `⋄` is the analysis confluence.
//! Forward regions have a single port, their entry. Backward regions have one port
//! per exit target, plus a constant contributed by blocks that leave the method.
//!
//! A concrete set is a summary without ports. The identity of the confluence operator,
//! which is also the value of a point not yet visited, is the summary without ports
//! and without constant.
//!
//! Gen/kill functions distribute over both confluence operators, which makes the
//! following operations exact:
//!
//! - applying a block function to a summary composes it into every term;
//! - joining two summaries joins their constants and meets terms port by port;
//! - substituting summaries for ports composes nested region summaries.
//!
//! Every operation leaves its result in canonical form, so two summaries compare equal
//! exactly when they describe the same function of the ports. Per bit, a canonical
//! summary either forces the bit (it lives in the constant, and every term leaves it
//! neutral) or combines the ports that pass it through unchanged. Terms that are
//! neutral on every bit are dropped, and a constant equal to the confluence identity
//! is stored as `None`.

use std::collections::BTreeMap;

use crate::{
    dataflow::{Confluence, GenKill},
    utils::OrderedBitSet,
};

/// A set expressed as a function of region input ports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Summary<S> {
    terms: BTreeMap<usize, GenKill<S>>,
    constant: Option<S>,
}

impl<S: OrderedBitSet> Summary<S> {
    /// The confluence identity.
    pub(crate) fn top() -> Self {
        Self {
            terms: BTreeMap::new(),
            constant: None,
        }
    }

    /// A concrete set.
    pub(crate) fn constant(set: S) -> Self {
        Self {
            terms: BTreeMap::new(),
            constant: Some(set),
        }
    }

    /// The unmodified value of input `port`.
    pub(crate) fn port(port: usize, width: usize) -> Self {
        let mut terms = BTreeMap::new();
        terms.insert(port, GenKill::identity(width));
        Self {
            terms,
            constant: None,
        }
    }

    /// Returns the concrete set. Port terms, if any, are ignored.
    pub(crate) fn materialize(&self, confluence: Confluence, width: usize) -> S {
        self.constant
            .clone()
            .unwrap_or_else(|| confluence.identity(width))
    }

    /// Joins `other` into `self`. Returns `true` if the function described by `self`
    /// changed.
    pub(crate) fn join(&mut self, other: &Self, confluence: Confluence) -> bool {
        self.normalize(confluence);
        let before = self.clone();
        for (port, function) in &other.terms {
            match self.terms.get_mut(port) {
                Some(existing) => *existing = existing.meet(function, confluence),
                None => {
                    self.terms.insert(*port, function.clone());
                }
            }
        }
        if let Some(theirs) = &other.constant {
            match self.constant.as_mut() {
                Some(mine) => {
                    confluence.join(mine, theirs);
                }
                None => self.constant = Some(theirs.clone()),
            }
        }
        self.normalize(confluence);
        *self != before
    }

    /// Returns `f(self)`.
    pub(crate) fn through(&self, function: &GenKill<S>, confluence: Confluence) -> Self {
        let terms = self
            .terms
            .iter()
            .map(|(port, inner)| (*port, inner.then(function)))
            .collect();
        let constant = match &self.constant {
            Some(set) => Some(function.apply(set)),
            None if self.terms.is_empty() => {
                Some(function.apply(&confluence.identity(function.width())))
            }
            None => None,
        };
        let mut result = Self { terms, constant };
        result.normalize(confluence);
        result
    }

    /// Replaces every port by the value `inputs` gives for it.
    pub(crate) fn substitute(
        &self,
        confluence: Confluence,
        mut inputs: impl FnMut(usize) -> Self,
    ) -> Self {
        let mut result = Self {
            terms: BTreeMap::new(),
            constant: self.constant.clone(),
        };
        for (port, function) in &self.terms {
            let input = inputs(*port);
            result.join(&input.through(function, confluence), confluence);
        }
        result.normalize(confluence);
        result
    }

    /// Brings `self` into canonical form.
    fn normalize(&mut self, confluence: Confluence) {
        let Some(width) = self
            .constant
            .as_ref()
            .map(OrderedBitSet::width)
            .or_else(|| self.terms.values().next().map(GenKill::width))
        else {
            return;
        };
        match confluence {
            Confluence::Union => {
                // Bits set by the constant or generated by any term are always set
                let mut forced = self.constant.take().unwrap_or_else(|| S::empty(width));
                for function in self.terms.values() {
                    forced.union_with(&function.gen);
                }
                let neutral = S::universal(width);
                self.terms.retain(|_, function| {
                    let mut kill = function.kill.clone();
                    kill.union_with(&forced);
                    *function = GenKill::new(S::empty(width), kill);
                    function.kill != neutral
                });
                if !forced.is_empty() {
                    self.constant = Some(forced);
                }
            }
            Confluence::Intersection => {
                // Bits cleared by the constant or killed by any term are always clear
                let mut allowed = self.constant.take().unwrap_or_else(|| S::universal(width));
                for function in self.terms.values() {
                    allowed.difference_with(&function.kill);
                }
                let cleared = allowed.complement();
                let neutral = S::universal(width);
                self.terms.retain(|_, function| {
                    let mut gen = function.gen.clone();
                    gen.union_with(&cleared);
                    *function = GenKill::new(gen, function.kill.clone());
                    function.gen != neutral
                });
                if allowed != neutral {
                    self.constant = Some(allowed);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::BitSet;

    fn set(bits: &[usize]) -> BitSet {
        let mut s = BitSet::new(4);
        for &b in bits {
            s.insert(b);
        }
        s
    }

    fn eval(summary: &Summary<BitSet>, confluence: Confluence, inputs: &[(usize, BitSet)]) -> BitSet {
        summary
            .substitute(confluence, |port| {
                inputs
                    .iter()
                    .find(|(p, _)| *p == port)
                    .map_or_else(Summary::top, |(_, s)| Summary::constant(s.clone()))
            })
            .materialize(confluence, 4)
    }

    #[test]
    fn test_symbolic_matches_concrete() {
        let f = GenKill::new(set(&[0]), set(&[1]));
        let g = GenKill::new(set(&[2]), set(&[0, 3]));
        for confluence in [Confluence::Union, Confluence::Intersection] {
            let mut symbolic = Summary::port(7, 4).through(&f, confluence);
            symbolic.join(&Summary::port(9, 4).through(&g, confluence), confluence);
            symbolic.join(&Summary::constant(set(&[3])), confluence);

            let a = set(&[1, 3]);
            let b = set(&[0, 1, 2]);
            let mut expected = f.apply(&a);
            confluence.join(&mut expected, &g.apply(&b));
            confluence.join(&mut expected, &set(&[3]));

            assert_eq!(eval(&symbolic, confluence, &[(7, a), (9, b)]), expected);
        }
    }

    #[test]
    fn test_top_through_function_becomes_constant() {
        let f = GenKill::new(set(&[2]), set(&[]));
        let value = Summary::<BitSet>::top().through(&f, Confluence::Union);
        assert!(value.terms.is_empty());
        assert_eq!(value.materialize(Confluence::Union, 4), set(&[2]));
    }

    #[test]
    fn test_join_reports_change() {
        let mut value = Summary::constant(set(&[0, 1]));
        assert!(!value.join(&Summary::top(), Confluence::Intersection));
        assert!(value.join(&Summary::constant(set(&[1])), Confluence::Intersection));
        assert_eq!(value.materialize(Confluence::Intersection, 4), set(&[1]));
    }

    #[test]
    fn test_implied_constant_is_not_a_change() {
        let f = GenKill::new(set(&[0, 2]), set(&[1]));
        for confluence in [Confluence::Union, Confluence::Intersection] {
            let through_port = Summary::port(3, 4).through(&f, confluence);
            let through_top = Summary::<BitSet>::top().through(&f, confluence);

            // f(p) already implies f(identity) under union; under intersection the
            // constant only restates the bits f fixes
            let mut joined = through_port.clone();
            let changed = joined.join(&through_top, confluence);
            if confluence == Confluence::Union {
                assert!(!changed);
                assert_eq!(joined, through_port);
            }
            assert!(!joined.clone().join(&through_top, confluence));
            assert!(!joined.clone().join(&through_port, confluence));
        }
    }

    #[test]
    fn test_equivalent_forms_compare_equal() {
        // Union: a term generating bit 0 next to a constant holding bit 0
        let f = GenKill::new(set(&[0]), set(&[]));
        let mut a = Summary::port(1, 4).through(&f, Confluence::Union);
        a.join(&Summary::constant(set(&[0])), Confluence::Union);
        let b = Summary::port(1, 4).through(&f, Confluence::Union);
        assert_eq!(a, b);

        // Intersection: a constant of every bit is the identity
        let mut c = Summary::port(1, 4);
        c.join(&Summary::constant(BitSet::full(4)), Confluence::Intersection);
        let mut d = Summary::port(1, 4);
        d.join(&Summary::top(), Confluence::Intersection);
        assert_eq!(c, d);

        // A term killing every bit contributes nothing to a union
        let mut e = Summary::port(2, 4).through(&GenKill::constant(set(&[])), Confluence::Union);
        e.join(&Summary::constant(set(&[3])), Confluence::Union);
        assert_eq!(e, Summary::constant(set(&[3])));
    }
}
