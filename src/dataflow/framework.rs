//! Bit-vector dataflow analysis framework: direction, confluence, gen/kill functions
//! and the [`BitVectorAnalysis`] trait.
//!
//! Any concrete analysis (liveness, reaching definitions, the PRE passes) implements
//! [`BitVectorAnalysis`] to work with the [`crate::dataflow::DataflowSolver`].

use strum::{Display, EnumCount, EnumIter, IntoStaticStr};

use crate::{cfg::EdgeKind, ir::Node, utils::OrderedBitSet};

/// Direction of a dataflow analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Direction {
    /// Information flows from the method entry towards its exits.
    ///
    /// A block's input is the confluence of its predecessors' outputs.
    Forward,

    /// Information flows from the exits towards the entry.
    ///
    /// A block's output is the confluence of its successors' inputs.
    Backward,
}

/// Confluence operator applied where control flow merges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Confluence {
    /// Set union; facts that hold on some path
    Union,
    /// Set intersection; facts that hold on every path
    Intersection,
}

impl Confluence {
    /// Returns the identity of the operator: empty for union, universal for
    /// intersection. This is also the value of a program point not yet visited.
    #[must_use]
    pub fn identity<S: OrderedBitSet>(self, width: usize) -> S {
        match self {
            Confluence::Union => S::empty(width),
            Confluence::Intersection => S::universal(width),
        }
    }

    /// Returns the absorbing element of the operator.
    #[must_use]
    pub fn absorbing<S: OrderedBitSet>(self, width: usize) -> S {
        match self {
            Confluence::Union => S::universal(width),
            Confluence::Intersection => S::empty(width),
        }
    }

    /// Joins `other` into `acc`. Returns `true` if `acc` changed.
    pub fn join<S: OrderedBitSet>(self, acc: &mut S, other: &S) -> bool {
        match self {
            Confluence::Union => acc.union_with(other),
            Confluence::Intersection => acc.intersect_with(other),
        }
    }
}

/// Identifies a concrete analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, EnumCount, IntoStaticStr)]
pub enum AnalysisKind {
    /// Live local variables
    Liveness,
    /// Variables live on every path to an exit
    LiveOnAllPaths,
    /// Reaching store statements
    ReachingDefinitions,
    /// Reaching blocks
    ReachingBlocks,
    /// Expressions anticipated on every path
    GlobalAnticipatability,
    /// Earliest placement points of expressions
    Earliestness,
    /// Points to which a computation may be delayed
    Delayedness,
    /// Latest placement points of expressions
    Latestness,
    /// Computations whose value is used only locally
    Isolatedness,
    /// Registers used on every path forward
    RegisterAnticipatability,
    /// Registers used on every path backward
    RegisterAvailability,
}

/// A transfer function of the form `f(x) = (x - kill) ∪ gen`.
///
/// The family is closed under composition and under both confluence operators, which
/// is what lets the solver summarize whole regions as functions of their inputs.
/// Values are kept normalized so that `kill` and `gen` are disjoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GenKill<S> {
    /// Bits set regardless of the input
    pub gen: S,
    /// Bits cleared unless generated
    pub kill: S,
}

impl<S: OrderedBitSet> GenKill<S> {
    /// Creates a function from its parts.
    #[must_use]
    pub fn new(gen: S, mut kill: S) -> Self {
        kill.difference_with(&gen);
        Self { gen, kill }
    }

    /// The identity function.
    #[must_use]
    pub fn identity(width: usize) -> Self {
        Self {
            gen: S::empty(width),
            kill: S::empty(width),
        }
    }

    /// The function that ignores its input and returns `set`.
    #[must_use]
    pub fn constant(set: S) -> Self {
        let kill = set.complement();
        Self { gen: set, kill }
    }

    /// Returns the universe size.
    #[must_use]
    pub fn width(&self) -> usize {
        self.gen.width()
    }

    /// Returns `f(input)`.
    #[must_use]
    pub fn apply(&self, input: &S) -> S {
        let mut out = input.clone();
        self.apply_in_place(&mut out);
        out
    }

    /// Replaces `set` with `f(set)`.
    pub fn apply_in_place(&self, set: &mut S) {
        set.difference_with(&self.kill);
        set.union_with(&self.gen);
    }

    /// Returns `next ∘ self`: apply `self` first, then `next`.
    #[must_use]
    pub fn then(&self, next: &Self) -> Self {
        let mut gen = self.gen.clone();
        gen.difference_with(&next.kill);
        gen.union_with(&next.gen);
        let mut kill = self.kill.clone();
        kill.union_with(&next.kill);
        Self::new(gen, kill)
    }

    /// Returns the pointwise confluence `x -> f(x) ⋄ g(x)`.
    #[must_use]
    pub fn meet(&self, other: &Self, confluence: Confluence) -> Self {
        match confluence {
            Confluence::Union => {
                let mut gen = self.gen.clone();
                gen.union_with(&other.gen);
                let mut kill = self.kill.clone();
                kill.intersect_with(&other.kill);
                Self::new(gen, kill)
            }
            Confluence::Intersection => {
                let mut gen = self.gen.clone();
                gen.intersect_with(&other.gen);
                let mut kill = self.kill.clone();
                kill.union_with(&other.kill);
                Self::new(gen, kill)
            }
        }
    }

    /// Returns the transfer along an exceptional out-edge, `x -> x ⋄ f(x)`.
    ///
    /// An exception may leave the block before or after any of its effects; the
    /// confluence of the unchanged and the fully transformed input covers both.
    #[must_use]
    pub fn exceptional(&self, confluence: Confluence) -> Self {
        Self::identity(self.width()).meet(self, confluence)
    }
}

/// A bit-vector dataflow analysis solvable by [`crate::dataflow::DataflowSolver`].
///
/// An analysis supplies the width of its sets, its direction and confluence, the
/// boundary value, and block transfer functions. Transfer is supplied either per
/// statement through [`BitVectorAnalysis::analyze_node`] (or per block through
/// [`BitVectorAnalysis::transfer_block`]), or as precomputed gen/kill pairs when
/// [`BitVectorAnalysis::supports_gen_and_kill`] returns `true`. Both must describe the
/// same function; the solver picks the gen/kill form when it is available.
///
/// # Example
///
/// ```rust
/// use structflow::{
///     dataflow::{AnalysisKind, BitVectorAnalysis, Confluence, Direction, GenKill},
///     ir::Node,
///     utils::{BitSet, OrderedBitSet},
/// };
///
/// /// Marks every block as reached.
/// struct Touched(usize);
///
/// impl BitVectorAnalysis for Touched {
///     type Set = BitSet;
///     const DIRECTION: Direction = Direction::Forward;
///     const CONFLUENCE: Confluence = Confluence::Union;
///
///     fn kind(&self) -> AnalysisKind {
///         AnalysisKind::ReachingBlocks
///     }
///
///     fn bit_count(&self) -> usize {
///         self.0
///     }
///
///     fn transfer_block(&self, block: usize, _statements: &[Node], set: &mut BitSet) {
///         set.insert(block);
///     }
/// }
/// ```
pub trait BitVectorAnalysis {
    /// Set representation used by this analysis.
    type Set: OrderedBitSet;

    /// Direction of propagation.
    const DIRECTION: Direction;

    /// Operator applied at merge points.
    const CONFLUENCE: Confluence;

    /// Identifies the analysis in logs and statistics.
    fn kind(&self) -> AnalysisKind;

    /// Number of bits in every set.
    fn bit_count(&self) -> usize;

    /// Value at the method boundary: the entry for forward analyses, blocks without
    /// normal successors for backward ones.
    fn boundary(&self) -> Self::Set {
        Self::Set::empty(self.bit_count())
    }

    /// Identity of the confluence operator.
    fn initialize_info(&self) -> Self::Set {
        Self::CONFLUENCE.identity(self.bit_count())
    }

    /// The element opposite to [`BitVectorAnalysis::initialize_info`].
    fn inverse_initialize_info(&self) -> Self::Set {
        Self::CONFLUENCE.absorbing(self.bit_count())
    }

    /// Returns `true` if [`BitVectorAnalysis::block_gen_kill`] describes the block
    /// transfer exactly.
    fn supports_gen_and_kill(&self) -> bool {
        false
    }

    /// Returns the gen/kill form of the transfer through `block`.
    fn block_gen_kill(&self, _block: usize, _statements: &[Node]) -> GenKill<Self::Set> {
        GenKill::identity(self.bit_count())
    }

    /// Applies the effect of one statement to `set`.
    fn analyze_node(&self, _block: usize, _node: &Node, _set: &mut Self::Set) {}

    /// Applies the effect of a whole block to `set`.
    ///
    /// The default visits the statements through [`BitVectorAnalysis::analyze_node`],
    /// in reverse order for backward analyses.
    fn transfer_block(&self, block: usize, statements: &[Node], set: &mut Self::Set) {
        match Self::DIRECTION {
            Direction::Forward => {
                for statement in statements {
                    self.analyze_node(block, statement, set);
                }
            }
            Direction::Backward => {
                for statement in statements.iter().rev() {
                    self.analyze_node(block, statement, set);
                }
            }
        }
    }

    /// Returns an extra transfer applied along the block edge `from -> to`.
    fn edge_transfer(&self, _from: usize, _to: usize, _kind: EdgeKind) -> Option<GenKill<Self::Set>> {
        None
    }
}
