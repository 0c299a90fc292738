//! Generic bit-vector dataflow engine.
//!
//! This module solves monotone bit-vector problems over the [`crate::structure`]
//! hierarchy. An analysis describes its lattice and transfer functions through
//! [`BitVectorAnalysis`]; [`DataflowSolver`] computes the fixed point region by region.
//!
//! # Key Components
//!
//! - [`BitVectorAnalysis`] - Trait implemented by every concrete analysis
//! - [`GenKill`] - Transfer functions of the form `(x - kill) ∪ gen`
//! - [`DataflowSolver`] - Structural fixed-point driver
//! - [`DataflowResults`] - Per-block in and out sets
//! - [`CancellationToken`] - Cooperative interruption of long solves
//!
//! # Transfer paths
//!
//! Analyses that can express their block effect as a gen/kill pair opt into the fast
//! path through [`BitVectorAnalysis::supports_gen_and_kill`]. The solver then
//! summarizes every region once as a function of its inputs and composes the
//! summaries up the tree. Other analyses are solved statement by statement, solving
//! nested regions again whenever their input changes. Both paths compute the same sets.
//!
//! # Usage Example
//!
//! ```rust
//! use structflow::{
//!     analyses::Liveness,
//!     cfg::{Cfg, EdgeKind},
//!     config::AnalysisConfig,
//!     dataflow::DataflowSolver,
//!     ir::{Node, SymbolKind, SymbolTable},
//!     structure::StructureTree,
//!     utils::OrderedBitSet,
//! };
//!
//! let mut symbols = SymbolTable::new();
//! let x = symbols.add("x", SymbolKind::Local);
//! let mut cfg = Cfg::new();
//! let def = cfg.add_block_with(vec![Node::store(x, Node::constant(1))]);
//! let use_ = cfg.add_block_with(vec![Node::ret(Some(Node::load(x)))]);
//! cfg.add_edge(def, use_, EdgeKind::Normal)?;
//!
//! let tree = StructureTree::build(&cfg, &AnalysisConfig::default())?;
//! let liveness = Liveness::new(&cfg, &symbols);
//! let results = DataflowSolver::new(&liveness, &cfg, &tree).solve()?;
//!
//! assert!(results.in_state(use_).is_some_and(|s| s.contains(liveness.bit(x).unwrap())));
//! assert!(results.in_state(def).is_some_and(|s| s.is_empty()));
//! # Ok::<(), structflow::Error>(())
//! ```

mod cancel;
mod framework;
mod results;
mod solver;
mod summary;

pub use cancel::CancellationToken;
pub use framework::{AnalysisKind, BitVectorAnalysis, Confluence, Direction, GenKill};
pub use results::{DataflowResults, SolveStats};
pub use solver::{solve, DataflowSolver};
