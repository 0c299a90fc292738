// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![deny(unsafe_code)]

//! # structflow
//!
//! Structural control-flow analysis and bit-vector dataflow for optimizing compilers.
//!
//! `structflow` organizes a method's control flow graph into a hierarchy of nested
//! regions (natural loops, acyclic regions and improper regions), keeps that hierarchy
//! consistent while optimizations edit the graph, and solves monotone bit-vector
//! dataflow problems over it.
//!
//! ## Features
//!
//! - **Structure tree** - Regions built from dominators and back edges, with incremental
//!   edge insertion and removal, block merging, renumbering and region collapsing
//! - **Dataflow engine** - Forward and backward problems, union or intersection
//!   confluence, gen/kill region summaries and a statement-level path
//! - **Analyses** - Liveness, reaching definitions, lazy code motion passes and
//!   register usage analyses
//! - **Parallel compilation** - Independent methods solved on the rayon thread pool
//!
//! ## Quick Start
//!
//! ```rust
//! use structflow::prelude::*;
//!
//! let mut symbols = SymbolTable::new();
//! let x = symbols.add("x", SymbolKind::Local);
//!
//! let mut cfg = Cfg::new();
//! let head = cfg.add_block_with(vec![Node::store(x, Node::constant(0))]);
//! let body = cfg.add_block_with(vec![Node::store(
//!     x,
//!     Node::binary(Opcode::Add, Node::load(x), Node::constant(1)),
//! )]);
//! let exit = cfg.add_block_with(vec![Node::ret(Some(Node::load(x)))]);
//! cfg.add_edge(head, body, EdgeKind::Normal)?;
//! cfg.add_edge(body, body, EdgeKind::Normal)?;
//! cfg.add_edge(body, exit, EdgeKind::Normal)?;
//!
//! let mut unit = Compilation::new("count", cfg, symbols, AnalysisConfig::default());
//! let liveness = Liveness::new(unit.cfg(), unit.symbols());
//! let results = unit.solve(&liveness)?;
//!
//! let bit = liveness.bit(x).unwrap();
//! assert!(results.in_state(body).is_some_and(|s| s.contains(bit)));
//! assert!(results.in_state(head).is_some_and(|s| !s.contains(bit)));
//! # Ok::<(), structflow::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`cfg`] - Control flow graphs and the [`cfg::FlowGraph`] view the engine reads
//! - [`ir`] - Statement trees and symbols
//! - [`structure`] - The region hierarchy and its mutations
//! - [`dataflow`] - The generic solver
//! - [`analyses`] - Concrete analyses built on the solver
//! - [`compilation`] - Per-method units and [`compilation::compile_all`]
//! - [`Error`] and [`Result`] - Error handling

#[macro_use]
pub(crate) mod error;

/// Shared functionality which is used in unit- and integration-tests
#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types and traits.
///
/// # Example
///
/// ```rust
/// use structflow::prelude::*;
///
/// let cfg = Cfg::from_edges(2, &[(0, 1)])?;
/// let tree = StructureTree::build(&cfg, &AnalysisConfig::default())?;
/// assert!(tree.is_valid());
/// # Ok::<(), structflow::Error>(())
/// ```
pub mod prelude;

/// Concrete dataflow analyses.
pub mod analyses;

/// Control flow graphs.
pub mod cfg;

/// Per-method compilation units and parallel compilation.
pub mod compilation;

/// Analysis configuration.
pub mod config;

/// The generic bit-vector dataflow engine.
pub mod dataflow;

/// Intermediate representation consumed by the analyses.
pub mod ir;

/// The structure tree: a hierarchy of regions over a control flow graph.
pub mod structure;

/// Bit sets and graph algorithms.
pub mod utils;

/// `structflow` Result type
///
/// A type alias for [`std::result::Result<T, Error>`] where the error type is always [`Error`].
///
/// # Examples
///
/// ```rust
/// use structflow::{cfg::Cfg, config::AnalysisConfig, structure::StructureTree, Result};
///
/// fn region_count(cfg: &Cfg) -> Result<usize> {
///     Ok(StructureTree::build(cfg, &AnalysisConfig::default())?.len())
/// }
/// ```
pub type Result<T> = std::result::Result<T, Error>;

/// `structflow` Error type
///
/// The main error type for all operations in this crate.
///
/// # Examples
///
/// ```rust
/// use structflow::{cfg::Cfg, config::AnalysisConfig, structure::StructureTree, Error};
///
/// let cfg = Cfg::from_edges(2, &[(0, 1)])?;
/// let mut tree = StructureTree::build(&cfg, &AnalysisConfig::default())?;
/// match tree.merge_blocks(0, 7) {
///     Err(Error::UnknownBlock(block)) => assert_eq!(block, 7),
///     other => panic!("unexpected {other:?}"),
/// }
/// # Ok::<(), structflow::Error>(())
/// ```
pub use error::Error;
