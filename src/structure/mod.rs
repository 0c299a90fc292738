//! Structural analysis: the region hierarchy of a method.
//!
//! A [`StructureTree`] organizes the blocks of a CFG into nested regions. Leaves wrap
//! one basic block each; a region owns an ordered set of subnodes, the edges between
//! them and the edges that leave it. Each region is classified as acyclic, as a natural
//! loop (its only back edges go to the entry), or as improper (it contains some other
//! cycle, typically from irreducible control flow).
//!
//! # Key Components
//!
//! - [`StructureTree`] - Arena of structures with traversal helpers
//! - [`Structure`], [`StructureKind`], [`Region`] - The nodes of the hierarchy
//! - [`StructureTree::build`] - Bottom-up construction from a [`crate::cfg::FlowGraph`]
//! - Edits that keep the tree consistent with CFG changes:
//!   [`StructureTree::add_edge`], [`StructureTree::remove_edge`],
//!   [`StructureTree::merge_blocks`], [`StructureTree::collapse_into_parent`],
//!   [`StructureTree::extract_unconditional_exits`], [`StructureTree::renumber`]
//! - [`StructureTree::check_structure`] - Full invariant audit
//!
//! # Invariants
//!
//! Every edit leaves the tree consistent, or invalidated. In particular the exit edges
//! of a region correspond one-to-one, by target number and edge kind, to its parent's
//! edges from that region, and a region always carries the number of its entry.
//!
//! # Examples
//!
//! ```rust
//! use structflow::{
//!     cfg::{Cfg, EdgeKind},
//!     config::AnalysisConfig,
//!     structure::StructureTree,
//! };
//!
//! let mut cfg = Cfg::new();
//! let entry = cfg.add_block();
//! let header = cfg.add_block();
//! let body = cfg.add_block();
//! let exit = cfg.add_block();
//! cfg.add_edge(entry, header, EdgeKind::Normal)?;
//! cfg.add_edge(header, body, EdgeKind::Normal)?;
//! cfg.add_edge(body, header, EdgeKind::Normal)?;
//! cfg.add_edge(header, exit, EdgeKind::Normal)?;
//!
//! let tree = StructureTree::build(&cfg, &AnalysisConfig::default())?;
//! let lp = tree.containing_loop(tree.block_structure(body)?)?.unwrap();
//! assert_eq!(tree.number(lp)?, header);
//! tree.check_structure()?;
//! # Ok::<(), structflow::Error>(())
//! ```

mod builder;
mod check;
mod collapse;
mod edit;
mod extract;
mod induction;
mod merge;
mod node;
mod renumber;
mod tree;

pub use crate::config::ExitExtractionPolicy;
pub use extract::ExtractionOutcome;
pub use node::{
    InductionVariable, Region, RegionEdge, RegionFlags, Structure, StructureId, StructureKind,
    SubNode,
};
pub use tree::StructureTree;
