//! # structflow Prelude
//!
//! This module provides a convenient prelude for the most commonly used types and traits
//! from the structflow library.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all structflow operations
pub use crate::Error;

/// The result type used throughout structflow
pub use crate::Result;

/// Configuration shared by structure building and dataflow
pub use crate::config::{AnalysisConfig, ExitExtractionPolicy};

// ================================================================================================
// Graphs and IR
// ================================================================================================

/// Control flow graph types
pub use crate::cfg::{Block, Cfg, EdgeKind, FlowGraph};

/// Statement trees and symbols
pub use crate::ir::{Node, Opcode, SymbolId, SymbolKind, SymbolTable};

/// Bit sets
pub use crate::utils::{BitSet, OrderedBitSet, SparseBitSet};

// ================================================================================================
// Structure and Dataflow
// ================================================================================================

/// The region hierarchy
pub use crate::structure::{ExtractionOutcome, StructureId, StructureTree};

/// The dataflow engine
pub use crate::dataflow::{
    BitVectorAnalysis, CancellationToken, Confluence, DataflowResults, DataflowSolver, Direction,
    GenKill,
};

/// Concrete analyses
pub use crate::analyses::{
    LiveOnAllPaths, Liveness, PartialRedundancy, ReachingBlocks, ReachingDefinitions,
    RegisterAnticipatability, RegisterAvailability,
};

/// Compilation units
pub use crate::compilation::{compile_all, Compilation};
