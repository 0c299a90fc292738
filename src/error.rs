use thiserror::Error;

macro_rules! structure_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::InvalidStructure {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::InvalidStructure {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// Structural edits, structure building and dataflow solving all report failures through this
/// enum. Most variants describe a precondition that a caller violated (an unknown block, a merge
/// of a block into itself); [`Error::InvalidStructure`] is reserved for broken tree invariants and
/// carries the source location where the violation was detected.
///
/// # Error Categories
///
/// ## Structure Integrity
/// - [`Error::InvalidStructure`] - A structure tree invariant does not hold
/// - [`Error::StructureInvalidated`] - The tree was discarded and must be rebuilt
/// - [`Error::ResourceExhausted`] - The structure arena hit its configured limit
///
/// ## Edit Preconditions
/// - [`Error::UnknownBlock`] - A block number has no structure in the tree
/// - [`Error::UnknownEdge`] - An edge to remove does not exist
/// - [`Error::NotARegion`] - A region operation was applied to a block
/// - [`Error::InvalidMerge`] - Two blocks cannot be merged
/// - [`Error::NoCommonParent`] - Two structures share no enclosing region
///
/// ## Dataflow
/// - [`Error::Interrupted`] - The solve was cancelled through its token
/// - [`Error::WidthMismatch`] - Bit sets of different widths were combined
///
/// # Examples
///
/// ```rust,no_run
/// use structflow::{cfg::Cfg, structure::StructureTree, Error};
///
/// let cfg = Cfg::new();
/// match StructureTree::build(&cfg, &Default::default()) {
///     Ok(tree) => println!("built {} structures", tree.len()),
///     Err(Error::InvalidStructure { message, file, line }) => {
///         eprintln!("broken tree: {} ({}:{})", message, file, line);
///     }
///     Err(e) => eprintln!("Other error: {}", e),
/// }
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A structure tree invariant does not hold.
    ///
    /// Raised by the consistency checker and by edit operations that discover a tree
    /// which is already inconsistent. The error includes the source location where
    /// the violation was detected for debugging purposes.
    ///
    /// # Fields
    ///
    /// * `message` - Description of the violated invariant
    /// * `file` - Source file where the error was detected
    /// * `line` - Source line where the error was detected
    #[error("Invalid structure - {file}:{line}: {message}")]
    InvalidStructure {
        /// The message describing the violation
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// The structure tree has been invalidated.
    ///
    /// Incremental repair was judged unsafe and the whole tree was discarded. Callers
    /// must treat structure as absent until it is rebuilt from the CFG.
    #[error("The structure tree has been invalidated and must be rebuilt")]
    StructureInvalidated,

    /// The structure arena exceeded its configured capacity.
    ///
    /// The associated value is the configured limit.
    #[error("Structure arena exhausted - limit of {0} structures")]
    ResourceExhausted(usize),

    /// No structure represents the given block number.
    #[error("Block {0} is not part of the structure tree")]
    UnknownBlock(usize),

    /// The edge to remove does not exist.
    #[error("There is no edge from {from} to {to}")]
    UnknownEdge {
        /// Source block number
        from: usize,
        /// Target block number
        to: usize,
    },

    /// A region operation was requested on a structure that is not a region.
    #[error("Structure {0} is not a region")]
    NotARegion(usize),

    /// The two blocks cannot be merged.
    ///
    /// Occurs when a block is merged into itself, or when the merged block heads a
    /// region that does not also contain the survivor.
    #[error("Cannot merge block {merged} into block {survivor}")]
    InvalidMerge {
        /// Block that would disappear
        merged: usize,
        /// Block that would absorb it
        survivor: usize,
    },

    /// The two structures do not share an enclosing region.
    #[error("Structures have no common parent")]
    NoCommonParent,

    /// The analysis was interrupted through its cancellation token.
    ///
    /// Any partial result has been discarded.
    #[error("Analysis interrupted")]
    Interrupted,

    /// Two bit sets of different widths were combined.
    #[error("Bit set width mismatch - expected {expected}, found {found}")]
    WidthMismatch {
        /// Width of the receiving set
        expected: usize,
        /// Width of the other set
        found: usize,
    },

    /// Generic error for miscellaneous failures.
    #[error("{0}")]
    Error(String),
}
