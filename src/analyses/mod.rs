//! Concrete bit-vector analyses.
//!
//! Every analysis here is a thin [`crate::dataflow::BitVectorAnalysis`]: it numbers
//! the facts it tracks, supplies per-block gen/kill sets, and post-processes the
//! solved sets where the result is derived rather than solved directly.
//!
//! | Analysis | Direction | Confluence | Bits |
//! |---|---|---|---|
//! | [`Liveness`] | backward | union | locals and parameters |
//! | [`LiveOnAllPaths`] | backward | intersection | locals and parameters |
//! | [`ReachingDefinitions`] | forward | union | store statements |
//! | [`ReachingBlocks`] | forward | union | blocks |
//! | [`pre`] passes | mixed | mixed | candidate expressions |
//! | [`RegisterAnticipatability`] | backward | intersection | registers |
//! | [`RegisterAvailability`] | forward | intersection | registers |

mod live_on_all_paths;
mod liveness;
mod locals;
pub mod pre;
mod reaching;
mod register;

pub use live_on_all_paths::LiveOnAllPaths;
pub use liveness::Liveness;
pub use locals::LocalIndex;
pub use pre::PartialRedundancy;
pub use reaching::{Definition, ReachingBlocks, ReachingDefinitions};
pub use register::{RegisterAnticipatability, RegisterAvailability};
