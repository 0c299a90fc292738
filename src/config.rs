//! Analysis configuration
//!
//! This module provides the knobs that control how much checking and tracing the
//! structure tree and the dataflow engine perform, and how incremental structure
//! repair falls back when it cannot proceed safely.

use strum::{Display, EnumIter};

/// What [`crate::structure::StructureTree::extract_unconditional_exits`] does when
/// repairing the tree incrementally is not obviously safe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumIter)]
pub enum ExitExtractionPolicy {
    /// Always repair in place. Candidates inside improper regions are left where they are.
    Repair,
    /// Repair in place, but discard the tree when a candidate sits inside an improper region
    #[default]
    RepairOrInvalidate,
    /// Discard the tree whenever an extraction would be needed
    Invalidate,
}

/// Configuration for structural analysis and dataflow solving
///
/// A configuration is read-only once a compilation starts and may be shared freely
/// between parallel compilations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct AnalysisConfig {
    /// Run the full invariant audit after every structural edit (expensive)
    /// A failing audit turns the edit into an `Error::InvalidStructure`
    pub check_structure_after_edits: bool,

    /// Fallback used by unconditional-exit extraction
    pub exit_extraction_policy: ExitExtractionPolicy,

    /// Node count at which an acyclic interval becomes a region of its own (default: 100)
    pub acyclic_region_threshold: usize,

    /// Maximum number of live structures in one tree (default: 1 << 20)
    pub max_structures: usize,

    /// Dump the structure tree at trace level after it is built
    pub trace_structure: bool,

    /// Dump per-block dataflow sets at trace level after each solve
    pub trace_dataflow: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            check_structure_after_edits: false,
            exit_extraction_policy: ExitExtractionPolicy::RepairOrInvalidate,
            acyclic_region_threshold: 100,
            max_structures: 1 << 20,
            trace_structure: false,
            trace_dataflow: false,
        }
    }
}

impl AnalysisConfig {
    /// Creates a configuration tuned for throughput
    ///
    /// Skips the invariant audit and all tracing, and repairs the tree in place
    /// whenever it can.
    #[must_use]
    pub fn fast() -> Self {
        Self {
            check_structure_after_edits: false,
            exit_extraction_policy: ExitExtractionPolicy::Repair,
            trace_structure: false,
            trace_dataflow: false,
            ..Self::default()
        }
    }

    /// Creates a configuration for testing and debugging
    ///
    /// Audits the tree after every edit and traces both the structure and the
    /// dataflow sets.
    #[must_use]
    pub fn strict() -> Self {
        Self {
            check_structure_after_edits: true,
            exit_extraction_policy: ExitExtractionPolicy::RepairOrInvalidate,
            trace_structure: true,
            trace_dataflow: true,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analysis_config_presets() {
        let fast = AnalysisConfig::fast();
        assert!(!fast.check_structure_after_edits);
        assert_eq!(fast.exit_extraction_policy, ExitExtractionPolicy::Repair);
        assert!(!fast.trace_dataflow);

        let strict = AnalysisConfig::strict();
        assert!(strict.check_structure_after_edits);
        assert!(strict.trace_structure);
        assert!(strict.trace_dataflow);
        assert_eq!(strict.acyclic_region_threshold, 100);
    }

    #[test]
    fn test_default_config() {
        let default = AnalysisConfig::default();
        assert_eq!(
            default.exit_extraction_policy,
            ExitExtractionPolicy::RepairOrInvalidate
        );
        assert_eq!(default.acyclic_region_threshold, 100);
        assert_eq!(ExitExtractionPolicy::default(), default.exit_extraction_policy);
    }
}
