//! # Advisor Configuration Module
//!
//! Centralizes the advisor's settings record, the per-run search knobs,
//! and the cost-model constants the default what-if implementation uses.
//! Interdependent values are co-located so they cannot drift apart.
//!
//! ## Knob Relationships
//!
//! ```text
//! MAX_INDEX_COLS (2)
//!       │
//!       └─> upper bound on columns per hypothetical index; the
//!           cross-product widening loop runs widths 2..=MAX_INDEX_COLS
//!           and merge compatibility re-checks the bound per pair
//!
//! ENUMERATION_THRESHOLD (2)
//!       │
//!       └─> width m of the exhaustive stage; subsets of size <= m are
//!           costed exhaustively, everything beyond is greedy. Raising
//!           this explodes the subset count combinatorially.
//!
//! NUM_INDEXES (4)
//!       │
//!       └─> cap k on the recommended configuration; if k <= m the
//!           exhaustive stage already answers the query and greedy
//!           never runs
//! ```

use std::time::Duration;

/// Default cap on columns per multi-column hypothetical index.
pub const DEFAULT_MAX_INDEX_COLS: u8 = 2;

/// Default width of the bounded exhaustive enumeration stage.
pub const DEFAULT_ENUMERATION_THRESHOLD: u8 = 2;

/// Default cap on the number of recommended indexes.
pub const DEFAULT_NUM_INDEXES: u8 = 4;

/// Default number of logged queries that must accumulate before a tuning
/// pass runs.
pub const DEFAULT_NUM_QUERIES_THRESHOLD: u32 = 10;

/// Default pause between periodic advisor invocations.
pub const DEFAULT_WAIT_INTERVAL: Duration = Duration::from_secs(60);

// ============================================================================
// COST MODEL CONSTANTS
// Used by the heuristic what-if implementation; mirror the storage
// engine's page geometry so estimates stay comparable across releases.
// ============================================================================

/// Page size assumed by the cost model, in bytes.
pub const COST_PAGE_SIZE: f64 = 16384.0;

/// Average row size assumed by the cost model, in bytes.
pub const COST_AVG_ROW_SIZE: f64 = 100.0;

/// Cost charged per page read.
pub const COST_IO_PER_PAGE: f64 = 1.0;

/// Cost charged per row processed.
pub const COST_CPU_PER_ROW: f64 = 0.01;

/// Selectivity assumed for one equality predicate.
pub const EQUALITY_SELECTIVITY: f64 = 0.01;

/// Selectivity floor for fully-matched unique lookups.
pub const UNIQUE_SELECTIVITY: f64 = 0.001;

/// Assumed B-tree height charged per index descent.
pub const INDEX_HEIGHT_IO: f64 = 3.0;

/// Search knobs for one advisor run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexSelectionKnobs {
    /// Maximum columns per hypothetical index.
    pub max_index_cols: u8,
    /// Width m of the bounded exhaustive enumeration stage.
    pub enumeration_threshold: u8,
    /// Cap k on the number of returned indexes.
    pub num_indexes: u8,
}

impl Default for IndexSelectionKnobs {
    fn default() -> Self {
        Self {
            max_index_cols: DEFAULT_MAX_INDEX_COLS,
            enumeration_threshold: DEFAULT_ENUMERATION_THRESHOLD,
            num_indexes: DEFAULT_NUM_INDEXES,
        }
    }
}

/// Settings record for the periodic advisor driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdvisorSettings {
    /// Master switch; when false the periodic driver does nothing.
    pub brain_enabled: bool,
    /// Minimum number of new history entries before a tuning pass runs.
    pub num_queries_threshold: u32,
    pub max_index_cols: u8,
    pub enumeration_threshold: u8,
    pub num_indexes: u8,
    /// Pause between periodic invocations.
    pub wait_interval: Duration,
}

impl AdvisorSettings {
    pub fn knobs(&self) -> IndexSelectionKnobs {
        IndexSelectionKnobs {
            max_index_cols: self.max_index_cols,
            enumeration_threshold: self.enumeration_threshold,
            num_indexes: self.num_indexes,
        }
    }
}

impl Default for AdvisorSettings {
    fn default() -> Self {
        Self {
            brain_enabled: true,
            num_queries_threshold: DEFAULT_NUM_QUERIES_THRESHOLD,
            max_index_cols: DEFAULT_MAX_INDEX_COLS,
            enumeration_threshold: DEFAULT_ENUMERATION_THRESHOLD,
            num_indexes: DEFAULT_NUM_INDEXES,
            wait_interval: DEFAULT_WAIT_INTERVAL,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_knobs_match_settings() {
        let settings = AdvisorSettings::default();
        assert_eq!(settings.knobs(), IndexSelectionKnobs::default());
    }

    #[test]
    fn selectivity_constants_are_ordered() {
        assert!(UNIQUE_SELECTIVITY < EQUALITY_SELECTIVITY);
        assert!(EQUALITY_SELECTIVITY < 1.0);
    }
}
