//! MCTS search statistics for diagnostics and tuning.

use serde::{Deserialize, Serialize};

/// Statistics collected during one decision computation.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SearchStats {
    /// Simulations run for this decision.
    pub simulations: u32,

    /// Simulations already recorded at the root when the search started
    /// (non-zero after a cache hit).
    pub reused_simulations: u32,

    /// Nodes expanded (added to tree).
    pub nodes_expanded: u32,

    /// Deepest path (in tree nodes) walked during search.
    pub max_depth: u16,

    /// Root lookups served by the transposition cache.
    pub cache_hits: u32,

    /// Root lookups that started a fresh tree.
    pub cache_misses: u32,

    /// Nodes registered into the cache.
    pub cache_inserts: u32,

    /// Cached or inner nodes discarded for disagreeing with the live state.
    pub stale_nodes: u32,

    /// Arena compactions performed.
    pub compactions: u32,

    /// Total time spent searching (microseconds).
    pub time_us: u64,

    /// Time spent past the budget (microseconds).
    pub overrun_us: u64,
}

impl SearchStats {
    /// Create new empty statistics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset all statistics to zero.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Calculate simulations per second.
    #[must_use]
    pub fn simulations_per_second(&self) -> f64 {
        if self.time_us == 0 {
            0.0
        } else {
            self.simulations as f64 / (self.time_us as f64 / 1_000_000.0)
        }
    }
}
