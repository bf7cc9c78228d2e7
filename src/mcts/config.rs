//! MCTS configuration parameters.

use serde::{Deserialize, Serialize};

/// MCTS configuration parameters.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MCTSConfig {
    /// UCB1 exploration constant (default: sqrt(2) = 1.414).
    /// Higher values favor exploration over exploitation.
    pub exploration_constant: f64,

    /// Score shift applied to proven children during selection.
    /// Proven losses for the acting side get `-proven_bonus`, proven wins
    /// get `+proven_bonus`.
    pub proven_bonus: f64,

    /// Additive decision score for proven-win root children.
    pub decision_boost: f64,

    /// Child visits required before robust-max backup can override
    /// the parent's average.
    pub robust_min_visits: u32,

    /// Action ceiling for one descent or one playout.
    pub max_actions: u64,

    /// Time budget per difficulty level, in milliseconds.
    pub ms_per_level: u64,

    /// Hard cap on simulations per decision (0 = unlimited).
    pub max_simulations: u32,

    /// Maximum nodes in the arena before it is compacted.
    pub max_nodes: usize,

    /// Transposition cache capacity (entries).
    pub cache_capacity: usize,

    /// Search with hidden information revealed.
    /// When false, each simulation samples the opponent's hidden state.
    pub cheat: bool,

    /// Log a per-child report after each decision.
    pub diagnostics: bool,

    /// Budget overrun (ms) above which a warning is logged.
    pub overrun_warn_ms: u64,

    /// Random seed for the search RNG.
    /// Same seed produces deterministic searches.
    pub seed: u64,
}

impl Default for MCTSConfig {
    fn default() -> Self {
        Self {
            exploration_constant: std::f64::consts::SQRT_2,
            proven_bonus: 2.0,
            decision_boost: 1_000_000.0,
            robust_min_visits: 100,
            max_actions: 10_000,
            ms_per_level: 1000,
            max_simulations: 0,
            max_nodes: 500_000,
            cache_capacity: 1000,
            cheat: true,
            diagnostics: false,
            overrun_warn_ms: 100,
            seed: 42,
        }
    }
}

impl MCTSConfig {
    /// Create a new config with custom exploration constant.
    pub fn with_exploration(mut self, c: f64) -> Self {
        self.exploration_constant = c;
        self
    }

    /// Create a new config with custom seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Cap the number of simulations per decision.
    pub fn with_max_simulations(mut self, sims: u32) -> Self {
        self.max_simulations = sims;
        self
    }

    /// Create a new config with custom action ceiling.
    pub fn with_max_actions(mut self, actions: u64) -> Self {
        self.max_actions = actions;
        self
    }

    /// Create a new config with custom cache capacity.
    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    /// Create a new config with custom arena size limit.
    pub fn with_max_nodes(mut self, nodes: usize) -> Self {
        self.max_nodes = nodes;
        self
    }

    /// Toggle hidden-information cheating.
    pub fn with_cheat(mut self, cheat: bool) -> Self {
        self.cheat = cheat;
        self
    }

    /// Toggle the per-decision diagnostic report.
    pub fn with_diagnostics(mut self, diagnostics: bool) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Time budget for a difficulty level.
    #[must_use]
    pub fn budget_for_level(&self, level: u32) -> std::time::Duration {
        std::time::Duration::from_millis(self.ms_per_level.saturating_mul(u64::from(level)))
    }
}
