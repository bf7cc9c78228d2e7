//! Monte Carlo Tree Search with proof propagation.
//!
//! The search answers one decision at a time for a designated agent, under
//! a wall-clock budget. Key features:
//!
//! - **Arena tree**: nodes addressed by `NodeId`, children in discovery order
//! - **Transposition cache**: bounded LRU from state fingerprints to nodes,
//!   so work carries over between decisions of a match
//! - **Proven outcomes**: terminal results climb the tree as wins and losses
//!   and override statistics in both selection and the final decision
//! - **Robust-max backup**: a heavily visited child's estimate can replace a
//!   node's running mean
//! - **Configurable Policies**: selection (UCB1/Ratio), backup, simulation
//!
//! ## Usage
//!
//! ```rust
//! use duel_mcts::core::PlayerId;
//! use duel_mcts::games::scripted::ScriptedGameBuilder;
//! use duel_mcts::mcts::{MCTSConfig, MCTSSearch, SolveState};
//! use std::time::Duration;
//!
//! let agent = PlayerId::new(0);
//! let mut builder = ScriptedGameBuilder::new();
//! let win = builder.end(Some(agent));
//! let loss = builder.end(Some(agent.opponent()));
//! let root = builder.decision(agent, &[loss, win]);
//! let (game, state) = builder.build(root);
//!
//! let config = MCTSConfig::default().with_max_simulations(100);
//! let mut search = MCTSSearch::new(game, config);
//! let choice = search.search(&state, agent, Duration::from_secs(5)).unwrap();
//!
//! assert_eq!(choice.0, 1);
//! assert_eq!(search.tree().get(search.root().unwrap()).solve, SolveState::ProvenWin);
//! ```
//!
//! ## Custom Policies
//!
//! ```rust,ignore
//! use duel_mcts::mcts::{Averaging, MCTSSearch, MCTSConfig, Ratio};
//!
//! let search = MCTSSearch::new(game, config)
//!     .with_selection(Ratio)
//!     .with_backup(Averaging);
//! ```

pub mod backup;
pub mod cache;
pub mod config;
pub mod error;
pub mod node;
pub mod policy;
pub mod search;
pub mod stats;
pub mod tree;

// Re-export main types
pub use backup::{Averaging, BackupPolicy, RobustMax};
pub use cache::TranspositionCache;
pub use config::MCTSConfig;
pub use error::SearchError;
pub use node::{MCTSNode, NodeDetails, NodeId, NodeStats, SolveState};
pub use policy::{Playout, RandomPlayout, Ratio, SelectionPolicy, SimulationPolicy, UCB1};
pub use search::{ChildReport, MCTSSearch};
pub use stats::SearchStats;
pub use tree::{MCTSTree, TreeStats};
