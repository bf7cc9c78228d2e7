//! # duel-mcts
//!
//! A Monte Carlo Tree Search decision engine for two-sided, turn-based
//! games with hidden information.
//!
//! ## Design Principles
//!
//! 1. **Game-Agnostic**: The search sees games only through the
//!    `StateAdapter` trait. Choices are opaque tokens identified by a
//!    structural hash.
//!
//! 2. **Agent Perspective**: Every statistic and every proof is stored from
//!    the point of view of the side the search decides for.
//!
//! 3. **Work Carries Over**: Subtrees are kept between decisions and found
//!    again through state fingerprints.
//!
//! ## Modules
//!
//! - `core`: Sides, deterministic RNG, choice identity
//! - `rules`: `StateAdapter` trait for game implementations
//! - `mcts`: Monte Carlo Tree Search
//! - `games`: Scripted game trees and a small card duel

pub mod core;
pub mod games;
pub mod mcts;
pub mod rules;

// Re-export commonly used types
pub use crate::core::{ChoiceDescriptor, ChoiceMode, GameRng, PlayerId, PlayerMap, Visibility};

pub use crate::rules::StateAdapter;

pub use crate::mcts::{
    Averaging, BackupPolicy, ChildReport, MCTSConfig, MCTSNode, MCTSSearch, MCTSTree, NodeId,
    Ratio, RobustMax, SearchError, SearchStats, SelectionPolicy, SimulationPolicy, SolveState,
    TranspositionCache, TreeStats, UCB1,
};
