//! Core types: sides, deterministic RNG, choice identity.
//!
//! These are game-agnostic. Games plug in through `rules::StateAdapter`.

pub mod choice;
pub mod player;
pub mod rng;

pub use choice::{ChoiceDescriptor, ChoiceMode, Visibility};
pub use player::{PlayerId, PlayerMap, SIDES};
pub use rng::GameRng;
