//! Game implementations.
//!
//! - `scripted`: explicit game trees, for exercising the search on positions
//!   with known outcomes
//! - `duel`: a small two-player card duel with hidden hands

pub mod duel;
pub mod scripted;
