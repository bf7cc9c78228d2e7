//! State adapter trait for game implementations.
//!
//! Games implement `StateAdapter` to expose:
//! - Cloning with or without hidden information
//! - Legal choices at the pending decision point
//! - How choices and forced steps modify state
//! - Terminal detection and the winner
//!
//! The search calls into `StateAdapter` but never interprets
//! game-specific concepts directly.

pub mod adapter;

pub use adapter::StateAdapter;
