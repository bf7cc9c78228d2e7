//! Scripted game: an explicit, hand-built game graph.
//!
//! Every position is a decision for one side, a forced step, or an end
//! state with a known winner. Positions can be shared between branches to
//! produce transpositions, and can be given explicit fingerprints to
//! simulate hash collisions.
//!
//! Used by the integration tests and the benchmark, where proofs and
//! expected decisions must be known in advance.

mod game;

pub use game::{Position, ScriptedGame, ScriptedGameBuilder, ScriptedMove, ScriptedState};
