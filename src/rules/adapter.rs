//! The contract between the search and a game.

use std::fmt::Debug;
use std::hash::Hash;

use crate::core::{ChoiceDescriptor, ChoiceMode, GameRng, PlayerId, Visibility};

/// State adapter trait.
///
/// Games implement this trait to let the search drive them.
///
/// ## Implementation Notes
///
/// - `legal_choices`: order must be stable for a given state; the position
///   of a choice in the `Exact` enumeration becomes a persistent child index
/// - `step`: advances a state that has no pending decision (phase changes,
///   forced events); it must make progress
/// - `fingerprint`: equal for state-equivalent positions, independent of
///   the path that led there
/// - `action_count`: monotonically increasing; used to bound playouts
pub trait StateAdapter {
    /// Game state handle.
    type State: Clone;

    /// Opaque choice token.
    type Choice: Clone + Debug + Hash;

    /// Deep copy of a state for one simulation.
    ///
    /// With `Visibility::Sampled(side)` information hidden from `side` is
    /// replaced by a sample consistent with what `side` can observe.
    fn clone_state(&self, state: &Self::State, visibility: Visibility, rng: &mut GameRng) -> Self::State;

    /// Has the game ended?
    fn is_terminal(&self, state: &Self::State) -> bool;

    /// Winner of a terminal state (`None` for a draw or an unfinished game).
    fn winner(&self, state: &Self::State) -> Option<PlayerId>;

    /// Is a side waiting on a choice?
    fn has_pending_decision(&self, state: &Self::State) -> bool;

    /// Side that owns the pending decision.
    fn next_decision_owner(&self, state: &Self::State) -> PlayerId;

    /// Legal choices at the pending decision point.
    fn legal_choices(&self, state: &Self::State, mode: ChoiceMode) -> Vec<Self::Choice>;

    /// Apply a choice to the pending decision.
    fn apply(&self, state: &mut Self::State, choice: &Self::Choice);

    /// Advance a state that has no pending decision.
    fn step(&self, state: &mut Self::State);

    /// Transposition key of a state.
    fn fingerprint(&self, state: &Self::State) -> u64;

    /// Number of actions executed so far.
    fn action_count(&self, state: &Self::State) -> u64;

    /// Canonical identity of a choice.
    ///
    /// Default implementation hashes the token's structure.
    fn describe(&self, choice: &Self::Choice) -> ChoiceDescriptor {
        ChoiceDescriptor::of(choice)
    }
}
