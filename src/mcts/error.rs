//! Search error type.

use thiserror::Error;

/// Errors surfaced by a decision computation.
///
/// Both variants signal a defect in the game collaborator, not a
/// recoverable search condition.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SearchError {
    #[error("no legal choices at a pending decision (after {action_count} actions)")]
    NoLegalChoices { action_count: u64 },

    #[error("state has no pending decision to search")]
    NoPendingDecision,
}
