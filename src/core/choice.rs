//! Choice identity and enumeration modes.
//!
//! The search never looks inside a choice token. It only needs a canonical
//! identity to check that a cached subtree still matches the live choice set,
//! and that identity is derived from the token's structure (its `Hash`
//! impl), never from how the token is displayed.

use std::hash::{Hash, Hasher};

use rustc_hash::FxHasher;
use serde::{Deserialize, Serialize};

use super::player::PlayerId;

/// Canonical structural identity of a choice token.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChoiceDescriptor(pub u64);

impl ChoiceDescriptor {
    /// Derive a descriptor from a choice's `Hash` impl.
    ///
    /// Two choices with equal type and parameters get equal descriptors.
    /// FxHash is deterministic across runs, so descriptors are stable.
    #[must_use]
    pub fn of<T: Hash + ?Sized>(choice: &T) -> Self {
        let mut hasher = FxHasher::default();
        choice.hash(&mut hasher);
        Self(hasher.finish())
    }
}

impl std::fmt::Display for ChoiceDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// How legal choices are enumerated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChoiceMode {
    /// Exact, stable enumeration used in the tree phase.
    Exact,
    /// Cheaper (possibly pruned) enumeration used during playouts.
    Simulation,
}

/// How hidden information is treated when the search clones a state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Visibility {
    /// Hidden information is left as-is (the search "cheats").
    Revealed,
    /// Information hidden from this side is replaced by a consistent sample.
    Sampled(PlayerId),
}
