//! MCTS node structures.
//!
//! Uses arena-based allocation with index references (NodeId) for efficiency
//! and serializability. A node stands for one decision alternative: the
//! choice taken at its parent plus everything learned about the decision
//! point that follows it.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::core::ChoiceDescriptor;

/// Samples required before the running variance is trusted.
pub const MIN_VARIANCE_SAMPLES: u32 = 10;

/// Index into the MCTSTree node arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Sentinel value representing no node.
    pub const NONE: NodeId = NodeId(u32::MAX);

    /// Create a new node ID.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Check if this is the NONE sentinel.
    #[inline]
    #[must_use]
    pub const fn is_none(self) -> bool {
        self.0 == u32::MAX
    }

    /// Get the raw index value.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_none() {
            write!(f, "NodeId(NONE)")
        } else {
            write!(f, "NodeId({})", self.0)
        }
    }
}

/// Game-theoretic status of a node, from the agent's point of view.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolveState {
    #[default]
    Unknown,
    ProvenWin,
    ProvenLoss,
}

impl SolveState {
    #[inline]
    #[must_use]
    pub fn is_solved(self) -> bool {
        self != SolveState::Unknown
    }

    /// Is this outcome a loss for the side that maximizes (`true`) or
    /// minimizes (`false`) the agent's reward?
    #[inline]
    #[must_use]
    pub fn is_loss_for(self, maximizer: bool) -> bool {
        match self {
            SolveState::ProvenWin => !maximizer,
            SolveState::ProvenLoss => maximizer,
            SolveState::Unknown => false,
        }
    }

    /// Is this outcome a win for the given side?
    #[inline]
    #[must_use]
    pub fn is_win_for(self, maximizer: bool) -> bool {
        match self {
            SolveState::ProvenWin => maximizer,
            SolveState::ProvenLoss => !maximizer,
            SolveState::Unknown => false,
        }
    }
}

/// Running simulation statistics.
///
/// `sum` and the Welford accumulator `m2` are kept in the agent's reward
/// scale; `value` converts to the perspective of whoever picks this node.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeStats {
    pub visits: u32,
    pub sum: f64,
    pub m2: f64,
    /// Largest child visit count that triggered a robust-max check.
    pub max_child_visits: u32,
}

impl NodeStats {
    /// Record one simulation result (Welford update).
    pub fn record(&mut self, reward: f64) {
        let old_mean = self.mean();
        self.sum += reward;
        self.visits += 1;
        let new_mean = self.mean();
        self.m2 += (reward - old_mean) * (reward - new_mean);
    }

    /// Raw average reward (agent scale), 0 when unvisited.
    #[inline]
    #[must_use]
    pub fn mean(&self) -> f64 {
        if self.visits == 0 {
            0.0
        } else {
            self.sum / self.visits as f64
        }
    }

    /// Value estimate seen from the parent's acting side.
    #[inline]
    #[must_use]
    pub fn value(&self, parent_is_maximizer: bool) -> f64 {
        if parent_is_maximizer {
            self.mean()
        } else {
            1.0 - self.mean()
        }
    }

    /// Sample variance, pinned to 1.0 until enough samples exist.
    #[must_use]
    pub fn variance(&self) -> f64 {
        if self.visits < MIN_VARIANCE_SAMPLES {
            1.0
        } else {
            self.m2 / (self.visits - 1) as f64
        }
    }
}

/// What is known about the decision point at a node once its live choice
/// set has been observed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeDetails {
    /// The agent owns this decision.
    pub is_maximizer: bool,
    /// Canonical descriptor per live choice, in enumeration order.
    pub choices: Vec<ChoiceDescriptor>,
}

impl NodeDetails {
    /// Branching factor fixed at first observation.
    #[inline]
    #[must_use]
    pub fn max_children(&self) -> usize {
        self.choices.len()
    }
}

/// A node in the MCTS tree.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MCTSNode {
    /// Parent node (NONE for a fresh root).
    pub parent: NodeId,

    /// Position of this node's choice in the parent's enumeration.
    pub choice_index: u32,

    /// Identity of the choice leading here.
    pub descriptor: ChoiceDescriptor,

    /// Explored alternatives in discovery order.
    pub children: SmallVec<[NodeId; 8]>,

    /// Decision point details (None until first observed).
    pub details: Option<NodeDetails>,

    pub stats: NodeStats,

    pub solve: SolveState,

    /// Distance to the proof when solved.
    pub steps: u32,

    /// Distinct children proven losing for this node's acting side.
    pub lose_count: u32,

    /// Registered in the transposition cache.
    pub cached: bool,
}

impl MCTSNode {
    /// Create a node for the choice at `choice_index` of `parent`.
    pub fn new(parent: NodeId, choice_index: u32, descriptor: ChoiceDescriptor) -> Self {
        Self {
            parent,
            choice_index,
            descriptor,
            children: SmallVec::new(),
            details: None,
            stats: NodeStats::default(),
            solve: SolveState::Unknown,
            steps: 0,
            lose_count: 0,
            cached: false,
        }
    }

    /// Create a root node.
    pub fn root() -> Self {
        Self::new(NodeId::NONE, 0, ChoiceDescriptor(0))
    }

    #[inline]
    #[must_use]
    pub fn has_details(&self) -> bool {
        self.details.is_some()
    }

    /// Does the agent own the decision at this node?
    ///
    /// False until the decision point has been observed.
    #[inline]
    #[must_use]
    pub fn is_maximizer(&self) -> bool {
        self.details.as_ref().map_or(false, |d| d.is_maximizer)
    }

    #[inline]
    #[must_use]
    pub fn max_children(&self) -> Option<usize> {
        self.details.as_ref().map(NodeDetails::max_children)
    }

    #[inline]
    #[must_use]
    pub fn is_solved(&self) -> bool {
        self.solve.is_solved()
    }

    #[inline]
    #[must_use]
    pub fn is_win(&self) -> bool {
        self.solve == SolveState::ProvenWin
    }

    #[inline]
    #[must_use]
    pub fn is_loss(&self) -> bool {
        self.solve == SolveState::ProvenLoss
    }

    pub fn set_win(&mut self, steps: u32) {
        self.solve = SolveState::ProvenWin;
        self.steps = steps;
    }

    pub fn set_loss(&mut self, steps: u32) {
        self.solve = SolveState::ProvenLoss;
        self.steps = steps;
    }

    /// Are there live choices without a child yet?
    #[must_use]
    pub fn has_unexplored(&self, live_choices: usize) -> bool {
        self.children.len() < live_choices
    }

    /// Compare recorded details against a live enumeration.
    ///
    /// Nodes without details match anything.
    #[must_use]
    pub fn matches_choices(&self, live: &[ChoiceDescriptor]) -> bool {
        match &self.details {
            None => true,
            Some(details) => details.choices.as_slice() == live,
        }
    }
}
