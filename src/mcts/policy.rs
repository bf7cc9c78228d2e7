//! MCTS policies for selection, final decision, and simulation.
//!
//! Policies are trait-based to allow customization:
//! - `SelectionPolicy`: How to score children during the tree phase (UCB1, Ratio)
//! - `SimulationPolicy`: How to run playouts (uniform random over cheap choices)
//!
//! Proven outcomes are layered on top of any selection policy by
//! `proven_modifier`, and on top of visit counts by `decision_score`.

use std::cmp::Ordering;

use crate::core::{ChoiceMode, GameRng, PlayerId};
use crate::rules::StateAdapter;

use super::config::MCTSConfig;
use super::error::SearchError;
use super::node::{MCTSNode, NodeId, NodeStats, SolveState};
use super::tree::MCTSTree;

// =============================================================================
// Selection Policy
// =============================================================================

/// Policy for scoring children during the tree phase.
pub trait SelectionPolicy: Send + Sync {
    /// Score a child from its parent's acting side.
    fn score(
        &self,
        child: &NodeStats,
        parent_visits: u32,
        parent_is_maximizer: bool,
        config: &MCTSConfig,
    ) -> f64;
}

/// UCB1 (Upper Confidence Bound) selection policy.
///
/// Balances exploitation (high value) with exploration (low visits).
/// Formula: v + c * sqrt(ln(N) / n)
#[derive(Clone, Debug, Default)]
pub struct UCB1;

impl SelectionPolicy for UCB1 {
    fn score(
        &self,
        child: &NodeStats,
        parent_visits: u32,
        parent_is_maximizer: bool,
        config: &MCTSConfig,
    ) -> f64 {
        if child.visits == 0 {
            return f64::INFINITY;
        }
        let ln_parent = (parent_visits.max(1) as f64).ln();
        child.value(parent_is_maximizer)
            + config.exploration_constant * (ln_parent / child.visits as f64).sqrt()
    }
}

/// Ratio selection policy.
///
/// Formula: (v * n + K) / (n + 2K) with K = 1. Consistent and frugal for
/// rewards in [0, 1], but explores less than UCB1.
#[derive(Clone, Debug, Default)]
pub struct Ratio;

impl Ratio {
    const K: f64 = 1.0;
}

impl SelectionPolicy for Ratio {
    fn score(
        &self,
        child: &NodeStats,
        _parent_visits: u32,
        parent_is_maximizer: bool,
        _config: &MCTSConfig,
    ) -> f64 {
        let n = child.visits as f64;
        (child.value(parent_is_maximizer) * n + Self::K) / (n + 2.0 * Self::K)
    }
}

/// Shift a raw score by what is already proven about the child.
///
/// Children proven losing for the parent's side sink, children proven
/// winning for it rise. Neither is excluded outright.
#[must_use]
pub fn proven_modifier(score: f64, child: SolveState, parent_is_maximizer: bool, bonus: f64) -> f64 {
    if child.is_loss_for(parent_is_maximizer) {
        score - bonus
    } else if child.is_win_for(parent_is_maximizer) {
        score + bonus
    } else {
        score
    }
}

/// Pick the child to descend into.
///
/// Returns `None` only when the node has no children. Ties keep the
/// earliest child.
#[must_use]
pub fn select_child(
    tree: &MCTSTree,
    node_id: NodeId,
    policy: &dyn SelectionPolicy,
    config: &MCTSConfig,
) -> Option<NodeId> {
    let node = tree.get(node_id);
    let is_max = node.is_maximizer();
    let parent_visits = node.stats.visits;

    let mut best: Option<(NodeId, f64)> = None;
    for &child_id in &node.children {
        let child = tree.get(child_id);
        let raw = policy.score(&child.stats, parent_visits, is_max, config);
        let score = proven_modifier(raw, child.solve, is_max, config.proven_bonus);
        if best.map_or(true, |(_, s)| score > s) {
            best = Some((child_id, score));
        }
    }
    best.map(|(id, _)| id)
}

// =============================================================================
// Decision
// =============================================================================

/// Score of a root child for the final decision.
///
/// Proven wins get `decision_boost` on top of their visits; every other
/// child scores its visits.
#[must_use]
pub fn decision_score(child: &MCTSNode, config: &MCTSConfig) -> f64 {
    let visits = child.stats.visits as f64;
    if child.is_win() {
        config.decision_boost + visits
    } else {
        visits
    }
}

/// Proof tier of a root child: proven wins first, proven losses last.
fn proof_tier(child: &MCTSNode) -> u8 {
    match child.solve {
        SolveState::ProvenWin => 2,
        SolveState::Unknown => 1,
        SolveState::ProvenLoss => 0,
    }
}

/// Order two root children for the final decision.
///
/// Among proven wins the shorter win is better; among proven losses the
/// longer one is. Remaining ties go to decision score, then value estimate.
#[must_use]
pub fn decision_order(a: &MCTSNode, b: &MCTSNode, config: &MCTSConfig) -> Ordering {
    let steps = match a.solve {
        SolveState::ProvenWin => b.steps.cmp(&a.steps),
        SolveState::ProvenLoss => a.steps.cmp(&b.steps),
        SolveState::Unknown => Ordering::Equal,
    };
    proof_tier(a)
        .cmp(&proof_tier(b))
        .then(steps)
        .then_with(|| {
            decision_score(a, config)
                .partial_cmp(&decision_score(b, config))
                .unwrap_or(Ordering::Equal)
        })
        .then_with(|| {
            a.stats
                .value(true)
                .partial_cmp(&b.stats.value(true))
                .unwrap_or(Ordering::Equal)
        })
}

/// Choose the decision among the root's children.
///
/// Full ties keep the earlier choice.
#[must_use]
pub fn best_decision(tree: &MCTSTree, root: NodeId, config: &MCTSConfig) -> Option<NodeId> {
    let mut best: Option<NodeId> = None;
    for &child_id in &tree.get(root).children {
        let better = best.map_or(true, |b| {
            decision_order(tree.get(child_id), tree.get(b), config) == Ordering::Greater
        });
        if better {
            best = Some(child_id);
        }
    }
    best
}

// =============================================================================
// Simulation Policy
// =============================================================================

/// Outcome of one playout.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Playout {
    /// Winner if the game finished with one.
    pub winner: Option<PlayerId>,
    /// The game reached a terminal state.
    pub finished: bool,
    /// Actions executed during the playout.
    pub actions: u64,
}

/// Policy for running playouts from a leaf state.
pub trait SimulationPolicy<A: StateAdapter>: Send + Sync {
    /// Play from `state` until terminal or `max_actions` actions.
    ///
    /// The state is modified during simulation.
    fn simulate(
        &self,
        adapter: &A,
        state: &mut A::State,
        rng: &mut GameRng,
        max_actions: u64,
    ) -> Result<Playout, SearchError>;
}

/// Random playout policy.
///
/// Picks uniformly among the cheap simulation-mode choices.
#[derive(Clone, Debug, Default)]
pub struct RandomPlayout;

impl<A: StateAdapter> SimulationPolicy<A> for RandomPlayout {
    fn simulate(
        &self,
        adapter: &A,
        state: &mut A::State,
        rng: &mut GameRng,
        max_actions: u64,
    ) -> Result<Playout, SearchError> {
        let start = adapter.action_count(state);

        while !adapter.is_terminal(state) && adapter.action_count(state) - start < max_actions {
            if !adapter.has_pending_decision(state) {
                adapter.step(state);
                continue;
            }

            let choices = adapter.legal_choices(state, ChoiceMode::Simulation);
            let choice = rng.choose(&choices).ok_or(SearchError::NoLegalChoices {
                action_count: adapter.action_count(state),
            })?;
            adapter.apply(state, choice);
        }

        let finished = adapter.is_terminal(state);
        Ok(Playout {
            winner: if finished { adapter.winner(state) } else { None },
            finished,
            actions: adapter.action_count(state) - start,
        })
    }
}

/// Convert a playout into a reward in [0, 1] for `agent`.
///
/// Unfinished playouts and draws score 0.5. Decided games score 1 or 0,
/// shaded toward 0.5 in proportion to the playout length: a quick loss is
/// worse than a slow one, a quick win better than a slow one.
#[must_use]
pub fn shaped_reward(playout: &Playout, agent: PlayerId, max_actions: u64) -> f64 {
    let shade = if max_actions == 0 {
        0.0
    } else {
        (playout.actions as f64 / (2.0 * max_actions as f64)).min(0.5)
    };
    match playout.winner {
        Some(winner) if playout.finished && winner == agent => 1.0 - shade,
        Some(_) if playout.finished => shade,
        _ => 0.5,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ChoiceDescriptor;
    use crate::mcts::node::NodeDetails;
    use proptest::prelude::*;

    fn stats(visits: u32, sum: f64) -> NodeStats {
        NodeStats {
            visits,
            sum,
            ..NodeStats::default()
        }
    }

    /// Root owned by `is_maximizer` with children (visits, sum).
    fn make_tree(is_maximizer: bool, children: &[(u32, f64)]) -> (MCTSTree, NodeId) {
        let mut tree = MCTSTree::new();
        let root = tree.alloc(MCTSNode::root());
        tree.get_mut(root).details = Some(NodeDetails {
            is_maximizer,
            choices: (0..children.len() as u64).map(ChoiceDescriptor).collect(),
        });
        let mut total = 0;
        for (i, &(visits, sum)) in children.iter().enumerate() {
            let child = tree.add_child(root, ChoiceDescriptor(i as u64));
            tree.get_mut(child).stats = stats(visits, sum);
            total += visits;
        }
        tree.get_mut(root).stats.visits = total;
        (tree, root)
    }

    #[test]
    fn test_ucb1_unvisited_is_infinite() {
        let config = MCTSConfig::default();
        assert_eq!(UCB1.score(&stats(0, 0.0), 10, true, &config), f64::INFINITY);
    }

    #[test]
    fn test_ucb1_formula() {
        let config = MCTSConfig::default();
        let s = UCB1.score(&stats(10, 7.0), 100, true, &config);
        let expected = 0.7 + std::f64::consts::SQRT_2 * ((100f64).ln() / 10.0).sqrt();
        assert!((s - expected).abs() < 1e-12);

        // Opponent's view of the same child
        let s = UCB1.score(&stats(10, 7.0), 100, false, &config);
        let expected = 0.3 + std::f64::consts::SQRT_2 * ((100f64).ln() / 10.0).sqrt();
        assert!((s - expected).abs() < 1e-12);
    }

    #[test]
    fn test_ratio_formula() {
        let config = MCTSConfig::default();
        let s = Ratio.score(&stats(8, 6.0), 20, true, &config);
        assert!((s - 7.0 / 10.0).abs() < 1e-12);
        assert!((Ratio.score(&stats(0, 0.0), 0, true, &config) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_proven_modifier() {
        assert_eq!(proven_modifier(1.0, SolveState::ProvenLoss, true, 2.0), -1.0);
        assert_eq!(proven_modifier(1.0, SolveState::ProvenWin, false, 2.0), -1.0);
        assert_eq!(proven_modifier(1.0, SolveState::ProvenWin, true, 2.0), 3.0);
        assert_eq!(proven_modifier(1.0, SolveState::ProvenLoss, false, 2.0), 3.0);
        assert_eq!(proven_modifier(1.0, SolveState::Unknown, true, 2.0), 1.0);
    }

    #[test]
    fn test_select_prefers_value_for_maximizer() {
        let config = MCTSConfig::default();
        let (tree, root) = make_tree(true, &[(50, 10.0), (50, 40.0)]);
        let chosen = select_child(&tree, root, &UCB1, &config).unwrap();
        assert_eq!(tree.get(chosen).choice_index, 1);
    }

    #[test]
    fn test_select_prefers_low_value_for_opponent() {
        let config = MCTSConfig::default();
        let (tree, root) = make_tree(false, &[(50, 10.0), (50, 40.0)]);
        let chosen = select_child(&tree, root, &UCB1, &config).unwrap();
        assert_eq!(tree.get(chosen).choice_index, 0);
    }

    #[test]
    fn test_select_avoids_proven_loss() {
        let config = MCTSConfig::default();
        let (mut tree, root) = make_tree(true, &[(50, 45.0), (50, 20.0)]);
        let first = tree.get(root).children[0];
        tree.get_mut(first).set_loss(0);

        let chosen = select_child(&tree, root, &UCB1, &config).unwrap();
        assert_eq!(tree.get(chosen).choice_index, 1);
    }

    #[test]
    fn test_select_on_leaf_is_none() {
        let config = MCTSConfig::default();
        let (tree, root) = make_tree(true, &[]);
        assert!(select_child(&tree, root, &UCB1, &config).is_none());
    }

    #[test]
    fn test_decision_prefers_proven_win() {
        let config = MCTSConfig::default();
        let (mut tree, root) = make_tree(true, &[(5000, 4000.0), (3, 3.0), (900, 800.0)]);
        let win = tree.get(root).children[1];
        tree.get_mut(win).set_win(1);

        assert_eq!(best_decision(&tree, root, &config), Some(win));
    }

    #[test]
    fn test_decision_prefers_shorter_win() {
        let config = MCTSConfig::default();
        let (mut tree, root) = make_tree(true, &[(100, 90.0), (10, 9.0)]);
        let slow = tree.get(root).children[0];
        let fast = tree.get(root).children[1];
        tree.get_mut(slow).set_win(9);
        tree.get_mut(fast).set_win(1);

        assert_eq!(best_decision(&tree, root, &config), Some(fast));
    }

    #[test]
    fn test_decision_prefers_longer_loss() {
        let config = MCTSConfig::default();
        let (mut tree, root) = make_tree(true, &[(100, 5.0), (10, 1.0), (40, 2.0)]);
        let children = tree.get(root).children.clone();
        tree.get_mut(children[0]).set_loss(1);
        tree.get_mut(children[1]).set_loss(7);
        tree.get_mut(children[2]).set_loss(3);

        assert_eq!(best_decision(&tree, root, &config), Some(children[1]));
    }

    #[test]
    fn test_decision_avoids_proven_loss() {
        let config = MCTSConfig::default();
        let (mut tree, root) = make_tree(true, &[(500, 50.0), (20, 8.0)]);
        let lost = tree.get(root).children[0];
        tree.get_mut(lost).set_loss(4);

        let chosen = best_decision(&tree, root, &config).unwrap();
        assert_eq!(tree.get(chosen).choice_index, 1);
    }

    #[test]
    fn test_decision_by_visits_then_value() {
        let config = MCTSConfig::default();
        let (tree, root) = make_tree(true, &[(10, 2.0), (30, 9.0), (30, 12.0)]);
        let chosen = best_decision(&tree, root, &config).unwrap();
        assert_eq!(tree.get(chosen).choice_index, 2);
    }

    #[test]
    fn test_shaped_reward() {
        let agent = PlayerId::new(0);
        let unfinished = Playout { winner: None, finished: false, actions: 10_000 };
        assert_eq!(shaped_reward(&unfinished, agent, 10_000), 0.5);

        let quick_win = Playout { winner: Some(agent), finished: true, actions: 0 };
        assert_eq!(shaped_reward(&quick_win, agent, 10_000), 1.0);

        let slow_loss = Playout { winner: Some(agent.opponent()), finished: true, actions: 5_000 };
        assert!((shaped_reward(&slow_loss, agent, 10_000) - 0.25).abs() < 1e-12);

        let draw = Playout { winner: None, finished: true, actions: 3 };
        assert_eq!(shaped_reward(&draw, agent, 10_000), 0.5);
    }

    proptest! {
        #[test]
        fn shaped_reward_stays_in_unit_interval(
            actions in 0u64..50_000,
            ceiling in 0u64..20_000,
            winner in proptest::option::of(0u8..2),
            finished in any::<bool>(),
        ) {
            let playout = Playout { winner: winner.map(PlayerId::new), finished, actions };
            let r = shaped_reward(&playout, PlayerId::new(0), ceiling);
            prop_assert!((0.0..=1.0).contains(&r));
        }

        #[test]
        fn ucb1_scores_are_ordered_by_value(
            visits in 1u32..1000,
            low in 0.0f64..0.5,
            gap in 0.0f64..0.5,
        ) {
            let config = MCTSConfig::default();
            let a = stats(visits, low * visits as f64);
            let b = stats(visits, (low + gap) * visits as f64);
            prop_assert!(UCB1.score(&a, visits * 2, true, &config) <= UCB1.score(&b, visits * 2, true, &config) + 1e-9);
        }
    }
}
