//! Backpropagation: statistics backup and proof propagation.
//!
//! Two concerns are kept apart:
//! - `BackupPolicy` folds a simulation reward into a node's statistics
//!   (plain averaging, or averaging with a robust-max override)
//! - `propagate_solved` turns a child's proven outcome into knowledge about
//!   its parent, the AND/OR rule of proof-number search

use super::node::{MCTSNode, NodeId, NodeStats, SolveState};
use super::tree::MCTSTree;

/// Policy for folding one simulation result into a node.
pub trait BackupPolicy: Send + Sync {
    /// Update `node` with `reward`.
    ///
    /// `child` holds the already-updated statistics of the next node on the
    /// simulated path, or `None` at the leaf.
    fn backup(&self, node: &mut NodeStats, is_maximizer: bool, child: Option<&NodeStats>, reward: f64);
}

/// Plain averaging backup.
#[derive(Clone, Debug, Default)]
pub struct Averaging;

impl BackupPolicy for Averaging {
    fn backup(&self, node: &mut NodeStats, _is_maximizer: bool, _child: Option<&NodeStats>, reward: f64) {
        node.record(reward);
    }
}

/// Averaging with a robust-max override.
///
/// Once a child's visit count passes both `min_visits` and the largest count
/// seen so far among this node's children, and that child's raw average is
/// better for this node's acting side, the node's sum is reset to
/// `child_average * visits`.
#[derive(Clone, Debug)]
pub struct RobustMax {
    pub min_visits: u32,
}

impl RobustMax {
    #[must_use]
    pub fn new(min_visits: u32) -> Self {
        Self { min_visits }
    }
}

impl Default for RobustMax {
    fn default() -> Self {
        Self::new(100)
    }
}

impl BackupPolicy for RobustMax {
    fn backup(&self, node: &mut NodeStats, is_maximizer: bool, child: Option<&NodeStats>, reward: f64) {
        node.record(reward);

        let Some(child) = child else {
            return;
        };
        if child.visits <= node.max_child_visits.max(self.min_visits) {
            return;
        }
        node.max_child_visits = child.visits;

        let child_avg = child.mean();
        let avg = node.mean();
        let better = if is_maximizer { child_avg > avg } else { child_avg < avg };
        if better {
            // Deviations are now measured from the child's average.
            let n = node.visits as f64;
            node.m2 += n * (avg - child_avg) * (avg - child_avg);
            node.sum = child_avg * n;
        }
    }
}

/// Fold a child's proven outcome into its parent.
///
/// `newly_solved` is true when the child became solved during the current
/// backpropagation pass; only then does a losing child count toward
/// exhaustion, so each child is counted once. Returns true when the parent
/// becomes solved by this call.
pub fn propagate_solved(
    parent: &mut MCTSNode,
    child_solve: SolveState,
    child_steps: u32,
    newly_solved: bool,
) -> bool {
    if !child_solve.is_solved() {
        return false;
    }
    let steps = child_steps + 1;
    let is_max = parent.is_maximizer();

    if parent.is_solved() {
        // A second winning line may be shorter than the one that proved it.
        if child_solve.is_win_for(is_max) && child_solve == parent.solve && steps < parent.steps {
            parent.steps = steps;
        }
        return false;
    }

    if child_solve.is_win_for(is_max) {
        if is_max {
            parent.set_win(steps);
        } else {
            parent.set_loss(steps);
        }
        return true;
    }

    if !newly_solved {
        return false;
    }
    parent.lose_count += 1;
    parent.steps = parent.steps.max(steps);
    if parent.max_children() == Some(parent.lose_count as usize) {
        let steps = parent.steps;
        if is_max {
            parent.set_loss(steps);
        } else {
            parent.set_win(steps);
        }
        return true;
    }
    false
}

/// Proof of a node recomputed from its children: solve state, steps and
/// the number of children proven losing for its side.
fn resolve_from_children(tree: &MCTSTree, id: NodeId) -> (SolveState, u32, u32) {
    let node = tree.get(id);
    let is_max = node.is_maximizer();
    let mut win_steps: Option<u32> = None;
    let mut losses = 0;
    let mut loss_steps = 0;

    for &child_id in &node.children {
        let child = tree.get(child_id);
        if child.solve.is_win_for(is_max) {
            let steps = child.steps + 1;
            win_steps = Some(win_steps.map_or(steps, |w| w.min(steps)));
        } else if child.solve.is_loss_for(is_max) {
            losses += 1;
            loss_steps = loss_steps.max(child.steps + 1);
        }
    }

    let (win, loss) = if is_max {
        (SolveState::ProvenWin, SolveState::ProvenLoss)
    } else {
        (SolveState::ProvenLoss, SolveState::ProvenWin)
    };
    match win_steps {
        Some(steps) => (win, steps, losses),
        None if node.max_children() == Some(losses as usize) => (loss, loss_steps, losses),
        None => (SolveState::Unknown, loss_steps, losses),
    }
}

/// Re-derive proofs above a node whose own proof was just withdrawn.
///
/// `path` runs from the root to that node. Each ancestor is recomputed from
/// its children, so a proof that rested on the withdrawn one is reopened
/// and its contribution to the exhaustion count above is taken back. The
/// walk stops at the first ancestor whose proof is unchanged.
pub fn retract_solved(tree: &mut MCTSTree, path: &[NodeId]) {
    for &id in path.iter().rev().skip(1) {
        let (solve, steps, lose_count) = resolve_from_children(tree, id);
        let node = tree.get_mut(id);
        let unchanged = node.solve == solve && (!solve.is_solved() || node.steps == steps);

        node.solve = solve;
        node.steps = steps;
        node.lose_count = lose_count;
        if unchanged {
            break;
        }
    }
}

/// Unwind one simulated path, leaf last in `path`.
///
/// Every node on the path records `reward`; proofs climb as far as they
/// resolve parents.
pub fn backpropagate(
    tree: &mut MCTSTree,
    path: &[NodeId],
    reward: f64,
    leaf_newly_solved: bool,
    policy: &dyn BackupPolicy,
) {
    let mut child: Option<NodeId> = None;
    let mut newly_solved = leaf_newly_solved;

    for &id in path.iter().rev() {
        let child_view = child.map(|c| {
            let c = tree.get(c);
            (c.stats, c.solve, c.steps)
        });

        let node = tree.get_mut(id);
        let is_max = node.is_maximizer();
        policy.backup(&mut node.stats, is_max, child_view.as_ref().map(|(s, _, _)| s), reward);

        if let Some((_, solve, steps)) = child_view {
            newly_solved = propagate_solved(node, solve, steps, newly_solved);
        }
        child = Some(id);
    }
}
