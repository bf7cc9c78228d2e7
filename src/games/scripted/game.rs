//! Scripted game implementation.

use rustc_hash::FxHashMap;

use crate::core::{ChoiceMode, GameRng, PlayerId, Visibility};
use crate::rules::StateAdapter;

/// Index of a position in a scripted game.
pub type Position = usize;

/// Choice token: the label of a move at the current position.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ScriptedMove(pub u32);

#[derive(Clone, Debug)]
enum Node {
    Decision {
        owner: PlayerId,
        moves: Vec<(ScriptedMove, Position)>,
    },
    Forced {
        next: Position,
    },
    End {
        winner: Option<PlayerId>,
    },
}

/// Position in a scripted game plus the number of actions taken.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ScriptedState {
    position: Position,
    actions: u64,
}

impl ScriptedState {
    pub fn position(&self) -> Position {
        self.position
    }
}

/// An explicit game graph.
#[derive(Clone, Debug)]
pub struct ScriptedGame {
    nodes: Vec<Node>,
    /// Fingerprint overrides; other positions hash to their index.
    fingerprints: FxHashMap<Position, u64>,
}

/// Builder for creating a ScriptedGame.
///
/// Positions are added bottom-up: a decision can only point at positions
/// that already exist.
///
/// ```
/// use duel_mcts::core::PlayerId;
/// use duel_mcts::games::scripted::ScriptedGameBuilder;
///
/// let mut builder = ScriptedGameBuilder::new();
/// let win = builder.end(Some(PlayerId::new(0)));
/// let loss = builder.end(Some(PlayerId::new(1)));
/// let root = builder.decision(PlayerId::new(0), &[loss, win]);
/// let (game, state) = builder.build(root);
/// assert_eq!(state.position(), root);
/// assert_eq!(game.len(), 3);
/// ```
#[derive(Debug, Default)]
pub struct ScriptedGameBuilder {
    nodes: Vec<Node>,
    fingerprints: FxHashMap<Position, u64>,
}

impl ScriptedGameBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, node: Node) -> Position {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    /// Add a decision for `owner`; move `i` leads to `targets[i]`.
    pub fn decision(&mut self, owner: PlayerId, targets: &[Position]) -> Position {
        let moves = targets
            .iter()
            .enumerate()
            .map(|(i, &target)| (ScriptedMove(i as u32), target))
            .collect();
        self.push(Node::Decision { owner, moves })
    }

    /// Add a decision with explicit move labels.
    pub fn labeled(&mut self, owner: PlayerId, moves: &[(u32, Position)]) -> Position {
        let moves = moves
            .iter()
            .map(|&(label, target)| (ScriptedMove(label), target))
            .collect();
        self.push(Node::Decision { owner, moves })
    }

    /// Add a position that advances to `next` without a decision.
    pub fn forced(&mut self, next: Position) -> Position {
        self.push(Node::Forced { next })
    }

    /// Add an end state (`None` for a draw).
    pub fn end(&mut self, winner: Option<PlayerId>) -> Position {
        self.push(Node::End { winner })
    }

    /// Give `position` an explicit fingerprint.
    pub fn fingerprint(&mut self, position: Position, fingerprint: u64) -> &mut Self {
        self.fingerprints.insert(position, fingerprint);
        self
    }

    fn random_subtree(&mut self, rng: &mut GameRng, depth: u32, branching: usize, owner: PlayerId) -> Position {
        if depth == 0 {
            let winner = match rng.gen_range_usize(0..3) {
                0 => Some(PlayerId::new(0)),
                1 => Some(PlayerId::new(1)),
                _ => None,
            };
            return self.end(winner);
        }

        let children: Vec<Position> = (0..branching)
            .map(|_| self.random_subtree(rng, depth - 1, branching, owner.opponent()))
            .collect();
        let decision = self.decision(owner, &children);
        if rng.gen_bool(0.25) {
            self.forced(decision)
        } else {
            decision
        }
    }

    /// Build the game, starting at `start`.
    pub fn build(self, start: Position) -> (ScriptedGame, ScriptedState) {
        let game = ScriptedGame {
            nodes: self.nodes,
            fingerprints: self.fingerprints,
        };
        let state = game.state_at(start);
        (game, state)
    }
}

impl ScriptedGame {
    /// Random uniform tree: `depth` alternating decisions starting with
    /// player 0, `branching` moves each, random outcomes at the leaves.
    pub fn random(depth: u32, branching: usize, seed: u64) -> (ScriptedGame, ScriptedState) {
        let mut rng = GameRng::new(seed);
        let mut builder = ScriptedGameBuilder::new();
        let root = builder.random_subtree(&mut rng, depth, branching, PlayerId::new(0));
        builder.build(root)
    }

    /// A fresh state at `position`.
    pub fn state_at(&self, position: Position) -> ScriptedState {
        debug_assert!(position < self.nodes.len(), "unknown position {}", position);
        ScriptedState { position, actions: 0 }
    }

    /// Number of positions.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn node(&self, state: &ScriptedState) -> &Node {
        &self.nodes[state.position]
    }
}

impl StateAdapter for ScriptedGame {
    type State = ScriptedState;
    type Choice = ScriptedMove;

    fn clone_state(&self, state: &ScriptedState, _visibility: Visibility, _rng: &mut GameRng) -> ScriptedState {
        // Nothing is hidden.
        state.clone()
    }

    fn is_terminal(&self, state: &ScriptedState) -> bool {
        matches!(self.node(state), Node::End { .. })
    }

    fn winner(&self, state: &ScriptedState) -> Option<PlayerId> {
        match self.node(state) {
            Node::End { winner } => *winner,
            _ => None,
        }
    }

    fn has_pending_decision(&self, state: &ScriptedState) -> bool {
        matches!(self.node(state), Node::Decision { .. })
    }

    fn next_decision_owner(&self, state: &ScriptedState) -> PlayerId {
        match self.node(state) {
            Node::Decision { owner, .. } => *owner,
            _ => PlayerId::new(0),
        }
    }

    fn legal_choices(&self, state: &ScriptedState, _mode: ChoiceMode) -> Vec<ScriptedMove> {
        match self.node(state) {
            Node::Decision { moves, .. } => moves.iter().map(|&(m, _)| m).collect(),
            _ => vec![],
        }
    }

    fn apply(&self, state: &mut ScriptedState, choice: &ScriptedMove) {
        if let Node::Decision { moves, .. } = self.node(state) {
            if let Some(&(_, target)) = moves.iter().find(|(m, _)| m == choice) {
                state.position = target;
                state.actions += 1;
            }
        }
    }

    fn step(&self, state: &mut ScriptedState) {
        if let Node::Forced { next } = self.node(state) {
            state.position = *next;
            state.actions += 1;
        }
    }

    fn fingerprint(&self, state: &ScriptedState) -> u64 {
        self.fingerprints
            .get(&state.position)
            .copied()
            .unwrap_or(state.position as u64)
    }

    fn action_count(&self, state: &ScriptedState) -> u64 {
        state.actions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const P0: PlayerId = PlayerId::new(0);
    const P1: PlayerId = PlayerId::new(1);

    fn two_step() -> (ScriptedGame, ScriptedState, Position, Position) {
        let mut b = ScriptedGameBuilder::new();
        let win = b.end(Some(P0));
        let draw = b.end(None);
        let forced = b.forced(win);
        let root = b.decision(P0, &[draw, forced]);
        let (game, state) = b.build(root);
        (game, state, win, draw)
    }

    #[test]
    fn test_decision_hooks() {
        let (game, state, _, _) = two_step();

        assert!(game.has_pending_decision(&state));
        assert!(!game.is_terminal(&state));
        assert_eq!(game.next_decision_owner(&state), P0);
        assert_eq!(
            game.legal_choices(&state, ChoiceMode::Exact),
            vec![ScriptedMove(0), ScriptedMove(1)]
        );
    }

    #[test]
    fn test_apply_and_step() {
        let (game, mut state, win, _) = two_step();

        game.apply(&mut state, &ScriptedMove(1));
        assert!(!game.has_pending_decision(&state));
        assert!(!game.is_terminal(&state));
        assert_eq!(game.action_count(&state), 1);

        game.step(&mut state);
        assert_eq!(state.position(), win);
        assert!(game.is_terminal(&state));
        assert_eq!(game.winner(&state), Some(P0));
        assert_eq!(game.action_count(&state), 2);
    }

    #[test]
    fn test_draw_has_no_winner() {
        let (game, mut state, _, draw) = two_step();
        game.apply(&mut state, &ScriptedMove(0));

        assert_eq!(state.position(), draw);
        assert!(game.is_terminal(&state));
        assert_eq!(game.winner(&state), None);
    }

    #[test]
    fn test_unknown_move_is_ignored() {
        let (game, mut state, _, _) = two_step();
        let before = state.clone();
        game.apply(&mut state, &ScriptedMove(7));
        assert_eq!(state, before);
    }

    #[test]
    fn test_labeled_moves() {
        let mut b = ScriptedGameBuilder::new();
        let end = b.end(Some(P1));
        let root = b.labeled(P1, &[(10, end), (20, end)]);
        let (game, state) = b.build(root);

        assert_eq!(
            game.legal_choices(&state, ChoiceMode::Simulation),
            vec![ScriptedMove(10), ScriptedMove(20)]
        );
        assert_eq!(game.next_decision_owner(&state), P1);
    }

    #[test]
    fn test_fingerprint_override() {
        let mut b = ScriptedGameBuilder::new();
        let a = b.end(None);
        let c = b.end(None);
        b.fingerprint(c, 0xABCD);
        let (game, _) = b.build(a);

        assert_eq!(game.fingerprint(&game.state_at(a)), a as u64);
        assert_eq!(game.fingerprint(&game.state_at(c)), 0xABCD);
    }

    #[test]
    fn test_random_tree_is_deterministic() {
        let (g1, s1) = ScriptedGame::random(3, 3, 7);
        let (g2, s2) = ScriptedGame::random(3, 3, 7);

        assert_eq!(g1.len(), g2.len());
        assert_eq!(s1, s2);
        // 27 leaves, 13 decisions, plus any forced wrappers
        assert!(g1.len() >= 40);
    }

    #[test]
    fn test_random_tree_alternates_owners() {
        let (game, mut state) = ScriptedGame::random(2, 2, 3);
        while !game.has_pending_decision(&state) {
            game.step(&mut state);
        }
        assert_eq!(game.next_decision_owner(&state), P0);

        game.apply(&mut state, &ScriptedMove(0));
        while !game.has_pending_decision(&state) {
            game.step(&mut state);
        }
        assert_eq!(game.next_decision_owner(&state), P1);
    }
}
