//! Card duel implementation.

use std::hash::{Hash, Hasher};

use im::Vector;
use rustc_hash::FxHasher;

use crate::core::{ChoiceMode, GameRng, PlayerId, PlayerMap, Visibility};
use crate::rules::StateAdapter;

/// A card. Hands are kept sorted by this ordering.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Card {
    /// Deal this much damage to the opponent.
    Strike(u8),
    /// Restore this much of the player's own life.
    Mend(u8),
}

/// Choice token for the Main phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DuelChoice {
    Play(Card),
    Pass,
}

/// Turn phases. Only `Main` asks for a decision.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Phase {
    Draw,
    Main,
    End,
}

/// One side's cards and life.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Side {
    pub life: i32,
    /// Sorted.
    pub hand: Vector<Card>,
    /// Top card first.
    pub library: Vector<Card>,
    /// Damage dealt by the next draw from an empty library, minus one.
    pub fatigue: u8,
}

/// Duel state. Cloning is O(1) thanks to persistent vectors.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DuelState {
    pub sides: PlayerMap<Side>,
    pub active: PlayerId,
    pub phase: Phase,
    pub turn: u32,
    actions: u64,
}

/// Duel rules.
#[derive(Clone, Debug)]
pub struct DuelGame {
    starting_life: i32,
    max_turns: u32,
}

/// Builder for creating a DuelGame.
pub struct DuelGameBuilder {
    starting_life: i32,
    hand_size: usize,
    deck: Vec<Card>,
    max_turns: u32,
}

impl Default for DuelGameBuilder {
    fn default() -> Self {
        let deck = [
            Card::Strike(1),
            Card::Strike(2),
            Card::Strike(3),
            Card::Strike(4),
            Card::Mend(2),
        ];
        Self {
            starting_life: 10,
            hand_size: 3,
            deck: deck.iter().chain(deck.iter()).copied().collect(),
            max_turns: 60,
        }
    }
}

impl DuelGameBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_life(mut self, life: i32) -> Self {
        self.starting_life = life;
        self
    }

    pub fn hand_size(mut self, size: usize) -> Self {
        self.hand_size = size;
        self
    }

    /// Cards each side's library is built from.
    pub fn deck(mut self, deck: Vec<Card>) -> Self {
        self.deck = deck;
        self
    }

    /// Turns played before the game ends in a draw.
    pub fn max_turns(mut self, turns: u32) -> Self {
        self.max_turns = turns;
        self
    }

    /// Build the game and the initial state (player 0 to draw).
    pub fn build(self, seed: u64) -> (DuelGame, DuelState) {
        let mut rng = GameRng::new(seed);

        let sides = PlayerMap::new(|_| {
            let mut cards = self.deck.clone();
            rng.shuffle(&mut cards);
            let split = self.hand_size.min(cards.len());
            let mut hand = Vector::new();
            for &card in &cards[..split] {
                hand.insert_ord(card);
            }
            Side {
                life: self.starting_life,
                hand,
                library: cards[split..].iter().copied().collect(),
                fatigue: 0,
            }
        });

        let game = DuelGame {
            starting_life: self.starting_life,
            max_turns: self.max_turns,
        };
        let state = DuelState {
            sides,
            active: PlayerId::new(0),
            phase: Phase::Draw,
            turn: 1,
            actions: 0,
        };
        (game, state)
    }
}

impl DuelGame {
    /// Run forced steps until a decision is pending or the game is over.
    pub fn advance(&self, state: &mut DuelState) {
        while !self.is_terminal(state) && !self.has_pending_decision(state) {
            self.step(state);
        }
    }

    fn is_alive(state: &DuelState, player: PlayerId) -> bool {
        state.sides[player].life > 0
    }

    /// Redeal `player`'s hidden cards: hand and library are pooled and
    /// reshuffled, keeping the hand size.
    fn redeal(side: &mut Side, rng: &mut GameRng) {
        let mut pool: Vec<Card> = side.hand.iter().chain(side.library.iter()).copied().collect();
        rng.shuffle(&mut pool);

        let split = side.hand.len();
        let mut hand = Vector::new();
        for &card in &pool[..split] {
            hand.insert_ord(card);
        }
        side.hand = hand;
        side.library = pool[split..].iter().copied().collect();
    }
}

impl StateAdapter for DuelGame {
    type State = DuelState;
    type Choice = DuelChoice;

    fn clone_state(&self, state: &DuelState, visibility: Visibility, rng: &mut GameRng) -> DuelState {
        let mut copy = state.clone();
        if let Visibility::Sampled(viewer) = visibility {
            Self::redeal(&mut copy.sides[viewer.opponent()], rng);

            // The viewer knows their hand but not their library order
            let library = &mut copy.sides[viewer].library;
            let mut cards: Vec<Card> = library.iter().copied().collect();
            rng.shuffle(&mut cards);
            *library = cards.into_iter().collect();
        }
        copy
    }

    fn is_terminal(&self, state: &DuelState) -> bool {
        state.turn > self.max_turns || PlayerId::both().any(|p| !Self::is_alive(state, p))
    }

    fn winner(&self, state: &DuelState) -> Option<PlayerId> {
        let mut alive = PlayerId::both().filter(|&p| Self::is_alive(state, p));
        match (alive.next(), alive.next()) {
            (Some(winner), None) => Some(winner),
            _ => None,
        }
    }

    fn has_pending_decision(&self, state: &DuelState) -> bool {
        state.phase == Phase::Main && !self.is_terminal(state)
    }

    fn next_decision_owner(&self, state: &DuelState) -> PlayerId {
        state.active
    }

    fn legal_choices(&self, state: &DuelState, mode: ChoiceMode) -> Vec<DuelChoice> {
        let mut choices = Vec::new();
        let mut last = None;
        for &card in state.sides[state.active].hand.iter() {
            if last != Some(card) {
                choices.push(DuelChoice::Play(card));
                last = Some(card);
            }
        }

        // Playouts never pass while a card can be played
        if mode == ChoiceMode::Exact || choices.is_empty() {
            choices.push(DuelChoice::Pass);
        }
        choices
    }

    fn apply(&self, state: &mut DuelState, choice: &DuelChoice) {
        let active = state.active;
        if let DuelChoice::Play(card) = *choice {
            let hand = &mut state.sides[active].hand;
            if let Some(i) = hand.index_of(&card) {
                hand.remove(i);
                match card {
                    Card::Strike(n) => state.sides[active.opponent()].life -= i32::from(n),
                    Card::Mend(n) => {
                        let side = &mut state.sides[active];
                        side.life = (side.life + i32::from(n)).min(self.starting_life);
                    }
                }
            }
        }
        state.phase = Phase::End;
        state.actions += 1;
    }

    fn step(&self, state: &mut DuelState) {
        match state.phase {
            Phase::Draw => {
                let side = &mut state.sides[state.active];
                match side.library.pop_front() {
                    Some(card) => side.hand.insert_ord(card),
                    None => {
                        side.fatigue = side.fatigue.saturating_add(1);
                        side.life -= i32::from(side.fatigue);
                    }
                }
                state.phase = Phase::Main;
            }
            Phase::Main => state.phase = Phase::End,
            Phase::End => {
                state.active = state.active.opponent();
                state.turn += 1;
                state.phase = Phase::Draw;
            }
        }
        state.actions += 1;
    }

    fn fingerprint(&self, state: &DuelState) -> u64 {
        let mut hasher = FxHasher::default();
        state.active.hash(&mut hasher);
        state.phase.hash(&mut hasher);
        state.turn.hash(&mut hasher);
        state.sides.hash(&mut hasher);
        hasher.finish()
    }

    fn action_count(&self, state: &DuelState) -> u64 {
        state.actions
    }
}
