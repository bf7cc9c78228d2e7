//! Card duel: a two-player game with hidden hands.
//!
//! - Each side starts with some life, a shuffled library and an opening hand
//! - A turn is Draw, then Main (play one card or pass), then End
//! - Strikes damage the opponent, mends restore the player's own life
//! - Drawing from an empty library deals increasing fatigue damage
//! - A side at 0 life loses; both at 0 is a draw, as is the turn limit
//!
//! Each side's hand and library order are hidden from the other side, so
//! the search either reads them (`Visibility::Revealed`) or redeals them.

mod game;

pub use game::{Card, DuelChoice, DuelGame, DuelGameBuilder, DuelState, Phase, Side};
