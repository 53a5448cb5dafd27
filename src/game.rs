//! The contract a board must fulfil to be searched

use std::fmt::Debug;
use std::hash::Hash;

use crate::error::Result;

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Player {
    One,
    Two,
}

impl Player {
    pub fn opponent(self) -> Self {
        match self {
            Player::One => Player::Two,
            Player::Two => Player::One,
        }
    }
}

/// Result of a decisive-outcome check on a board
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Outcome {
    Undecided,
    PlayerOneWin,
    PlayerTwoWin,
}

impl Outcome {
    pub fn is_decided(self) -> bool {
        !matches!(self, Outcome::Undecided)
    }

    pub fn winner(self) -> Option<Player> {
        match self {
            Outcome::Undecided => None,
            Outcome::PlayerOneWin => Some(Player::One),
            Outcome::PlayerTwoWin => Some(Player::Two),
        }
    }
}

/// An immutable board snapshot that can be explored by the search tree.
///
/// The state value itself is the transposition key, so two move orders that
/// reach the same position must produce equal (and equally hashed) states.
pub trait GameState: Clone + Eq + Hash + Send + Sync {
    type Move: Clone + Debug + PartialEq + Send + Sync;

    /// All legal moves for `player`, always in the same order for the same board
    fn generate_moves(&self, player: Player) -> Vec<Self::Move>;

    /// Returns a new snapshot with `mv` played by `player`, leaving `self` untouched
    fn apply_move(&self, mv: &Self::Move, player: Player) -> Result<Self>;

    fn outcome(&self) -> Outcome;

    /// Size of the board, used to decide how deep the outcome check is trusted
    fn dimension(&self) -> usize;

    /// Heuristic score of the board, higher is better for `perspective`
    fn evaluate(&self, perspective: Player) -> f64;
}
