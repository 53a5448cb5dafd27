//! A game tree search agent for the connection game 'Hex'
//!
//! The agent builds a tree of future boards to a fixed depth, scores the
//! leaves with a heuristic and backs the scores up with minimax, optionally
//! pruning branches with alpha-beta. Any two-player board that implements
//! [`GameState`] can be searched, [`HexBoard`] is the one shipped here.
//!
//! # Basic Usage
//!
//! ```
//! use hex_ai::{choose_move, hexboard::{HexBoard, HexMove}, Player};
//!
//!# use std::error::Error;
//!# fn main() -> Result<(), Box<dyn Error>> {
//! // player one only needs c3 to join the top and bottom edges
//! let board = HexBoard::from_moves(3, "c1 b3 c2 a1")?;
//! let best_move = choose_move(&board, Player::One, 2, true)?;
//!
//! assert_eq!(best_move, HexMove::parse("c3")?);
//!# Ok(())
//!# }
//! ```

use static_assertions::*;
pub use anyhow;

pub mod error;

pub mod game;

pub mod config;

pub mod node;

pub mod transposition_table;

pub mod tree;

pub mod hexboard;

pub mod solver;


pub use config::SearchConfig;
pub use error::{Result, SearchError};
pub use game::{GameState, Outcome, Player};
pub use hexboard::HexBoard;
pub use solver::{SearchReport, Solver};
pub use transposition_table::{SharedTranspositionSet, TranspositionSet};
pub use tree::SearchTree;

/// The default width and height of the game board in tiles
pub const DEFAULT_DIMENSION: usize = 11;

/// The largest supported board, columns are named with a single letter
pub const MAX_DIMENSION: usize = 26;

/// The deepest search the solver accepts
pub const MAX_SEARCH_DEPTH: usize = 64;

// moves store their coordinates in a u8
const_assert!(MAX_DIMENSION <= u8::MAX as usize);
const_assert!(DEFAULT_DIMENSION <= MAX_DIMENSION);

/// Picks a move for `player` by searching `depth_limit` plies from `state`.
///
/// Scores are expressed for `player` throughout the search, see
/// [`Solver`] for the details.
pub fn choose_move<G: GameState>(
    state: &G,
    player: Player,
    depth_limit: usize,
    use_pruning: bool,
) -> Result<G::Move> {
    let config = SearchConfig::default()
        .with_depth(depth_limit)
        .with_pruning(use_pruning);
    Solver::new(config).choose_move(state, player)
}
