use anyhow::{anyhow, Result};

use std::fmt;

use crate::error::SearchError;
use crate::game::{GameState, Outcome, Player};
use crate::{DEFAULT_DIMENSION, MAX_DIMENSION};

/// Score of a decided board, larger than any span difference
pub const WIN_SCORE: f64 = 1000.0;

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Cell {
    PlayerOne,
    PlayerTwo,
    Empty,
}

impl Cell {
    fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }
}

impl From<Player> for Cell {
    fn from(player: Player) -> Self {
        match player {
            Player::One => Cell::PlayerOne,
            Player::Two => Cell::PlayerTwo,
        }
    }
}

/// A stone placement, written as a column letter and a 1-based row (`c3`)
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct HexMove {
    pub row: u8,
    pub col: u8,
}

impl HexMove {
    pub fn new(row: usize, col: usize) -> Self {
        Self {
            row: row as u8,
            col: col as u8,
        }
    }

    pub fn parse(text: &str) -> Result<Self> {
        let mut chars = text.chars();
        let col = match chars.next() {
            Some(letter @ 'a'..='z') => letter as u8 - b'a',
            Some(letter @ 'A'..='Z') => letter as u8 - b'A',
            _ => return Err(anyhow!("could not parse '{}' as a valid move", text)),
        };
        let row = chars
            .as_str()
            .parse::<usize>()
            .map_err(|_| anyhow!("could not parse '{}' as a valid move", text))?;
        if row == 0 || row > MAX_DIMENSION {
            return Err(anyhow!("Invalid move, row {} out of range", row));
        }
        Ok(Self::new(row - 1, col as usize))
    }
}

impl fmt::Display for HexMove {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", (b'a' + self.col) as char, self.row as usize + 1)
    }
}

/// A Hex board of `dimension` x `dimension` cells.
///
/// Player one joins the top and bottom edges, player two joins the left and
/// right edges. Cells are stored row by row, top to bottom.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct HexBoard {
    dimension: usize,
    cells: Vec<Cell>,
}

impl HexBoard {
    pub fn new(dimension: usize) -> Result<Self> {
        if dimension == 0 || dimension > MAX_DIMENSION {
            return Err(anyhow!(
                "Invalid board size {}, must be between 1 and {}",
                dimension,
                MAX_DIMENSION
            ));
        }
        Ok(Self {
            dimension,
            cells: vec![Cell::Empty; dimension * dimension],
        })
    }

    /// Builds a board from alternating moves, player one first (`"a1 b2 c3"`)
    pub fn from_moves<S: AsRef<str>>(dimension: usize, moves: S) -> Result<Self> {
        let mut board = Self::new(dimension)?;
        let mut player = Player::One;

        for token in moves
            .as_ref()
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|t| !t.is_empty())
        {
            if board.outcome().is_decided() {
                return Err(anyhow!("Invalid position, game is over"));
            }
            let hex_move = HexMove::parse(token)?;
            board = board.apply_move(&hex_move, player)?;
            player = player.opponent();
        }
        Ok(board)
    }

    pub fn cell(&self, row: usize, col: usize) -> Cell {
        self.cells[row * self.dimension + col]
    }

    pub fn num_stones(&self) -> usize {
        self.cells.iter().filter(|c| !c.is_empty()).count()
    }

    /// The player whose turn it is, assuming player one moved first
    pub fn side_to_move(&self) -> Player {
        let ones = self.cells.iter().filter(|&&c| c == Cell::PlayerOne).count();
        let twos = self.cells.iter().filter(|&&c| c == Cell::PlayerTwo).count();
        if ones > twos {
            Player::Two
        } else {
            Player::One
        }
    }

    fn neighbours(&self, index: usize) -> impl Iterator<Item = usize> + '_ {
        let n = self.dimension as isize;
        let (row, col) = ((index / self.dimension) as isize, (index % self.dimension) as isize);
        [(-1, 0), (-1, 1), (0, -1), (0, 1), (1, -1), (1, 0)]
            .into_iter()
            .map(move |(dr, dc)| (row + dr, col + dc))
            .filter(move |&(r, c)| r >= 0 && r < n && c >= 0 && c < n)
            .map(move |(r, c)| (r * n + c) as usize)
    }

    /// Widest extent of any connected group of `player` along their own axis.
    /// A span equal to the dimension means the player has connected their edges.
    fn longest_span(&self, player: Player) -> usize {
        let stone = Cell::from(player);
        let axis = |index: usize| match player {
            Player::One => index / self.dimension,
            Player::Two => index % self.dimension,
        };

        let mut seen = vec![false; self.cells.len()];
        let mut stack = Vec::new();
        let mut best = 0;

        for start in 0..self.cells.len() {
            if seen[start] || self.cells[start] != stone {
                continue;
            }
            seen[start] = true;
            stack.push(start);
            let (mut low, mut high) = (axis(start), axis(start));

            while let Some(index) = stack.pop() {
                low = low.min(axis(index));
                high = high.max(axis(index));
                for next in self.neighbours(index) {
                    if !seen[next] && self.cells[next] == stone {
                        seen[next] = true;
                        stack.push(next);
                    }
                }
            }
            best = best.max(high - low + 1);
        }
        best
    }
}

impl Default for HexBoard {
    fn default() -> Self {
        Self {
            dimension: DEFAULT_DIMENSION,
            cells: vec![Cell::Empty; DEFAULT_DIMENSION * DEFAULT_DIMENSION],
        }
    }
}

impl GameState for HexBoard {
    type Move = HexMove;

    fn generate_moves(&self, _player: Player) -> Vec<HexMove> {
        // placement games give both players the same moves
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, cell)| cell.is_empty())
            .map(|(index, _)| HexMove::new(index / self.dimension, index % self.dimension))
            .collect()
    }

    fn apply_move(&self, mv: &HexMove, player: Player) -> crate::Result<Self> {
        let (row, col) = (mv.row as usize, mv.col as usize);
        if row >= self.dimension || col >= self.dimension {
            return Err(SearchError::InvalidState(format!(
                "move {} is outside a board of size {}",
                mv, self.dimension
            )));
        }
        let index = row * self.dimension + col;
        if !self.cells[index].is_empty() {
            return Err(SearchError::InvalidState(format!("cell {} is already taken", mv)));
        }
        let mut next = self.clone();
        next.cells[index] = Cell::from(player);
        Ok(next)
    }

    fn outcome(&self) -> Outcome {
        if self.longest_span(Player::One) == self.dimension {
            Outcome::PlayerOneWin
        } else if self.longest_span(Player::Two) == self.dimension {
            Outcome::PlayerTwoWin
        } else {
            Outcome::Undecided
        }
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn evaluate(&self, perspective: Player) -> f64 {
        match self.outcome().winner() {
            Some(winner) if winner == perspective => WIN_SCORE,
            Some(_) => -WIN_SCORE,
            None => {
                self.longest_span(perspective) as f64
                    - self.longest_span(perspective.opponent()) as f64
            }
        }
    }
}

impl fmt::Display for HexBoard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let header: String = (0..self.dimension)
            .map(|c| format!("{} ", (b'a' + c as u8) as char))
            .collect();
        writeln!(f, "    {}", header.trim_end())?;
        for row in 0..self.dimension {
            write!(f, "{}{:>2}  ", " ".repeat(row), row + 1)?;
            for col in 0..self.dimension {
                let symbol = match self.cell(row, col) {
                    Cell::PlayerOne => 'X',
                    Cell::PlayerTwo => 'O',
                    Cell::Empty => '.',
                };
                write!(f, "{} ", symbol)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_moves() -> Result<()> {
        assert_eq!(HexMove::parse("a1")?, HexMove::new(0, 0));
        assert_eq!(HexMove::parse("C11")?, HexMove::new(10, 2));
        assert_eq!(HexMove::new(4, 1).to_string(), "b5");
        assert!(HexMove::parse("a0").is_err());
        assert!(HexMove::parse("11").is_err());
        Ok(())
    }

    #[test]
    fn player_one_joins_top_and_bottom() -> Result<()> {
        // a1 a2 a3 are player one's moves, b-column stones belong to player two
        let board = HexBoard::from_moves(3, "a1 b1 a2 b2 a3")?;
        assert_eq!(board.outcome(), Outcome::PlayerOneWin);
        assert_eq!(board.evaluate(Player::One), WIN_SCORE);
        assert_eq!(board.evaluate(Player::Two), -WIN_SCORE);
        Ok(())
    }

    #[test]
    fn player_two_joins_left_and_right() -> Result<()> {
        let board = HexBoard::from_moves(3, "a1 a2 c1 b2 a3 c2")?;
        assert_eq!(board.outcome(), Outcome::PlayerTwoWin);
        Ok(())
    }

    #[test]
    fn diagonal_neighbours_connect() -> Result<()> {
        // c1 and b2 touch on a hex grid, b2 and a3 as well
        let board = HexBoard::from_moves(3, "c1 a1 b2 b1 a3")?;
        assert_eq!(board.outcome(), Outcome::PlayerOneWin);
        Ok(())
    }

    #[test]
    fn rejects_bad_positions() {
        assert!(HexBoard::from_moves(3, "a1 a1").is_err());
        assert!(HexBoard::from_moves(3, "d1").is_err());
        assert!(HexBoard::from_moves(3, "a1 b1 a2 b2 a3 c3").is_err());
        assert!(HexBoard::new(0).is_err());
        assert!(HexBoard::new(MAX_DIMENSION + 1).is_err());
    }

    #[test]
    fn apply_move_leaves_receiver_untouched() -> Result<()> {
        let board = HexBoard::new(3)?;
        let next = board.apply_move(&HexMove::new(1, 1), Player::One)?;
        assert_eq!(board.num_stones(), 0);
        assert_eq!(next.cell(1, 1), Cell::PlayerOne);
        assert_eq!(next.side_to_move(), Player::Two);
        assert!(matches!(
            next.apply_move(&HexMove::new(1, 1), Player::Two),
            Err(SearchError::InvalidState(_))
        ));
        Ok(())
    }

    #[test]
    fn moves_are_row_major() -> Result<()> {
        let board = HexBoard::from_moves(2, "a1")?;
        assert_eq!(
            board.generate_moves(Player::Two),
            vec![HexMove::new(0, 1), HexMove::new(1, 0), HexMove::new(1, 1)]
        );
        Ok(())
    }

    #[test]
    fn heuristic_compares_spans() -> Result<()> {
        let board = HexBoard::from_moves(4, "a1 c3 a2")?;
        assert_eq!(board.evaluate(Player::One), 1.0);
        assert_eq!(board.evaluate(Player::Two), -1.0);
        Ok(())
    }
}
