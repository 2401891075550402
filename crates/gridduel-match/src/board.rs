//! The 3×3 board and its rules.
//!
//! A `Board` is owned by exactly one match session and never shared, so it
//! needs no locking. It only knows about marks and lines; whose turn it is
//! lives in the session.

use std::fmt;

use gridduel_protocol::{BoardSnapshot, Cell, InvalidReason};

/// Board side length.
pub const SIZE: u8 = 3;

/// Every line that wins: three rows, three columns, two diagonals.
const LINES: [[usize; 3]; 8] = [
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8],
    [0, 4, 8],
    [2, 4, 6],
];

/// One of the two seats in a match. Player 1 plays X and moves first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    One,
    Two,
}

impl Side {
    /// The other seat.
    pub fn other(self) -> Self {
        match self {
            Self::One => Self::Two,
            Self::Two => Self::One,
        }
    }

    /// The mark this side places.
    pub fn mark(self) -> Cell {
        match self {
            Self::One => Cell::X,
            Self::Two => Cell::O,
        }
    }

    fn from_mark(cell: Cell) -> Option<Self> {
        match cell {
            Cell::X => Some(Self::One),
            Cell::O => Some(Self::Two),
            Cell::Empty => None,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::One => write!(f, "player 1"),
            Self::Two => write!(f, "player 2"),
        }
    }
}

/// Why a move was refused. The player gets another try.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum InvalidMove {
    #[error("row or column outside 0..=2")]
    OutOfRange,
    #[error("cell is already taken")]
    LocationTaken,
}

impl InvalidMove {
    /// The reason code sent back in INVALID.
    pub fn reason(self) -> InvalidReason {
        match self {
            Self::OutOfRange => InvalidReason::OutOfRange,
            Self::LocationTaken => InvalidReason::LocationTaken,
        }
    }
}

/// The game grid plus a count of accepted moves.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Board {
    cells: [Cell; 9],
    moves_played: u8,
}

impl Board {
    pub fn new() -> Self {
        Self::default()
    }

    /// Places `side`'s mark at `(row, col)`.
    ///
    /// A cell that already holds a mark is never overwritten; the move is
    /// refused instead and the board is left unchanged.
    pub fn place(
        &mut self,
        row: u8,
        col: u8,
        side: Side,
    ) -> Result<(), InvalidMove> {
        if row >= SIZE || col >= SIZE {
            return Err(InvalidMove::OutOfRange);
        }
        let index = usize::from(row * SIZE + col);
        if self.cells[index] != Cell::Empty {
            return Err(InvalidMove::LocationTaken);
        }
        self.cells[index] = side.mark();
        self.moves_played += 1;
        Ok(())
    }

    /// The side owning a complete row, column or diagonal, if any.
    pub fn winner(&self) -> Option<Side> {
        LINES.iter().find_map(|&[a, b, c]| {
            let mark = self.cells[a];
            if mark != Cell::Empty && mark == self.cells[b] && mark == self.cells[c] {
                Side::from_mark(mark)
            } else {
                None
            }
        })
    }

    pub fn is_full(&self) -> bool {
        usize::from(self.moves_played) == self.cells.len()
    }

    /// Number of marks placed so far (0..=9).
    pub fn moves_played(&self) -> u8 {
        self.moves_played
    }

    pub fn get(&self, row: u8, col: u8) -> Option<Cell> {
        if row >= SIZE || col >= SIZE {
            return None;
        }
        Some(self.cells[usize::from(row * SIZE + col)])
    }

    /// The row-major copy sent in YOUR_TURN and GAME_OVER.
    pub fn snapshot(&self) -> BoardSnapshot {
        BoardSnapshot(self.cells)
    }
}

/// Renders the board as three lines, e.g.
///
/// ```text
///  X | O |
/// ---+---+---
///    | X |
/// ---+---+---
///    |   | O
/// ```
impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (r, row) in self.cells.chunks(usize::from(SIZE)).enumerate() {
            if r > 0 {
                writeln!(f)?;
                writeln!(f, "---+---+---")?;
            }
            let marks: Vec<&str> = row
                .iter()
                .map(|cell| match cell {
                    Cell::Empty => " ",
                    Cell::X => "X",
                    Cell::O => "O",
                })
                .collect();
            write!(f, " {} | {} | {}", marks[0], marks[1], marks[2])?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board_with(moves: &[(u8, u8, Side)]) -> Board {
        let mut board = Board::new();
        for &(row, col, side) in moves {
            board.place(row, col, side).unwrap();
        }
        board
    }

    #[test]
    fn test_winner_detects_every_line() {
        for line in LINES {
            for side in [Side::One, Side::Two] {
                let mut board = Board::new();
                for index in line {
                    let index = index as u8;
                    board.place(index / SIZE, index % SIZE, side).unwrap();
                }
                assert_eq!(board.winner(), Some(side), "line {line:?}");
            }
        }
    }

    #[test]
    fn test_winner_none_on_empty_board() {
        assert_eq!(Board::new().winner(), None);
    }

    #[test]
    fn test_winner_none_for_mixed_line() {
        let board = board_with(&[
            (0, 0, Side::One),
            (0, 1, Side::Two),
            (0, 2, Side::One),
        ]);
        assert_eq!(board.winner(), None);
    }

    #[test]
    fn test_full_board_without_winner() {
        // X O X
        // X O O
        // O X X
        let board = board_with(&[
            (0, 0, Side::One),
            (0, 1, Side::Two),
            (0, 2, Side::One),
            (1, 1, Side::Two),
            (1, 0, Side::One),
            (1, 2, Side::Two),
            (2, 1, Side::One),
            (2, 0, Side::Two),
            (2, 2, Side::One),
        ]);
        assert!(board.is_full());
        assert_eq!(board.moves_played(), 9);
        assert_eq!(board.winner(), None);
    }

    #[test]
    fn test_place_out_of_range() {
        let mut board = Board::new();
        assert_eq!(board.place(3, 0, Side::One), Err(InvalidMove::OutOfRange));
        assert_eq!(board.place(0, 3, Side::One), Err(InvalidMove::OutOfRange));
        assert_eq!(
            board.place(255, 255, Side::Two),
            Err(InvalidMove::OutOfRange)
        );
        assert_eq!(board.moves_played(), 0);
    }

    #[test]
    fn test_place_never_overwrites() {
        let mut board = board_with(&[(1, 1, Side::One)]);
        assert_eq!(
            board.place(1, 1, Side::Two),
            Err(InvalidMove::LocationTaken)
        );
        assert_eq!(board.get(1, 1), Some(Cell::X));
        assert_eq!(board.moves_played(), 1);
    }

    #[test]
    fn test_invalid_move_reason_codes() {
        assert_eq!(InvalidMove::OutOfRange.reason(), InvalidReason::OutOfRange);
        assert_eq!(
            InvalidMove::LocationTaken.reason(),
            InvalidReason::LocationTaken
        );
    }

    #[test]
    fn test_snapshot_is_row_major() {
        let board = board_with(&[(0, 2, Side::One), (2, 0, Side::Two)]);
        let snapshot = board.snapshot();
        assert_eq!(snapshot.0[2], Cell::X);
        assert_eq!(snapshot.0[6], Cell::O);
    }

    #[test]
    fn test_display_renders_grid() {
        let board = board_with(&[(0, 0, Side::One), (1, 1, Side::Two)]);
        let rendered = board.to_string();
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0], " X |   |  ");
        assert_eq!(lines[2], "   | O |  ");
    }
}
