use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{Color, EndReason, PieceCount, Position, Winner};

pub const BOARD_SIZE: usize = 8;
const NUM_SQUARES: usize = BOARD_SIZE * BOARD_SIZE;
const DIRECTIONS: [(i32, i32); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

/// Wire form: eight rows of eight cells, `null` for empty.
type Rows = Vec<Vec<Option<Color>>>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BoardError {
    #[error("board must have 8 rows, got {0}")]
    RowCount(usize),
    #[error("board row {row} must have 8 cells, got {len}")]
    RowLength { row: usize, len: usize },
}

/// Othello board state represented by two bitboards.
///
/// The value is `Copy`, so every transition produces a fresh board and the
/// caller's copy is never touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Rows", into = "Rows")]
pub struct Board {
    black: u64,
    white: u64,
}

impl Board {
    /// Creates the initial board:
    /// (3,3)=white, (3,4)=black, (4,3)=black, (4,4)=white.
    pub fn new() -> Self {
        Self {
            black: bit(28) | bit(35),
            white: bit(27) | bit(36),
        }
    }

    /// Builds a board from raw masks. Squares set in both masks are treated as black.
    pub fn from_bitboards(black: u64, white: u64) -> Self {
        Self {
            black,
            white: white & !black,
        }
    }

    pub fn cell(&self, row: u8, col: u8) -> Option<Color> {
        let square = bit(row_col_to_pos(row, col)?);
        if (self.black & square) != 0 {
            Some(Color::Black)
        } else if (self.white & square) != 0 {
            Some(Color::White)
        } else {
            None
        }
    }

    /// Cells that would turn to `color` if it played at `(row, col)`, in row-major order.
    /// Empty when the square is occupied, off the board, or captures nothing.
    pub fn flippable(&self, row: u8, col: u8, color: Color) -> Vec<Position> {
        match row_col_to_pos(row, col) {
            Some(pos) => mask_to_positions(self.flip_mask(pos, color)),
            None => Vec::new(),
        }
    }

    /// Every legal placement for `color`, in row-major scan order.
    pub fn valid_moves(&self, color: Color) -> Vec<Position> {
        mask_to_positions(self.legal_mask(color))
    }

    pub fn has_valid_move(&self, color: Color) -> bool {
        self.legal_mask(color) != 0
    }

    /// Returns the board after `color` plays at `(row, col)`.
    /// An illegal placement yields an identical board.
    pub fn apply_move(&self, row: u8, col: u8, color: Color) -> Board {
        let Some(pos) = row_col_to_pos(row, col) else {
            return *self;
        };
        let flips = self.flip_mask(pos, color);
        if flips == 0 {
            return *self;
        }

        let (me, opp) = self.sides(color);
        let next_me = me | bit(pos) | flips;
        let next_opp = opp & !flips;

        match color {
            Color::Black => Board::from_bitboards(next_me, next_opp),
            Color::White => Board::from_bitboards(next_opp, next_me),
        }
    }

    pub fn count(&self) -> PieceCount {
        PieceCount {
            black: self.black.count_ones() as u8,
            white: self.white.count_ones() as u8,
        }
    }

    pub fn is_full(&self) -> bool {
        (self.black | self.white) == u64::MAX
    }

    /// Terminal check, in priority order: annihilation, full board, double pass.
    pub fn check_game_end(&self, pass_count: u32) -> Option<EndReason> {
        let PieceCount { black, white } = self.count();
        if black == 0 || white == 0 {
            Some(EndReason::Annihilated)
        } else if self.is_full() {
            Some(EndReason::Full)
        } else if pass_count >= 2 {
            Some(EndReason::BothPass)
        } else {
            None
        }
    }

    pub fn determine_winner(&self) -> Winner {
        let PieceCount { black, white } = self.count();
        if black > white {
            Winner::Black
        } else if white > black {
            Winner::White
        } else {
            Winner::Draw
        }
    }

    fn sides(&self, color: Color) -> (u64, u64) {
        match color {
            Color::Black => (self.black, self.white),
            Color::White => (self.white, self.black),
        }
    }

    fn legal_mask(&self, color: Color) -> u64 {
        let occupied = self.black | self.white;
        let mut legal = 0u64;

        for pos in 0..NUM_SQUARES {
            let move_bit = bit(pos);
            if (occupied & move_bit) != 0 {
                continue;
            }
            if self.flip_mask(pos, color) != 0 {
                legal |= move_bit;
            }
        }

        legal
    }

    fn flip_mask(&self, pos: usize, color: Color) -> u64 {
        if pos >= NUM_SQUARES {
            return 0;
        }

        let (me, opp) = self.sides(color);
        if ((me | opp) & bit(pos)) != 0 {
            return 0;
        }

        let (row, col) = pos_to_row_col(pos);
        let mut flips = 0u64;

        for (dr, dc) in DIRECTIONS {
            let mut r = row + dr;
            let mut c = col + dc;
            let mut line = 0u64;

            while in_bounds(r, c) {
                let square = bit((r as usize) * BOARD_SIZE + c as usize);
                if (opp & square) != 0 {
                    line |= square;
                } else if (me & square) != 0 {
                    flips |= line;
                    break;
                } else {
                    break;
                }

                r += dr;
                c += dc;
            }
        }

        flips
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Board> for Rows {
    fn from(board: Board) -> Self {
        (0..BOARD_SIZE as u8)
            .map(|row| {
                (0..BOARD_SIZE as u8)
                    .map(|col| board.cell(row, col))
                    .collect()
            })
            .collect()
    }
}

impl TryFrom<Rows> for Board {
    type Error = BoardError;

    fn try_from(rows: Rows) -> Result<Self, Self::Error> {
        if rows.len() != BOARD_SIZE {
            return Err(BoardError::RowCount(rows.len()));
        }

        let mut black = 0u64;
        let mut white = 0u64;
        for (row, cells) in rows.iter().enumerate() {
            if cells.len() != BOARD_SIZE {
                return Err(BoardError::RowLength {
                    row,
                    len: cells.len(),
                });
            }
            for (col, cell) in cells.iter().enumerate() {
                let square = bit(row * BOARD_SIZE + col);
                match cell {
                    Some(Color::Black) => black |= square,
                    Some(Color::White) => white |= square,
                    None => {}
                }
            }
        }

        Ok(Board::from_bitboards(black, white))
    }
}

fn bit(pos: usize) -> u64 {
    if pos < NUM_SQUARES { 1u64 << pos } else { 0 }
}

fn row_col_to_pos(row: u8, col: u8) -> Option<usize> {
    let (row, col) = (row as usize, col as usize);
    (row < BOARD_SIZE && col < BOARD_SIZE).then_some(row * BOARD_SIZE + col)
}

fn pos_to_row_col(pos: usize) -> (i32, i32) {
    ((pos / BOARD_SIZE) as i32, (pos % BOARD_SIZE) as i32)
}

fn in_bounds(row: i32, col: i32) -> bool {
    (0..BOARD_SIZE as i32).contains(&row) && (0..BOARD_SIZE as i32).contains(&col)
}

fn mask_to_positions(mask: u64) -> Vec<Position> {
    let mut bits = mask;
    let mut out = Vec::with_capacity(mask.count_ones() as usize);

    while bits != 0 {
        let idx = bits.trailing_zeros() as usize;
        out.push(Position::new(
            (idx / BOARD_SIZE) as u8,
            (idx % BOARD_SIZE) as u8,
        ));
        bits &= bits - 1;
    }

    out
}
