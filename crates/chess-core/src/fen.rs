//! FEN (Forsyth-Edwards Notation) board snapshots.
//!
//! A [`Board`] is a read-only view of one transcript position: which piece
//! stands on which square and whose turn it is. It is
//! enough for material bookkeeping and cheap shape checks; move generation
//! lives with the rules engine, not here.

use crate::{Color, Piece, Square};
use thiserror::Error;

/// Errors that can occur when parsing FEN strings.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FenError {
    #[error("invalid FEN: expected 6 parts, got {0}")]
    InvalidPartCount(usize),

    #[error("invalid piece placement: {0}")]
    InvalidPiecePlacement(String),

    #[error("invalid active color: expected 'w' or 'b', got '{0}'")]
    InvalidActiveColor(String),

    #[error("invalid fullmove number: {0}")]
    InvalidFullmoveNumber(String),

    #[error("missing {0} king")]
    MissingKing(Color),
}

/// Parsed board position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    squares: [Option<(Piece, Color)>; 64],
    side_to_move: Color,
}

impl Board {
    /// The standard starting position FEN.
    pub const STARTPOS: &'static str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

    /// Parses a FEN string.
    ///
    /// Castling, en passant and halfmove fields must be present but are not
    /// interpreted. The fullmove number must be a valid counter.
    pub fn from_fen(fen: &str) -> Result<Self, FenError> {
        let parts: Vec<&str> = fen.split_whitespace().collect();
        if parts.len() != 6 {
            return Err(FenError::InvalidPartCount(parts.len()));
        }

        let squares = Self::parse_placement(parts[0])?;

        let side_to_move = Color::from_fen_field(parts[1])
            .ok_or_else(|| FenError::InvalidActiveColor(parts[1].to_string()))?;

        parts[5]
            .parse::<u32>()
            .map_err(|_| FenError::InvalidFullmoveNumber(parts[5].to_string()))?;

        let board = Board {
            squares,
            side_to_move,
        };
        for color in [Color::White, Color::Black] {
            if board.king_square(color).is_none() {
                return Err(FenError::MissingKing(color));
            }
        }
        Ok(board)
    }

    fn parse_placement(placement: &str) -> Result<[Option<(Piece, Color)>; 64], FenError> {
        let ranks: Vec<&str> = placement.split('/').collect();
        if ranks.len() != 8 {
            return Err(FenError::InvalidPiecePlacement(format!(
                "expected 8 ranks, got {}",
                ranks.len()
            )));
        }

        let mut squares = [None; 64];
        // FEN lists rank 8 first.
        for (row, rank_str) in ranks.iter().enumerate() {
            let rank = 7 - row as u8;
            let mut file: u8 = 0;
            for c in rank_str.chars() {
                if let Some(skip) = c.to_digit(10) {
                    if skip == 0 || u32::from(file) + skip > 8 {
                        return Err(FenError::InvalidPiecePlacement(format!(
                            "rank {} overflows",
                            rank + 1
                        )));
                    }
                    file += skip as u8;
                    continue;
                }
                let entry = Piece::from_fen_char(c).ok_or_else(|| {
                    FenError::InvalidPiecePlacement(format!(
                        "invalid character '{}' in rank {}",
                        c,
                        rank + 1
                    ))
                })?;
                let sq = Square::from_coords(file, rank).ok_or_else(|| {
                    FenError::InvalidPiecePlacement(format!("rank {} overflows", rank + 1))
                })?;
                squares[sq.index()] = Some(entry);
                file += 1;
            }
            if file != 8 {
                return Err(FenError::InvalidPiecePlacement(format!(
                    "rank {} has {} squares, expected 8",
                    rank + 1,
                    file
                )));
            }
        }
        Ok(squares)
    }

    /// Side to move in this position.
    #[inline]
    pub fn side_to_move(&self) -> Color {
        self.side_to_move
    }

    /// Piece and color on a square, if any.
    #[inline]
    pub fn piece_at(&self, sq: Square) -> Option<(Piece, Color)> {
        self.squares[sq.index()]
    }

    /// Square of the given side's king.
    pub fn king_square(&self, color: Color) -> Option<Square> {
        self.squares
            .iter()
            .position(|entry| *entry == Some((Piece::King, color)))
            .and_then(|idx| Square::from_index(idx as u8))
    }

    /// Total material value of one side, in centipawns.
    pub fn material(&self, color: Color) -> i32 {
        self.squares
            .iter()
            .flatten()
            .filter(|(_, c)| *c == color)
            .map(|(p, _)| p.value())
            .sum()
    }

    /// Material of `color` minus material of the opponent.
    pub fn material_balance(&self, color: Color) -> i32 {
        self.material(color) - self.material(color.opposite())
    }

    /// Combined material of both sides.
    pub fn total_material(&self) -> i32 {
        self.material(Color::White) + self.material(Color::Black)
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::from_fen(Self::STARTPOS).expect("STARTPOS is valid")
    }
}
