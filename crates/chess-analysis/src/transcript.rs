//! Completed-game transcripts as produced by the rules engine.

use chess_core::{Board, Color, UciMove};
use serde::{Deserialize, Serialize};

use crate::AnalysisError;

/// One recorded move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Move {
    /// 1-based ply index.
    pub ply: usize,
    /// Side that made the move.
    pub color: Color,
    /// Move as shown to the players (SAN), e.g. `Nxe5+`.
    pub notation: String,
    /// Origin, destination and promotion, e.g. `e7e8q`.
    pub uci: UciMove,
    /// Position after the move.
    pub fen: String,
    /// Thinking time in milliseconds, when recorded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_spent_ms: Option<u64>,
}

impl Move {
    /// Returns true if the notation marks a capture.
    pub fn is_capture(&self) -> bool {
        self.notation.contains('x')
    }

    /// Returns true if the notation marks check or mate.
    pub fn gives_check(&self) -> bool {
        self.notation.ends_with('+') || self.notation.ends_with('#')
    }
}

/// A finished game: starting position plus every move in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transcript {
    #[serde(default)]
    pub game_id: String,
    /// FEN of the position before the first move.
    #[serde(default = "default_initial_position")]
    pub initial_position: String,
    pub moves: Vec<Move>,
}

fn default_initial_position() -> String {
    Board::STARTPOS.to_string()
}

impl Transcript {
    /// Number of moves (plies) in the game.
    pub fn len(&self) -> usize {
        self.moves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    /// FENs of positions P0..Pn: the initial position, then the position
    /// after each move.
    pub fn positions(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.initial_position.as_str())
            .chain(self.moves.iter().map(|m| m.fen.as_str()))
    }

    /// Checks internal consistency and returns the parsed boards P0..Pn.
    ///
    /// Legality is not checked; the transcript comes from a trusted rules
    /// engine. This only catches transcripts that cannot have come from one.
    pub fn validate(&self) -> Result<Vec<Board>, AnalysisError> {
        if self.moves.is_empty() {
            return Err(AnalysisError::malformed(0, "transcript has no moves"));
        }

        let initial = Board::from_fen(&self.initial_position)
            .map_err(|e| AnalysisError::malformed(0, format!("initial position: {}", e)))?;
        let mut boards = Vec::with_capacity(self.moves.len() + 1);
        boards.push(initial);

        for (index, mv) in self.moves.iter().enumerate() {
            let ply = index + 1;
            if mv.ply != ply {
                return Err(AnalysisError::malformed(
                    ply,
                    format!("expected ply {}, found {}", ply, mv.ply),
                ));
            }

            let before = &boards[index];
            if mv.color != before.side_to_move() {
                return Err(AnalysisError::malformed(
                    ply,
                    format!("{} moved but it was {} to move", mv.color, before.side_to_move()),
                ));
            }
            match before.piece_at(mv.uci.from) {
                Some((_, color)) if color == mv.color => {}
                _ => {
                    return Err(AnalysisError::malformed(
                        ply,
                        format!("no {} piece on {}", mv.color, mv.uci.from),
                    ))
                }
            }

            let after = Board::from_fen(&mv.fen)
                .map_err(|e| AnalysisError::malformed(ply, e.to_string()))?;
            if after.side_to_move() != mv.color.opposite() {
                return Err(AnalysisError::malformed(
                    ply,
                    "resulting position has the mover still to move",
                ));
            }
            match after.piece_at(mv.uci.to) {
                Some((_, color)) if color == mv.color => {}
                _ => {
                    return Err(AnalysisError::malformed(
                        ply,
                        format!("no {} piece on {} after the move", mv.color, mv.uci.to),
                    ))
                }
            }
            boards.push(after);
        }
        Ok(boards)
    }
}
