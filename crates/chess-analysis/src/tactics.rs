//! Tactical opportunities: positions where one move is decisively better
//! than every other.
//!
//! Motif labels are cheap heuristics read off the board snapshot before the
//! move. They describe the shape of the oracle's suggestion; they do not
//! prove that a tactic exists.

use chess_core::{Board, Color, Piece, Square, UciMove};
use serde::{Deserialize, Serialize};

use crate::quality::AnalyzedMove;

/// Whether the player found the decisive move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TacticOutcome {
    Found,
    Missed,
}

/// Best-effort label for the kind of tactic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Motif {
    #[serde(rename = "mating_attack")]
    MatingAttack,
    #[serde(rename = "fork-like")]
    ForkLike,
    #[serde(rename = "promotion")]
    Promotion,
    #[serde(rename = "winning_capture")]
    WinningCapture,
    #[serde(rename = "forcing_check")]
    ForcingCheck,
    #[serde(rename = "quiet_tactic")]
    QuietTactic,
}

/// A position with a decisive best move, and what the mover did about it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TacticalOpportunity {
    pub move_number: usize,
    pub color: Color,
    pub outcome: TacticOutcome,
    pub motif: Motif,
    /// Centipawn gap between the best and the next-best distinct line.
    pub gap_cp: i32,
    pub best_move: UciMove,
}

/// Flags tactical opportunities in an analyzed game.
#[derive(Debug, Clone, Copy)]
pub struct TacticalOpportunityDetector {
    decisive_gap_cp: i32,
    found_tolerance_cp: i32,
}

impl Default for TacticalOpportunityDetector {
    fn default() -> Self {
        Self::new(150, 30)
    }
}

impl TacticalOpportunityDetector {
    pub fn new(decisive_gap_cp: i32, found_tolerance_cp: i32) -> Self {
        Self {
            decisive_gap_cp,
            found_tolerance_cp,
        }
    }

    /// Returns opportunities in move order.
    ///
    /// `boards` are the snapshots P0..Pn; the board before move i is
    /// `boards[i - 1]`. Moves without a judgement, a best move, or a
    /// distinct second line are skipped.
    pub fn detect(&self, moves: &[AnalyzedMove], boards: &[Board]) -> Vec<TacticalOpportunity> {
        moves
            .iter()
            .filter_map(|m| {
                let board = m.number().checked_sub(1).and_then(|i| boards.get(i));
                self.inspect(m, board)
            })
            .collect()
    }

    fn inspect(&self, analyzed: &AnalyzedMove, board: Option<&Board>) -> Option<TacticalOpportunity> {
        let judgement = analyzed.judgement.as_ref()?;
        let best = judgement.best_move?;
        let second = judgement.alternatives.iter().find(|alt| alt.mv != best)?;

        let top = judgement.evaluation_before;
        let top_cp = top.to_centipawns();
        let gap_cp = top_cp - second.evaluation.to_centipawns();
        // Centipawn scores are clamped far below mate scores, so this only
        // decides anything when the configured gap exceeds that distance.
        let mate_only = top.is_winning_mate() && !second.evaluation.is_winning_mate();
        if gap_cp <= self.decisive_gap_cp && !mate_only {
            return None;
        }

        let played = analyzed.mv.uci;
        let achieved_cp = judgement.evaluation_after.to_centipawns();
        let outcome = if played == best || top_cp - achieved_cp <= self.found_tolerance_cp {
            TacticOutcome::Found
        } else {
            TacticOutcome::Missed
        };

        let motif = if top.is_winning_mate() {
            Motif::MatingAttack
        } else {
            board.map_or(Motif::QuietTactic, |b| classify_motif(b, best))
        };

        Some(TacticalOpportunity {
            move_number: analyzed.number(),
            color: analyzed.color(),
            outcome,
            motif,
            gap_cp,
            best_move: best,
        })
    }
}

/// Labels a suggested move by its shape on the board.
pub fn classify_motif(board: &Board, mv: UciMove) -> Motif {
    let Some((piece, color)) = board.piece_at(mv.from) else {
        return Motif::QuietTactic;
    };
    let captured = captured_piece(board, piece, color, mv);
    let check = gives_check(board, piece, color, mv);

    match captured {
        Some(_) if check => Motif::ForkLike,
        _ if mv.is_promotion() => Motif::Promotion,
        Some(victim) if victim.value() > piece.value() => Motif::WinningCapture,
        None if check => Motif::ForcingCheck,
        _ => Motif::QuietTactic,
    }
}

fn captured_piece(board: &Board, piece: Piece, color: Color, mv: UciMove) -> Option<Piece> {
    match board.piece_at(mv.to) {
        Some((victim, owner)) if owner != color => Some(victim),
        Some(_) => None,
        // En passant: a pawn moving diagonally onto an empty square.
        None if piece == Piece::Pawn && mv.from.file() != mv.to.file() => Some(Piece::Pawn),
        None => None,
    }
}

/// Direct check only; discovered checks are not seen.
fn gives_check(board: &Board, piece: Piece, color: Color, mv: UciMove) -> bool {
    let Some(king) = board.king_square(color.opposite()) else {
        return false;
    };
    let piece = mv.promotion.unwrap_or(piece);
    attacks(board, piece, color, mv.from, mv.to, king)
}

/// Does `piece` standing on `from` attack `target`, with `vacated` treated
/// as empty?
fn attacks(board: &Board, piece: Piece, color: Color, vacated: Square, from: Square, target: Square) -> bool {
    let df = i32::from(target.file()) - i32::from(from.file());
    let dr = i32::from(target.rank()) - i32::from(from.rank());
    let diagonal = df != 0 && df.abs() == dr.abs();
    let straight = (df == 0) != (dr == 0);
    match piece {
        Piece::Pawn => dr == color.sign() && df.abs() == 1,
        Piece::Knight => matches!((df.abs(), dr.abs()), (1, 2) | (2, 1)),
        Piece::King => df.abs().max(dr.abs()) == 1,
        Piece::Bishop => diagonal && path_clear(board, vacated, from, df, dr),
        Piece::Rook => straight && path_clear(board, vacated, from, df, dr),
        Piece::Queen => (diagonal || straight) && path_clear(board, vacated, from, df, dr),
    }
}

fn path_clear(board: &Board, vacated: Square, from: Square, df: i32, dr: i32) -> bool {
    let (step_f, step_r) = (df.signum(), dr.signum());
    let steps = df.abs().max(dr.abs());
    (1..steps).all(|i| {
        let file = i32::from(from.file()) + step_f * i;
        let rank = i32::from(from.rank()) + step_r * i;
        match Square::from_coords(file as u8, rank as u8) {
            Some(sq) => sq == vacated || board.piece_at(sq).is_none(),
            None => false,
        }
    })
}
