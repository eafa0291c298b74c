//! Chess position evaluation types.

use serde::{Deserialize, Serialize};

/// Centipawn-equivalent of an immediate checkmate. Mate-in-N maps to
/// `MATE_SCORE - N` so that shorter mates score higher.
pub const MATE_SCORE: i32 = 100_000;

/// Longest mate distance kept distinct; longer ones saturate here.
pub const MAX_MATE_DISTANCE: i32 = 1_000;

/// Plain centipawn scores are clamped to this magnitude so they can never
/// be confused with a mate score.
pub const MAX_CENTIPAWNS: i32 = 50_000;

/// A position evaluation from one side's point of view.
///
/// Scores coming out of the oracle are relative to the side to move; the
/// analyzer re-normalizes them to the mover's perspective with [`flip`].
///
/// [`flip`]: Evaluation::flip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Evaluation {
    /// Centipawn evaluation (positive = perspective side is better).
    Centipawns(i32),
    /// Forced mate in N moves (positive = perspective side mates,
    /// negative = perspective side gets mated). Never zero.
    Mate(i32),
    /// The perspective side is checkmated on the board.
    Checkmated,
    /// The perspective side has delivered checkmate.
    Checkmating,
}

impl Evaluation {
    /// Builds an evaluation from the `score cp` / `score mate` fields of a
    /// UCI info line. Mate takes precedence when both are present.
    pub fn from_uci_score(cp: Option<i32>, mate: Option<i32>) -> Option<Self> {
        match (cp, mate) {
            (_, Some(0)) => Some(Evaluation::Checkmated),
            (_, Some(n)) => Some(Evaluation::Mate(n)),
            (Some(cp), None) => Some(Evaluation::Centipawns(cp)),
            (None, None) => None,
        }
    }

    /// Saturating centipawn-equivalent of this evaluation, so downstream
    /// arithmetic can treat mates and ordinary scores alike.
    pub fn to_centipawns(self) -> i32 {
        match self {
            Evaluation::Centipawns(cp) => cp.clamp(-MAX_CENTIPAWNS, MAX_CENTIPAWNS),
            Evaluation::Mate(n) if n > 0 => MATE_SCORE - n.min(MAX_MATE_DISTANCE),
            Evaluation::Mate(n) => -(MATE_SCORE - n.saturating_abs().min(MAX_MATE_DISTANCE)),
            Evaluation::Checkmated => -MATE_SCORE,
            Evaluation::Checkmating => MATE_SCORE,
        }
    }

    /// The same evaluation seen from the other side.
    pub fn flip(self) -> Self {
        match self {
            Evaluation::Centipawns(cp) => Evaluation::Centipawns(cp.saturating_neg()),
            Evaluation::Mate(n) => Evaluation::Mate(n.saturating_neg()),
            Evaluation::Checkmated => Evaluation::Checkmating,
            Evaluation::Checkmating => Evaluation::Checkmated,
        }
    }

    /// Returns true if this is a forced mate for the perspective side.
    pub fn is_winning_mate(self) -> bool {
        matches!(self, Evaluation::Mate(n) if n > 0) || self == Evaluation::Checkmating
    }

    /// Returns true for any mate-flavoured evaluation.
    pub fn is_mate(self) -> bool {
        !matches!(self, Evaluation::Centipawns(_))
    }
}

impl std::fmt::Display for Evaluation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Evaluation::Centipawns(cp) => write!(f, "{:+.2}", *cp as f64 / 100.0),
            Evaluation::Mate(n) if *n > 0 => write!(f, "#{}", n),
            Evaluation::Mate(n) => write!(f, "#-{}", n.saturating_abs()),
            Evaluation::Checkmated => write!(f, "#-0"),
            Evaluation::Checkmating => write!(f, "#0"),
        }
    }
}
