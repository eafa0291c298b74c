//! Critical moments: moves that swung the evaluation materially.

use chess_core::Color;
use serde::{Deserialize, Serialize};

use crate::quality::{AnalyzedMove, MoveQuality};

/// Each side of a swing is clamped to this before subtracting, so a mate
/// score does not dwarf every ordinary swing.
pub const SWING_CLAMP_CP: i32 = 2_000;

/// Mover-relative evaluation from which a position counts as won.
pub const WINNING_CP: i32 = 300;

/// Minimum centipawn loss for a missed win.
pub const MISSED_WIN_MIN_LOSS: u32 = 100;

/// Evaluations within this band of zero never count as a lead change.
pub const TURNING_POINT_DEAD_BAND_CP: i32 = 50;

/// Minimum favourable swing for a brilliancy.
pub const BRILLIANT_SWING_CP: i32 = 200;

const BLUNDER_MIN_LOSS: u32 = 200;
const BRILLIANT_MAX_LOSS: u32 = 10;

/// Character of a critical moment. Earlier variants win when several apply.
///
/// A swing past the threshold that fits none of the strict rules still gets
/// a tag from its direction: adverse swings from a mistake or worse are
/// blunders, other adverse swings are turning points, favourable swings are
/// brilliancies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MomentKind {
    Blunder,
    MissedWin,
    TurningPoint,
    Brilliant,
}

/// A move whose evaluation swing crossed the materiality threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriticalMoment {
    pub move_number: usize,
    pub color: Color,
    /// Signed swing in pawns, positive when White gained.
    pub swing: f64,
    pub kind: MomentKind,
    pub description: String,
}

impl CriticalMoment {
    /// Returns true if the swing went `color`'s way.
    pub fn favours(&self, color: Color) -> bool {
        self.swing * f64::from(color.sign()) > 0.0
    }
}

/// Finds critical moments in an analyzed game.
#[derive(Debug, Clone, Copy)]
pub struct CriticalMomentDetector {
    threshold_cp: i32,
}

impl Default for CriticalMomentDetector {
    fn default() -> Self {
        Self::new(100)
    }
}

impl CriticalMomentDetector {
    /// `threshold_cp` is the swing magnitude that must be exceeded.
    pub fn new(threshold_cp: i32) -> Self {
        Self { threshold_cp }
    }

    /// Returns one moment per analyzed move whose swing exceeds the
    /// threshold, in move order. Unanalyzed moves are skipped.
    pub fn detect(&self, moves: &[AnalyzedMove]) -> Vec<CriticalMoment> {
        moves.iter().filter_map(|m| self.classify(m)).collect()
    }

    fn classify(&self, analyzed: &AnalyzedMove) -> Option<CriticalMoment> {
        let judgement = analyzed.judgement.as_ref()?;
        let sign = analyzed.color().sign();

        let before_mover = judgement
            .evaluation_before
            .to_centipawns()
            .clamp(-SWING_CLAMP_CP, SWING_CLAMP_CP);
        let after_mover = judgement
            .evaluation_after
            .to_centipawns()
            .clamp(-SWING_CLAMP_CP, SWING_CLAMP_CP);
        let before_white = before_mover * sign;
        let after_white = after_mover * sign;
        let swing_white = after_white - before_white;
        if swing_white.abs() <= self.threshold_cp {
            return None;
        }
        let swing_mover = swing_white * sign;
        let loss = judgement.centipawn_loss;

        let kind = if swing_mover < 0 && loss > BLUNDER_MIN_LOSS {
            MomentKind::Blunder
        } else if before_mover >= WINNING_CP
            && !judgement.played_best(analyzed.mv.uci)
            && loss >= MISSED_WIN_MIN_LOSS
        {
            MomentKind::MissedWin
        } else if lead_changed(before_white, after_white) {
            MomentKind::TurningPoint
        } else if swing_mover >= BRILLIANT_SWING_CP && loss <= BRILLIANT_MAX_LOSS {
            MomentKind::Brilliant
        } else if swing_mover < 0 && judgement.quality >= MoveQuality::Mistake {
            MomentKind::Blunder
        } else if swing_mover < 0 {
            MomentKind::TurningPoint
        } else {
            MomentKind::Brilliant
        };

        let swing = f64::from(swing_white) / 100.0;
        Some(CriticalMoment {
            move_number: analyzed.number(),
            color: analyzed.color(),
            swing,
            kind,
            description: describe(kind, analyzed, swing),
        })
    }
}

fn lead_changed(before_white: i32, after_white: i32) -> bool {
    let band = TURNING_POINT_DEAD_BAND_CP;
    (before_white > band && after_white < -band) || (before_white < -band && after_white > band)
}

fn describe(kind: MomentKind, analyzed: &AnalyzedMove, swing: f64) -> String {
    let color = analyzed.color();
    let notation = &analyzed.mv.notation;
    match kind {
        MomentKind::Blunder => {
            format!("{} blundered with {} ({:+.2})", color, notation, swing)
        }
        MomentKind::MissedWin => format!(
            "{} let a winning position slip with {} ({:+.2})",
            color, notation, swing
        ),
        MomentKind::TurningPoint => {
            format!("{} by {} turned the game ({:+.2})", notation, color, swing)
        }
        MomentKind::Brilliant => format!(
            "{} found the strong {} ({:+.2})",
            color, notation, swing
        ),
    }
}
