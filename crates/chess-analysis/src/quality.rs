//! Move quality classification and per-player statistics.

use chess_core::{Color, UciMove};
use serde::{Deserialize, Serialize};

use crate::oracle::Alternative;
use crate::transcript::Move;
use crate::Evaluation;

/// Centipawn losses above this are capped when averaged, so one thrown-away
/// mate does not swamp a whole game's average.
pub const MAX_AGGREGATE_CP_LOSS: u32 = 1_000;

/// Classification of move quality based on centipawn loss.
///
/// Variants are ordered from best to worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveQuality {
    /// At most 10 cp lost
    Excellent,
    /// 11 to 25 cp lost
    Good,
    /// 26 to 75 cp lost
    Inaccuracy,
    /// 76 to 200 cp lost
    Mistake,
    /// More than 200 cp lost
    Blunder,
}

impl MoveQuality {
    pub const ALL: [MoveQuality; 5] = [
        MoveQuality::Excellent,
        MoveQuality::Good,
        MoveQuality::Inaccuracy,
        MoveQuality::Mistake,
        MoveQuality::Blunder,
    ];

    /// Buckets a centipawn loss. Each bound belongs to the better bucket.
    pub fn from_cp_loss(cp_loss: u32) -> Self {
        match cp_loss {
            0..=10 => MoveQuality::Excellent,
            11..=25 => MoveQuality::Good,
            26..=75 => MoveQuality::Inaccuracy,
            76..=200 => MoveQuality::Mistake,
            _ => MoveQuality::Blunder,
        }
    }

    /// Accuracy credited for a move of this quality.
    pub fn accuracy(self) -> f64 {
        match self {
            MoveQuality::Excellent => 100.0,
            MoveQuality::Good => 90.0,
            MoveQuality::Inaccuracy => 70.0,
            MoveQuality::Mistake => 40.0,
            MoveQuality::Blunder => 0.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MoveQuality::Excellent => "excellent",
            MoveQuality::Good => "good",
            MoveQuality::Inaccuracy => "inaccuracy",
            MoveQuality::Mistake => "mistake",
            MoveQuality::Blunder => "blunder",
        }
    }
}

impl std::fmt::Display for MoveQuality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Oracle-backed verdict on one move. All evaluations are from the mover's
/// point of view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveJudgement {
    /// Evaluation of the position before the move.
    pub evaluation_before: Evaluation,
    /// Evaluation of the position after the move.
    pub evaluation_after: Evaluation,
    pub centipawn_loss: u32,
    pub quality: MoveQuality,
    pub accuracy: f64,
    /// Oracle's preferred move in the position before the move.
    pub best_move: Option<UciMove>,
    /// Ranked runner-up lines in the position before the move.
    pub alternatives: Vec<Alternative>,
}

impl MoveJudgement {
    /// Judges a move from its before/after evaluations (mover frame).
    ///
    /// Playing the oracle's own best move costs nothing, whatever the two
    /// independent searches say.
    pub fn new(
        played: UciMove,
        evaluation_before: Evaluation,
        evaluation_after: Evaluation,
        best_move: Option<UciMove>,
        alternatives: Vec<Alternative>,
    ) -> Self {
        let centipawn_loss = if best_move == Some(played) {
            0
        } else {
            let loss = i64::from(evaluation_before.to_centipawns())
                - i64::from(evaluation_after.to_centipawns());
            u32::try_from(loss.max(0)).unwrap_or(u32::MAX)
        };
        let quality = MoveQuality::from_cp_loss(centipawn_loss);
        Self {
            evaluation_before,
            evaluation_after,
            centipawn_loss,
            quality,
            accuracy: quality.accuracy(),
            best_move,
            alternatives,
        }
    }

    /// Returns true if the move played was the oracle's choice.
    pub fn played_best(&self, played: UciMove) -> bool {
        self.best_move == Some(played)
    }
}

/// A transcript move together with its judgement.
///
/// `judgement` is `None` when the oracle could not evaluate the move in
/// time; such moves are left out of every aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzedMove {
    #[serde(rename = "move")]
    pub mv: Move,
    pub judgement: Option<MoveJudgement>,
}

impl AnalyzedMove {
    /// 1-based move number (ply index).
    pub fn number(&self) -> usize {
        self.mv.ply
    }

    pub fn color(&self) -> Color {
        self.mv.color
    }

    pub fn is_analyzed(&self) -> bool {
        self.judgement.is_some()
    }

    pub fn quality(&self) -> Option<MoveQuality> {
        self.judgement.as_ref().map(|j| j.quality)
    }

    pub fn accuracy(&self) -> Option<f64> {
        self.judgement.as_ref().map(|j| j.accuracy)
    }

    pub fn centipawn_loss(&self) -> Option<u32> {
        self.judgement.as_ref().map(|j| j.centipawn_loss)
    }
}

/// Statistics for one side's performance in a game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerStats {
    pub color: Color,
    /// Moves with a judgement
    pub analyzed_moves: u32,
    /// Moves the oracle could not evaluate
    pub unanalyzed_moves: u32,
    pub excellent: u32,
    pub good: u32,
    pub inaccuracies: u32,
    pub mistakes: u32,
    pub blunders: u32,
    /// Average centipawn loss (each loss capped at [`MAX_AGGREGATE_CP_LOSS`])
    pub avg_cp_loss: f64,
    /// Mean move accuracy (0-100); `None` without analyzed moves
    pub accuracy: Option<f64>,
}

impl PlayerStats {
    /// Tallies the moves of `color`.
    pub fn from_moves(color: Color, moves: &[AnalyzedMove]) -> Self {
        let mut stats = PlayerStats {
            color,
            analyzed_moves: 0,
            unanalyzed_moves: 0,
            excellent: 0,
            good: 0,
            inaccuracies: 0,
            mistakes: 0,
            blunders: 0,
            avg_cp_loss: 0.0,
            accuracy: None,
        };
        let mut loss_sum = 0.0;
        let mut accuracy_sum = 0.0;

        for judgement in moves.iter().filter(|m| m.color() == color).map(|m| &m.judgement) {
            let Some(judgement) = judgement else {
                stats.unanalyzed_moves += 1;
                continue;
            };
            stats.analyzed_moves += 1;
            loss_sum += f64::from(judgement.centipawn_loss.min(MAX_AGGREGATE_CP_LOSS));
            accuracy_sum += judgement.accuracy;
            match judgement.quality {
                MoveQuality::Excellent => stats.excellent += 1,
                MoveQuality::Good => stats.good += 1,
                MoveQuality::Inaccuracy => stats.inaccuracies += 1,
                MoveQuality::Mistake => stats.mistakes += 1,
                MoveQuality::Blunder => stats.blunders += 1,
            }
        }

        if stats.analyzed_moves > 0 {
            let n = f64::from(stats.analyzed_moves);
            stats.avg_cp_loss = loss_sum / n;
            stats.accuracy = Some(accuracy_sum / n);
        }
        stats
    }

    /// Number of moves in one quality bucket.
    pub fn count(&self, quality: MoveQuality) -> u32 {
        match quality {
            MoveQuality::Excellent => self.excellent,
            MoveQuality::Good => self.good,
            MoveQuality::Inaccuracy => self.inaccuracies,
            MoveQuality::Mistake => self.mistakes,
            MoveQuality::Blunder => self.blunders,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uci(s: &str) -> UciMove {
        UciMove::parse(s).unwrap()
    }

    fn analyzed(ply: usize, loss: Option<u32>) -> AnalyzedMove {
        let color = if ply % 2 == 1 { Color::White } else { Color::Black };
        AnalyzedMove {
            mv: Move {
                ply,
                color,
                notation: "a3".to_string(),
                uci: uci("a2a3"),
                fen: String::new(),
                time_spent_ms: None,
            },
            judgement: loss.map(|l| {
                MoveJudgement::new(
                    uci("a2a3"),
                    Evaluation::Centipawns(0),
                    Evaluation::Centipawns(-(l as i32)),
                    Some(uci("h2h3")),
                    vec![],
                )
            }),
        }
    }

    #[test]
    fn bucket_boundaries() {
        assert_eq!(MoveQuality::from_cp_loss(0), MoveQuality::Excellent);
        assert_eq!(MoveQuality::from_cp_loss(10), MoveQuality::Excellent);
        assert_eq!(MoveQuality::from_cp_loss(11), MoveQuality::Good);
        assert_eq!(MoveQuality::from_cp_loss(25), MoveQuality::Good);
        assert_eq!(MoveQuality::from_cp_loss(26), MoveQuality::Inaccuracy);
        assert_eq!(MoveQuality::from_cp_loss(75), MoveQuality::Inaccuracy);
        assert_eq!(MoveQuality::from_cp_loss(76), MoveQuality::Mistake);
        assert_eq!(MoveQuality::from_cp_loss(200), MoveQuality::Mistake);
        assert_eq!(MoveQuality::from_cp_loss(201), MoveQuality::Blunder);
    }

    #[test]
    fn accuracy_follows_quality() {
        let accuracies: Vec<f64> = MoveQuality::ALL.iter().map(|q| q.accuracy()).collect();
        assert_eq!(accuracies, vec![100.0, 90.0, 70.0, 40.0, 0.0]);
        assert!(MoveQuality::Excellent < MoveQuality::Blunder);
    }

    #[test]
    fn blunder_from_swing() {
        let j = MoveJudgement::new(
            uci("d1h5"),
            Evaluation::Centipawns(20),
            Evaluation::Centipawns(-260),
            Some(uci("g1f3")),
            vec![],
        );
        assert_eq!(j.centipawn_loss, 280);
        assert_eq!(j.quality, MoveQuality::Blunder);
        assert_eq!(j.accuracy, 0.0);
    }

    #[test]
    fn improvement_is_zero_loss() {
        let j = MoveJudgement::new(
            uci("e2e4"),
            Evaluation::Centipawns(20),
            Evaluation::Centipawns(45),
            Some(uci("d2d4")),
            vec![],
        );
        assert_eq!(j.centipawn_loss, 0);
        assert_eq!(j.quality, MoveQuality::Excellent);
    }

    #[test]
    fn best_move_is_zero_loss_despite_noise() {
        let j = MoveJudgement::new(
            uci("e2e4"),
            Evaluation::Centipawns(80),
            Evaluation::Centipawns(30),
            Some(uci("e2e4")),
            vec![],
        );
        assert_eq!(j.centipawn_loss, 0);
        assert!(j.played_best(uci("e2e4")));
    }

    #[test]
    fn missing_a_mate_is_a_blunder() {
        let j = MoveJudgement::new(
            uci("a2a3"),
            Evaluation::Mate(2),
            Evaluation::Centipawns(500),
            Some(uci("h5f7")),
            vec![],
        );
        assert_eq!(j.quality, MoveQuality::Blunder);
    }

    #[test]
    fn stats_skip_unanalyzed_and_other_color() {
        let moves = vec![
            analyzed(1, Some(0)),
            analyzed(2, Some(300)),
            analyzed(3, Some(50)),
            analyzed(5, None),
            analyzed(7, Some(2_000)),
        ];
        let stats = PlayerStats::from_moves(Color::White, &moves);
        assert_eq!(stats.analyzed_moves, 3);
        assert_eq!(stats.unanalyzed_moves, 1);
        assert_eq!(stats.excellent, 1);
        assert_eq!(stats.inaccuracies, 1);
        assert_eq!(stats.blunders, 1);
        assert_eq!(stats.count(MoveQuality::Mistake), 0);
        assert!((stats.avg_cp_loss - (0.0 + 50.0 + 1_000.0) / 3.0).abs() < 1e-9);
        assert!((stats.accuracy.unwrap() - (100.0 + 70.0 + 0.0) / 3.0).abs() < 1e-9);

        let black = PlayerStats::from_moves(Color::Black, &moves);
        assert_eq!(black.analyzed_moves, 1);
        assert_eq!(black.blunders, 1);
    }

    #[test]
    fn stats_without_moves_have_no_accuracy() {
        let stats = PlayerStats::from_moves(Color::Black, &[analyzed(1, Some(0))]);
        assert_eq!(stats.analyzed_moves, 0);
        assert_eq!(stats.accuracy, None);
        assert_eq!(stats.avg_cp_loss, 0.0);
    }
}
