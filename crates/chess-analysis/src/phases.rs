//! Opening, middlegame and endgame windows.

use chess_core::Color;
use serde::{Deserialize, Serialize};

use crate::config::PhaseConfig;
use crate::quality::AnalyzedMove;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GamePhase {
    Opening,
    Middlegame,
    Endgame,
}

/// Inclusive range of 1-based move numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRange {
    pub first: usize,
    pub last: usize,
}

impl MoveRange {
    pub fn contains(&self, move_number: usize) -> bool {
        (self.first..=self.last).contains(&move_number)
    }
}

/// One phase of one game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseWindow {
    pub phase: GamePhase,
    /// `None` when the game never reached this phase.
    pub range: Option<MoveRange>,
    /// Mean accuracy of the player's analyzed moves in the window; `None`
    /// when there are none.
    pub accuracy: Option<f64>,
    /// Analyzed moves of the player inside the window.
    pub player_moves: usize,
}

/// The three phase windows, in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GamePhases {
    pub opening: PhaseWindow,
    pub middlegame: PhaseWindow,
    pub endgame: PhaseWindow,
}

impl GamePhases {
    pub fn windows(&self) -> [&PhaseWindow; 3] {
        [&self.opening, &self.middlegame, &self.endgame]
    }
}

/// Splits a game into phases by move number.
#[derive(Debug, Clone, Copy)]
pub struct GamePhaseSegmenter {
    opening_cutoff: usize,
    middlegame_cutoff: usize,
}

impl Default for GamePhaseSegmenter {
    fn default() -> Self {
        Self::new(&PhaseConfig::default())
    }
}

impl GamePhaseSegmenter {
    /// Cutoffs are expected to be validated (`opening <= middlegame`).
    pub fn new(config: &PhaseConfig) -> Self {
        Self {
            opening_cutoff: config.opening_cutoff,
            middlegame_cutoff: config.middlegame_cutoff.max(config.opening_cutoff),
        }
    }

    /// Window ranges for a game of `move_count` moves, clipped to its length.
    pub fn ranges(&self, move_count: usize) -> [Option<MoveRange>; 3] {
        let window = |first: usize, last: usize| {
            let last = last.min(move_count);
            (first <= last).then_some(MoveRange { first, last })
        };
        [
            window(1, self.opening_cutoff),
            window(self.opening_cutoff + 1, self.middlegame_cutoff),
            window(self.middlegame_cutoff + 1, move_count),
        ]
    }

    /// Builds the windows and the player's per-phase accuracy.
    pub fn segment(&self, moves: &[AnalyzedMove], player: Color) -> GamePhases {
        let [opening, middlegame, endgame] = self.ranges(moves.len());
        let window = |phase, range: Option<MoveRange>| {
            let accuracies: Vec<f64> = range
                .map(|r| {
                    moves
                        .iter()
                        .filter(|m| m.color() == player && r.contains(m.number()))
                        .filter_map(|m| m.accuracy())
                        .collect()
                })
                .unwrap_or_default();
            let accuracy =
                (!accuracies.is_empty()).then(|| accuracies.iter().sum::<f64>() / accuracies.len() as f64);
            PhaseWindow {
                phase,
                range,
                accuracy,
                player_moves: accuracies.len(),
            }
        };
        GamePhases {
            opening: window(GamePhase::Opening, opening),
            middlegame: window(GamePhase::Middlegame, middlegame),
            endgame: window(GamePhase::Endgame, endgame),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quality::MoveJudgement;
    use crate::transcript::Move;
    use crate::Evaluation;
    use chess_core::UciMove;

    fn game(len: usize, loss: impl Fn(usize) -> Option<u32>) -> Vec<AnalyzedMove> {
        let mv = UciMove::parse("a2a3").unwrap();
        (1..=len)
            .map(|ply| AnalyzedMove {
                mv: Move {
                    ply,
                    color: if ply % 2 == 1 { Color::White } else { Color::Black },
                    notation: "a3".to_string(),
                    uci: mv,
                    fen: String::new(),
                    time_spent_ms: None,
                },
                judgement: loss(ply).map(|l| {
                    MoveJudgement::new(
                        mv,
                        Evaluation::Centipawns(0),
                        Evaluation::Centipawns(-(l as i32)),
                        None,
                        vec![],
                    )
                }),
            })
            .collect()
    }

    #[test]
    fn short_game_has_only_an_opening() {
        let phases = GamePhaseSegmenter::default().segment(&game(8, |_| Some(0)), Color::White);
        assert_eq!(phases.opening.range, Some(MoveRange { first: 1, last: 8 }));
        assert_eq!(phases.opening.accuracy, Some(100.0));
        assert_eq!(phases.opening.player_moves, 4);
        assert_eq!(phases.middlegame.range, None);
        assert_eq!(phases.middlegame.accuracy, None);
        assert_eq!(phases.endgame.range, None);
        assert_eq!(phases.endgame.accuracy, None);
    }

    #[test]
    fn long_game_uses_default_cutoffs() {
        let ranges = GamePhaseSegmenter::default().ranges(80);
        assert_eq!(
            ranges,
            [
                Some(MoveRange { first: 1, last: 12 }),
                Some(MoveRange { first: 13, last: 35 }),
                Some(MoveRange { first: 36, last: 80 }),
            ]
        );
    }

    #[test]
    fn game_ending_at_a_cutoff() {
        let ranges = GamePhaseSegmenter::default().ranges(35);
        assert_eq!(ranges[1], Some(MoveRange { first: 13, last: 35 }));
        assert_eq!(ranges[2], None);
    }

    #[test]
    fn equal_cutoffs_leave_middlegame_empty() {
        let segmenter = GamePhaseSegmenter::new(&PhaseConfig {
            opening_cutoff: 10,
            middlegame_cutoff: 10,
        });
        let ranges = segmenter.ranges(30);
        assert_eq!(ranges[1], None);
        assert_eq!(ranges[2], Some(MoveRange { first: 11, last: 30 }));
    }

    #[test]
    fn accuracy_uses_only_the_players_analyzed_moves() {
        // White blunders at ply 3; black is perfect; ply 5 is unanalyzed.
        let moves = game(12, |ply| match ply {
            3 => Some(500),
            5 => None,
            _ => Some(0),
        });
        let phases = GamePhaseSegmenter::default().segment(&moves, Color::White);
        assert_eq!(phases.opening.player_moves, 5);
        assert_eq!(phases.opening.accuracy, Some(80.0));

        let black = GamePhaseSegmenter::default().segment(&moves, Color::Black);
        assert_eq!(black.opening.accuracy, Some(100.0));
    }

    #[test]
    fn window_with_only_unanalyzed_moves_has_no_accuracy() {
        let moves = game(14, |ply| (ply <= 12).then_some(0));
        let phases = GamePhaseSegmenter::default().segment(&moves, Color::White);
        assert_eq!(phases.middlegame.range, Some(MoveRange { first: 13, last: 14 }));
        assert_eq!(phases.middlegame.accuracy, None);
    }
}
