//! Ancillary per-game counters for the analyzed player.
//!
//! These are collected from the transcript, the board snapshots and the
//! analyzed move list, and feed the composite indexes alongside the
//! detector outputs.

use chess_core::{Board, Color};
use serde::{Deserialize, Serialize};

use crate::critical::WINNING_CP;
use crate::quality::{AnalyzedMove, MoveQuality, MAX_AGGREGATE_CP_LOSS};

/// Material balance change across one move pair that counts as a swing.
pub const MATERIAL_SWING_CP: i32 = 300;

/// Thinking-time statistics over the player's timed moves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeStats {
    pub timed_moves: usize,
    pub mean_ms: f64,
    pub max_ms: u64,
    pub std_dev_ms: f64,
    /// Share (0-1) of the player's total time spent in the opening.
    pub opening_share: Option<f64>,
}

/// Counters for one player in one game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameCounters {
    pub player: Color,
    pub player_moves: usize,
    pub analyzed_moves: usize,
    pub inaccuracies: u32,
    pub mistakes: u32,
    pub blunders: u32,
    /// Mistakes and blunders by the opponent.
    pub opponent_errors: u32,
    /// Mean centipawn loss, each loss capped.
    pub avg_cp_loss: f64,
    pub cp_loss_std_dev: f64,
    /// Mean centipawn loss over opening moves; `None` without any.
    pub opening_cp_loss: Option<f64>,
    /// Longest run of consecutive analyzed moves rated good or better.
    pub longest_clean_streak: usize,
    pub captures: u32,
    pub checks: u32,
    /// Captures on the square the opponent just captured on.
    pub trades: u32,
    pub material_swings: u32,
    /// Analyzed moves made from a won position.
    pub winning_moves: usize,
    /// Of those, moves after which the position was still won.
    pub winning_held: usize,
    pub winning_accuracy: Option<f64>,
    /// Accuracy over moves that neither capture nor check.
    pub quiet_accuracy: Option<f64>,
    pub starting_material: i32,
    pub final_material: i32,
    pub time: Option<TimeStats>,
}

impl GameCounters {
    /// Collects counters for `player`.
    ///
    /// `boards` are the snapshots P0..Pn matching `moves`.
    pub fn collect(
        player: Color,
        moves: &[AnalyzedMove],
        boards: &[Board],
        opening_cutoff: usize,
    ) -> Self {
        let own: Vec<&AnalyzedMove> = moves.iter().filter(|m| m.color() == player).collect();

        let mut counters = GameCounters {
            player,
            player_moves: own.len(),
            analyzed_moves: 0,
            inaccuracies: 0,
            mistakes: 0,
            blunders: 0,
            opponent_errors: 0,
            avg_cp_loss: 0.0,
            cp_loss_std_dev: 0.0,
            opening_cp_loss: None,
            longest_clean_streak: 0,
            captures: 0,
            checks: 0,
            trades: 0,
            material_swings: 0,
            winning_moves: 0,
            winning_held: 0,
            winning_accuracy: None,
            quiet_accuracy: None,
            starting_material: boards.first().map_or(0, Board::total_material),
            final_material: boards.last().map_or(0, Board::total_material),
            time: time_stats(&own, opening_cutoff),
        };

        counters.opponent_errors = moves
            .iter()
            .filter(|m| m.color() != player)
            .filter(|m| matches!(m.quality(), Some(MoveQuality::Mistake | MoveQuality::Blunder)))
            .count() as u32;

        let mut losses = Vec::new();
        let mut opening_losses = Vec::new();
        let mut winning_accuracies = Vec::new();
        let mut quiet_accuracies = Vec::new();
        let mut streak = 0;

        for m in &own {
            let capture = is_capture(m, boards);
            let check = m.mv.gives_check();
            counters.captures += u32::from(capture);
            counters.checks += u32::from(check);
            if capture && is_recapture(m, moves, boards) {
                counters.trades += 1;
            }

            let Some(judgement) = &m.judgement else {
                continue;
            };
            counters.analyzed_moves += 1;
            match judgement.quality {
                MoveQuality::Inaccuracy => counters.inaccuracies += 1,
                MoveQuality::Mistake => counters.mistakes += 1,
                MoveQuality::Blunder => counters.blunders += 1,
                MoveQuality::Excellent | MoveQuality::Good => {}
            }
            if judgement.quality <= MoveQuality::Good {
                streak += 1;
                counters.longest_clean_streak = counters.longest_clean_streak.max(streak);
            } else {
                streak = 0;
            }

            let loss = f64::from(judgement.centipawn_loss.min(MAX_AGGREGATE_CP_LOSS));
            losses.push(loss);
            if m.number() <= opening_cutoff {
                opening_losses.push(loss);
            }
            if judgement.evaluation_before.to_centipawns() >= WINNING_CP {
                counters.winning_moves += 1;
                if judgement.evaluation_after.to_centipawns() >= WINNING_CP {
                    counters.winning_held += 1;
                }
                winning_accuracies.push(judgement.accuracy);
            }
            if !capture && !check {
                quiet_accuracies.push(judgement.accuracy);
            }
        }

        counters.avg_cp_loss = mean(&losses).unwrap_or(0.0);
        counters.cp_loss_std_dev = std_dev(&losses).unwrap_or(0.0);
        counters.opening_cp_loss = mean(&opening_losses);
        counters.winning_accuracy = mean(&winning_accuracies);
        counters.quiet_accuracy = mean(&quiet_accuracies);
        counters.material_swings = material_swings(player, boards);
        counters
    }

    /// Share (0-1) of analyzed moves from a won position that kept it won.
    pub fn winning_hold_rate(&self) -> Option<f64> {
        (self.winning_moves > 0).then(|| self.winning_held as f64 / self.winning_moves as f64)
    }

    /// Share (0-1) of the player's moves that capture or check.
    pub fn forcing_rate(&self) -> Option<f64> {
        (self.player_moves > 0)
            .then(|| f64::from(self.captures + self.checks) / self.player_moves as f64)
    }

    /// Longest clean streak as a share (0-1) of analyzed moves.
    pub fn clean_streak_share(&self) -> Option<f64> {
        (self.analyzed_moves > 0)
            .then(|| self.longest_clean_streak as f64 / self.analyzed_moves as f64)
    }

    /// Share (0-1) of the starting material that left the board.
    pub fn material_reduction_share(&self) -> Option<f64> {
        (self.starting_material > 0).then(|| {
            f64::from(self.starting_material - self.final_material) / f64::from(self.starting_material)
        })
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    (!values.is_empty()).then(|| values.iter().sum::<f64>() / values.len() as f64)
}

/// Population standard deviation.
fn std_dev(values: &[f64]) -> Option<f64> {
    let mean = mean(values)?;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    Some(variance.sqrt())
}

/// A move captures when the opponent's material shrinks across it.
fn is_capture(m: &AnalyzedMove, boards: &[Board]) -> bool {
    let opponent = m.color().opposite();
    let before = m.number().checked_sub(1).and_then(|i| boards.get(i));
    match (before, boards.get(m.number())) {
        (Some(before), Some(after)) => after.material(opponent) < before.material(opponent),
        _ => m.mv.is_capture(),
    }
}

fn is_recapture(m: &AnalyzedMove, moves: &[AnalyzedMove], boards: &[Board]) -> bool {
    let Some(previous) = m.number().checked_sub(2).and_then(|i| moves.get(i)) else {
        return false;
    };
    previous.mv.uci.to == m.mv.uci.to && is_capture(previous, boards)
}

/// Counts the player's move pairs (own move plus reply) that shift the
/// material balance by at least [`MATERIAL_SWING_CP`].
fn material_swings(player: Color, boards: &[Board]) -> u32 {
    let balances: Vec<i32> = boards.iter().map(|b| b.material_balance(player)).collect();
    boards
        .iter()
        .enumerate()
        .filter(|(_, b)| b.side_to_move() == player)
        .filter(|(k, _)| *k + 1 < balances.len())
        .filter(|(k, _)| {
            let end = (k + 2).min(balances.len() - 1);
            (balances[end] - balances[*k]).abs() >= MATERIAL_SWING_CP
        })
        .count() as u32
}

fn time_stats(own: &[&AnalyzedMove], opening_cutoff: usize) -> Option<TimeStats> {
    let timed: Vec<(usize, u64)> = own
        .iter()
        .filter_map(|m| m.mv.time_spent_ms.map(|t| (m.number(), t)))
        .collect();
    if timed.is_empty() {
        return None;
    }
    let times: Vec<f64> = timed.iter().map(|(_, t)| *t as f64).collect();
    let total: u64 = timed.iter().map(|(_, t)| t).sum();
    let opening: u64 = timed
        .iter()
        .filter(|(n, _)| *n <= opening_cutoff)
        .map(|(_, t)| t)
        .sum();
    Some(TimeStats {
        timed_moves: timed.len(),
        mean_ms: mean(&times).unwrap_or(0.0),
        max_ms: timed.iter().map(|(_, t)| *t).max().unwrap_or(0),
        std_dev_ms: std_dev(&times).unwrap_or(0.0),
        opening_share: (total > 0).then(|| opening as f64 / total as f64),
    })
}
