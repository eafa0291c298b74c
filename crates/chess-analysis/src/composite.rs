//! Composite 0-100 performance indexes.
//!
//! Each index is a weighted sum of named terms. Precision follows a fixed
//! formula over raw terms; the other eight clamp every term to 0-100
//! before weighting. All results are clamped to 0-100, and every index
//! keeps its terms so the headline number can be audited.

use chess_core::Color;
use serde::{Deserialize, Serialize};

use crate::counters::GameCounters;
use crate::critical::{CriticalMoment, MomentKind};
use crate::phases::GamePhases;
use crate::quality::PlayerStats;
use crate::tactics::{TacticOutcome, TacticalOpportunity};

/// Stand-in for a rate that is undefined in this game.
pub const NEUTRAL_RATE: f64 = 50.0;

pub const PRECISION_WEIGHTS: [f64; 6] = [0.30, 0.25, 0.20, 0.10, 0.10, 0.05];
pub const TACTICAL_DANGER_WEIGHTS: [f64; 4] = [0.40, 0.20, 0.20, 0.20];
pub const STABILITY_WEIGHTS: [f64; 4] = [0.30, 0.30, 0.20, 0.20];
pub const CONVERSION_WEIGHTS: [f64; 3] = [0.40, 0.30, 0.30];
pub const PREPARATION_WEIGHTS: [f64; 3] = [0.50, 0.30, 0.20];
pub const POSITIONAL_WEIGHTS: [f64; 3] = [0.35, 0.35, 0.30];
pub const AGGRESSION_WEIGHTS: [f64; 4] = [0.35, 0.25, 0.20, 0.20];
pub const SIMPLIFICATION_WEIGHTS: [f64; 3] = [0.40, 0.30, 0.30];
pub const TRAINING_TRANSFER_WEIGHTS: [f64; 3] = [0.40, 0.30, 0.30];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompositeIndex {
    Precision,
    TacticalDanger,
    Stability,
    Conversion,
    Preparation,
    Positional,
    Aggression,
    Simplification,
    TrainingTransfer,
}

impl CompositeIndex {
    pub const ALL: [CompositeIndex; 9] = [
        CompositeIndex::Precision,
        CompositeIndex::TacticalDanger,
        CompositeIndex::Stability,
        CompositeIndex::Conversion,
        CompositeIndex::Preparation,
        CompositeIndex::Positional,
        CompositeIndex::Aggression,
        CompositeIndex::Simplification,
        CompositeIndex::TrainingTransfer,
    ];
}

/// The nine indexes, each in 0-100.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CompositeScores {
    pub precision: f64,
    pub tactical_danger: f64,
    pub stability: f64,
    pub conversion: f64,
    pub preparation: f64,
    pub positional: f64,
    pub aggression: f64,
    pub simplification: f64,
    pub training_transfer: f64,
}

impl CompositeScores {
    pub fn get(&self, index: CompositeIndex) -> f64 {
        match index {
            CompositeIndex::Precision => self.precision,
            CompositeIndex::TacticalDanger => self.tactical_danger,
            CompositeIndex::Stability => self.stability,
            CompositeIndex::Conversion => self.conversion,
            CompositeIndex::Preparation => self.preparation,
            CompositeIndex::Positional => self.positional,
            CompositeIndex::Aggression => self.aggression,
            CompositeIndex::Simplification => self.simplification,
            CompositeIndex::TrainingTransfer => self.training_transfer,
        }
    }

    fn set(&mut self, index: CompositeIndex, value: f64) {
        let slot = match index {
            CompositeIndex::Precision => &mut self.precision,
            CompositeIndex::TacticalDanger => &mut self.tactical_danger,
            CompositeIndex::Stability => &mut self.stability,
            CompositeIndex::Conversion => &mut self.conversion,
            CompositeIndex::Preparation => &mut self.preparation,
            CompositeIndex::Positional => &mut self.positional,
            CompositeIndex::Aggression => &mut self.aggression,
            CompositeIndex::Simplification => &mut self.simplification,
            CompositeIndex::TrainingTransfer => &mut self.training_transfer,
        };
        *slot = value;
    }

    /// Collects the headline numbers of a full breakdown.
    pub fn from_breakdown(breakdown: &[IndexBreakdown]) -> Self {
        let mut scores = CompositeScores::default();
        for entry in breakdown {
            scores.set(entry.index, entry.score);
        }
        scores
    }
}

/// One weighted ingredient of an index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreTerm {
    pub label: String,
    pub weight: f64,
    /// Value that entered the weighted sum.
    pub value: f64,
}

/// An index with the terms that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexBreakdown {
    pub index: CompositeIndex,
    pub terms: Vec<ScoreTerm>,
    pub score: f64,
}

/// Everything the calculator reads, gathered from one game's analysis.
///
/// Optional fields are undefined for the game (no opportunities, never
/// winning, no time data) and fall back to a neutral value.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CompositeInputs {
    pub overall_accuracy: Option<f64>,
    pub opening_accuracy: Option<f64>,
    pub middlegame_accuracy: Option<f64>,
    pub endgame_accuracy: Option<f64>,
    pub avg_cp_loss: f64,
    pub cp_loss_std_dev: f64,
    pub blunders: u32,
    pub mistakes: u32,
    pub inaccuracies: u32,
    /// Share (0-1).
    pub clean_streak_share: Option<f64>,
    /// Share (0-1) of tactical opportunities found.
    pub tactics_found_rate: Option<f64>,
    pub brilliancies: u32,
    pub missed_wins: u32,
    pub favourable_moments: u32,
    /// Share (0-1) of own moves that capture or check.
    pub forcing_rate: Option<f64>,
    pub opponent_errors: u32,
    pub checks: u32,
    pub trades: u32,
    pub material_swings: u32,
    /// Share (0-1).
    pub winning_hold_rate: Option<f64>,
    pub winning_accuracy: Option<f64>,
    pub opening_cp_loss: Option<f64>,
    /// Share (0-1) of own time spent in the opening.
    pub opening_time_share: Option<f64>,
    pub quiet_accuracy: Option<f64>,
    /// Share (0-1) of starting material gone by the end.
    pub material_reduction_share: Option<f64>,
}

impl CompositeInputs {
    pub fn gather(
        player: Color,
        stats: &PlayerStats,
        phases: &GamePhases,
        counters: &GameCounters,
        moments: &[CriticalMoment],
        tactics: &[TacticalOpportunity],
    ) -> Self {
        let own_moments = || moments.iter().filter(move |m| m.color == player);
        let own_tactics: Vec<&TacticalOpportunity> =
            tactics.iter().filter(|t| t.color == player).collect();
        let found = own_tactics
            .iter()
            .filter(|t| t.outcome == TacticOutcome::Found)
            .count();

        CompositeInputs {
            overall_accuracy: stats.accuracy,
            opening_accuracy: phases.opening.accuracy,
            middlegame_accuracy: phases.middlegame.accuracy,
            endgame_accuracy: phases.endgame.accuracy,
            avg_cp_loss: stats.avg_cp_loss,
            cp_loss_std_dev: counters.cp_loss_std_dev,
            blunders: stats.blunders,
            mistakes: stats.mistakes,
            inaccuracies: stats.inaccuracies,
            clean_streak_share: counters.clean_streak_share(),
            tactics_found_rate: (!own_tactics.is_empty())
                .then(|| found as f64 / own_tactics.len() as f64),
            brilliancies: own_moments()
                .filter(|m| m.kind == MomentKind::Brilliant)
                .count() as u32,
            missed_wins: own_moments()
                .filter(|m| m.kind == MomentKind::MissedWin)
                .count() as u32,
            favourable_moments: moments.iter().filter(|m| m.favours(player)).count() as u32,
            forcing_rate: counters.forcing_rate(),
            opponent_errors: counters.opponent_errors,
            checks: counters.checks,
            trades: counters.trades,
            material_swings: counters.material_swings,
            winning_hold_rate: counters.winning_hold_rate(),
            winning_accuracy: counters.winning_accuracy,
            opening_cp_loss: counters.opening_cp_loss,
            opening_time_share: counters.time.as_ref().and_then(|t| t.opening_share),
            quiet_accuracy: counters.quiet_accuracy,
            material_reduction_share: counters.material_reduction_share(),
        }
    }
}

/// Clamps to 0-100; NaN becomes 0.
pub fn clamp_score(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 100.0)
    }
}

fn rate_or_neutral(share: Option<f64>, scale: f64) -> f64 {
    share.map_or(NEUTRAL_RATE, |s| s * scale)
}

fn weighted(index: CompositeIndex, weights: &[f64], parts: Vec<(&str, f64)>, clamp_terms: bool) -> IndexBreakdown {
    let terms: Vec<ScoreTerm> = weights
        .iter()
        .zip(parts)
        .map(|(weight, (label, value))| ScoreTerm {
            label: label.to_string(),
            weight: *weight,
            value: if clamp_terms { clamp_score(value) } else { value },
        })
        .collect();
    let score = clamp_score(terms.iter().map(|t| t.weight * t.value).sum());
    IndexBreakdown {
        index,
        terms,
        score,
    }
}

/// Turns gathered inputs into the nine indexes.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompositeScoreCalculator;

impl CompositeScoreCalculator {
    pub fn compute(&self, inputs: &CompositeInputs) -> CompositeScores {
        CompositeScores::from_breakdown(&self.breakdown(inputs))
    }

    /// All nine indexes with their terms, in [`CompositeIndex::ALL`] order.
    pub fn breakdown(&self, i: &CompositeInputs) -> Vec<IndexBreakdown> {
        let overall = i.overall_accuracy.unwrap_or(NEUTRAL_RATE);
        let or_overall = |accuracy: Option<f64>| accuracy.unwrap_or(overall);
        let cpl_score = 100.0 - i.avg_cp_loss / 2.0;

        vec![
            weighted(
                CompositeIndex::Precision,
                &PRECISION_WEIGHTS,
                vec![
                    ("overall accuracy", overall),
                    ("100 - blunders x10", 100.0 - f64::from(i.blunders) * 10.0),
                    ("100 - avg cpl / 2", cpl_score),
                    ("opening accuracy", or_overall(i.opening_accuracy)),
                    ("middlegame accuracy", or_overall(i.middlegame_accuracy)),
                    ("endgame accuracy", or_overall(i.endgame_accuracy)),
                ],
                false,
            ),
            weighted(
                CompositeIndex::TacticalDanger,
                &TACTICAL_DANGER_WEIGHTS,
                vec![
                    ("tactics found rate", rate_or_neutral(i.tactics_found_rate, 100.0)),
                    ("brilliancies x25", f64::from(i.brilliancies) * 25.0),
                    ("forcing-move rate x200", rate_or_neutral(i.forcing_rate, 200.0)),
                    ("opponent errors x20", f64::from(i.opponent_errors) * 20.0),
                ],
                true,
            ),
            weighted(
                CompositeIndex::Stability,
                &STABILITY_WEIGHTS,
                vec![
                    ("100 - cpl std-dev / 2", 100.0 - i.cp_loss_std_dev / 2.0),
                    ("100 - blunders x20", 100.0 - f64::from(i.blunders) * 20.0),
                    ("100 - mistakes x10", 100.0 - f64::from(i.mistakes) * 10.0),
                    ("longest clean streak share", rate_or_neutral(i.clean_streak_share, 100.0)),
                ],
                true,
            ),
            weighted(
                CompositeIndex::Conversion,
                &CONVERSION_WEIGHTS,
                vec![
                    ("winning-position hold rate", rate_or_neutral(i.winning_hold_rate, 100.0)),
                    ("100 - missed wins x25", 100.0 - f64::from(i.missed_wins) * 25.0),
                    ("accuracy while winning", or_overall(i.winning_accuracy)),
                ],
                true,
            ),
            weighted(
                CompositeIndex::Preparation,
                &PREPARATION_WEIGHTS,
                vec![
                    ("opening accuracy", or_overall(i.opening_accuracy)),
                    (
                        "100 - opening cpl / 2",
                        100.0 - i.opening_cp_loss.unwrap_or(i.avg_cp_loss) / 2.0,
                    ),
                    (
                        "opening tempo",
                        i.opening_time_share
                            .map_or(NEUTRAL_RATE, |share| 100.0 * (1.0 - share)),
                    ),
                ],
                true,
            ),
            weighted(
                CompositeIndex::Positional,
                &POSITIONAL_WEIGHTS,
                vec![
                    ("middlegame accuracy", or_overall(i.middlegame_accuracy)),
                    ("quiet-move accuracy", or_overall(i.quiet_accuracy)),
                    ("100 - inaccuracies x8", 100.0 - f64::from(i.inaccuracies) * 8.0),
                ],
                true,
            ),
            weighted(
                CompositeIndex::Aggression,
                &AGGRESSION_WEIGHTS,
                vec![
                    ("forcing-move rate x200", rate_or_neutral(i.forcing_rate, 200.0)),
                    ("material swings x20", f64::from(i.material_swings) * 20.0),
                    ("favourable critical moments x20", f64::from(i.favourable_moments) * 20.0),
                    ("checks x15", f64::from(i.checks) * 15.0),
                ],
                true,
            ),
            weighted(
                CompositeIndex::Simplification,
                &SIMPLIFICATION_WEIGHTS,
                vec![
                    ("trades x10", f64::from(i.trades) * 10.0),
                    ("endgame accuracy", or_overall(i.endgame_accuracy)),
                    (
                        "material reduction share",
                        rate_or_neutral(i.material_reduction_share, 100.0),
                    ),
                ],
                true,
            ),
            weighted(
                CompositeIndex::TrainingTransfer,
                &TRAINING_TRANSFER_WEIGHTS,
                vec![
                    ("100 - phase accuracy spread", 100.0 - phase_spread(i)),
                    ("overall accuracy", overall),
                    ("100 - avg cpl / 2", cpl_score),
                ],
                true,
            ),
        ]
    }
}

/// Difference between the best and worst defined phase accuracy.
fn phase_spread(i: &CompositeInputs) -> f64 {
    let defined: Vec<f64> = [i.opening_accuracy, i.middlegame_accuracy, i.endgame_accuracy]
        .into_iter()
        .flatten()
        .collect();
    if defined.len() < 2 {
        return 0.0;
    }
    let max = defined.iter().copied().fold(f64::MIN, f64::max);
    let min = defined.iter().copied().fold(f64::MAX, f64::min);
    max - min
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn perfect() -> CompositeInputs {
        CompositeInputs {
            overall_accuracy: Some(100.0),
            opening_accuracy: Some(100.0),
            middlegame_accuracy: Some(100.0),
            endgame_accuracy: Some(100.0),
            ..CompositeInputs::default()
        }
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn weights_sum_to_one() {
        for weights in [
            &PRECISION_WEIGHTS[..],
            &TACTICAL_DANGER_WEIGHTS[..],
            &STABILITY_WEIGHTS[..],
            &CONVERSION_WEIGHTS[..],
            &PREPARATION_WEIGHTS[..],
            &POSITIONAL_WEIGHTS[..],
            &AGGRESSION_WEIGHTS[..],
            &SIMPLIFICATION_WEIGHTS[..],
            &TRAINING_TRANSFER_WEIGHTS[..],
        ] {
            assert!(approx(weights.iter().sum::<f64>(), 1.0));
            assert!(weights.iter().all(|w| *w >= 0.0));
        }
    }

    #[test]
    fn perfect_game_has_full_precision() {
        let scores = CompositeScoreCalculator.compute(&perfect());
        assert!(approx(scores.precision, 100.0));
        assert!(approx(scores.training_transfer, 100.0));
    }

    #[test]
    fn precision_formula() {
        let inputs = CompositeInputs {
            overall_accuracy: Some(80.0),
            opening_accuracy: Some(90.0),
            middlegame_accuracy: Some(70.0),
            endgame_accuracy: None,
            blunders: 2,
            avg_cp_loss: 40.0,
            ..CompositeInputs::default()
        };
        let expected = 80.0 * 0.30 + 80.0 * 0.25 + 80.0 * 0.20 + 90.0 * 0.10 + 70.0 * 0.10 + 80.0 * 0.05;
        assert!(approx(CompositeScoreCalculator.compute(&inputs).precision, expected));
    }

    #[test]
    fn precision_clamps_only_the_result() {
        let inputs = CompositeInputs {
            blunders: 30,
            avg_cp_loss: 1_000.0,
            overall_accuracy: Some(0.0),
            ..CompositeInputs::default()
        };
        let breakdown = CompositeScoreCalculator.breakdown(&inputs);
        assert_eq!(breakdown[0].index, CompositeIndex::Precision);
        assert!(approx(breakdown[0].terms[1].value, -200.0));
        assert_eq!(breakdown[0].score, 0.0);
    }

    #[test]
    fn undefined_rates_are_neutral() {
        let breakdown = CompositeScoreCalculator.breakdown(&perfect());
        let tactical = &breakdown[1];
        assert_eq!(tactical.index, CompositeIndex::TacticalDanger);
        assert!(approx(tactical.terms[0].value, NEUTRAL_RATE));
        let conversion = &breakdown[3];
        assert!(approx(conversion.terms[0].value, NEUTRAL_RATE));
        assert!(approx(conversion.terms[2].value, 100.0));
    }

    #[test]
    fn other_indexes_clamp_each_term() {
        let inputs = CompositeInputs {
            checks: 40,
            ..perfect()
        };
        let aggression = &CompositeScoreCalculator.breakdown(&inputs)[6];
        assert_eq!(aggression.index, CompositeIndex::Aggression);
        assert_eq!(aggression.terms[3].value, 100.0);
    }

    #[test]
    fn phase_spread_needs_two_phases() {
        assert_eq!(phase_spread(&CompositeInputs::default()), 0.0);
        let inputs = CompositeInputs {
            opening_accuracy: Some(95.0),
            endgame_accuracy: Some(60.0),
            ..CompositeInputs::default()
        };
        assert!(approx(phase_spread(&inputs), 35.0));
    }

    #[test]
    fn breakdown_covers_every_index_in_order() {
        let breakdown = CompositeScoreCalculator.breakdown(&perfect());
        let order: Vec<_> = breakdown.iter().map(|b| b.index).collect();
        assert_eq!(order, CompositeIndex::ALL.to_vec());
        let scores = CompositeScores::from_breakdown(&breakdown);
        for entry in &breakdown {
            assert_eq!(scores.get(entry.index), entry.score);
        }
    }

    #[test]
    fn clamp_score_handles_nan() {
        assert_eq!(clamp_score(f64::NAN), 0.0);
        assert_eq!(clamp_score(f64::INFINITY), 100.0);
        assert_eq!(clamp_score(-3.0), 0.0);
    }

    fn any_share() -> impl Strategy<Value = Option<f64>> {
        proptest::option::of(prop_oneof![-10.0..10.0f64, Just(f64::NAN), Just(f64::INFINITY)])
    }

    fn any_accuracy() -> impl Strategy<Value = Option<f64>> {
        proptest::option::of(prop_oneof![-1e6..1e6f64, Just(f64::NAN), Just(f64::NEG_INFINITY)])
    }

    prop_compose! {
        fn any_inputs()(
            accuracies in proptest::collection::vec(any_accuracy(), 7),
            shares in proptest::collection::vec(any_share(), 6),
            cpl in prop_oneof![-1e9..1e9f64, Just(f64::NAN)],
            std_dev in -1e9..1e9f64,
            counts in proptest::collection::vec(any::<u32>(), 10),
            opening_cp_loss in any_accuracy(),
        ) -> CompositeInputs {
            CompositeInputs {
                overall_accuracy: accuracies[0],
                opening_accuracy: accuracies[1],
                middlegame_accuracy: accuracies[2],
                endgame_accuracy: accuracies[3],
                winning_accuracy: accuracies[4],
                quiet_accuracy: accuracies[5],
                opening_cp_loss: opening_cp_loss.or(accuracies[6]),
                avg_cp_loss: cpl,
                cp_loss_std_dev: std_dev,
                blunders: counts[0],
                mistakes: counts[1],
                inaccuracies: counts[2],
                brilliancies: counts[3],
                missed_wins: counts[4],
                favourable_moments: counts[5],
                opponent_errors: counts[6],
                checks: counts[7],
                trades: counts[8],
                material_swings: counts[9],
                clean_streak_share: shares[0],
                tactics_found_rate: shares[1],
                forcing_rate: shares[2],
                winning_hold_rate: shares[3],
                opening_time_share: shares[4],
                material_reduction_share: shares[5],
            }
        }
    }

    proptest! {
        #[test]
        fn every_index_stays_in_range(inputs in any_inputs()) {
            let scores = CompositeScoreCalculator.compute(&inputs);
            for index in CompositeIndex::ALL {
                let value = scores.get(index);
                prop_assert!((0.0..=100.0).contains(&value), "{:?} = {}", index, value);
            }
        }

        #[test]
        fn fewer_blunders_never_lower_precision(
            blunders in 0u32..20,
            accuracy in 0.0..100.0f64,
            cpl in 0.0..500.0f64,
        ) {
            let worse = CompositeInputs {
                overall_accuracy: Some(accuracy),
                blunders: blunders + 1,
                avg_cp_loss: cpl,
                ..CompositeInputs::default()
            };
            let better = CompositeInputs { blunders, ..worse.clone() };
            let calc = CompositeScoreCalculator;
            prop_assert!(calc.compute(&better).precision >= calc.compute(&worse).precision);
        }
    }
}
