//! End-to-end review of one completed game.

use std::time::Instant;

use chess_core::{Board, Color};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::analyzer::MoveAnalyzer;
use crate::composite::{CompositeInputs, CompositeScoreCalculator, CompositeScores, IndexBreakdown};
use crate::config::AnalysisConfig;
use crate::counters::GameCounters;
use crate::critical::{CriticalMoment, CriticalMomentDetector};
use crate::oracle::OracleLease;
use crate::phases::{GamePhaseSegmenter, GamePhases};
use crate::quality::{AnalyzedMove, PlayerStats};
use crate::tactics::{TacticalOpportunity, TacticalOpportunityDetector};
use crate::transcript::Transcript;
use crate::AnalysisError;

/// Everything learned about one game, for one analyzed player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSummary {
    pub game_id: String,
    pub player: Color,
    pub move_count: usize,
    /// Moves (of either side) the oracle could not evaluate.
    pub unanalyzed_moves: usize,
    pub moves: Vec<AnalyzedMove>,
    pub white_stats: PlayerStats,
    pub black_stats: PlayerStats,
    pub critical_moments: Vec<CriticalMoment>,
    pub tactical_opportunities: Vec<TacticalOpportunity>,
    pub phases: GamePhases,
    pub counters: GameCounters,
    pub scores: CompositeScores,
    pub breakdown: Vec<IndexBreakdown>,
}

impl AnalysisSummary {
    /// Statistics of the analyzed player.
    pub fn player_stats(&self) -> &PlayerStats {
        match self.player {
            Color::White => &self.white_stats,
            Color::Black => &self.black_stats,
        }
    }
}

/// Runs the whole pipeline for a configured player.
#[derive(Debug, Clone)]
pub struct GameReviewer {
    config: AnalysisConfig,
    analyzer: MoveAnalyzer,
    critical: CriticalMomentDetector,
    tactics: TacticalOpportunityDetector,
    phases: GamePhaseSegmenter,
    calculator: CompositeScoreCalculator,
}

impl GameReviewer {
    pub fn new(config: AnalysisConfig) -> Result<Self, AnalysisError> {
        config
            .validate()
            .map_err(|e| AnalysisError::InvalidConfig(e.to_string()))?;
        let thresholds = &config.thresholds;
        Ok(Self {
            analyzer: MoveAnalyzer::from_config(&config),
            critical: CriticalMomentDetector::new(thresholds.critical_swing_cp),
            tactics: TacticalOpportunityDetector::new(
                thresholds.decisive_gap_cp,
                thresholds.found_tolerance_cp,
            ),
            phases: GamePhaseSegmenter::new(&config.phases),
            calculator: CompositeScoreCalculator,
            config,
        })
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Validates, analyzes and scores a game.
    ///
    /// The transcript is checked before any oracle request. On cancellation
    /// every computed result is dropped and [`AnalysisError::Cancelled`] is
    /// returned.
    pub async fn review(
        &self,
        transcript: &Transcript,
        leases: &[OracleLease],
        cancel: &CancellationToken,
    ) -> Result<AnalysisSummary, AnalysisError> {
        let boards = transcript.validate()?;
        let started = Instant::now();
        info!(
            game_id = %transcript.game_id,
            moves = transcript.len(),
            player = %self.config.player,
            oracles = leases.len(),
            "starting game review"
        );

        let moves = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(AnalysisError::Cancelled),
            result = self.analyzer.analyze(transcript, leases) => result?,
        };

        let summary = self.summarize(&transcript.game_id, moves, &boards);
        info!(
            game_id = %summary.game_id,
            elapsed_ms = started.elapsed().as_millis() as u64,
            unanalyzed = summary.unanalyzed_moves,
            precision = summary.scores.precision,
            "game review finished"
        );
        Ok(summary)
    }

    /// Derives everything else from the analyzed moves. Pure and
    /// deterministic.
    pub fn summarize(&self, game_id: &str, moves: Vec<AnalyzedMove>, boards: &[Board]) -> AnalysisSummary {
        let player = self.config.player;
        let white_stats = PlayerStats::from_moves(Color::White, &moves);
        let black_stats = PlayerStats::from_moves(Color::Black, &moves);
        let critical_moments = self.critical.detect(&moves);
        let tactical_opportunities = self.tactics.detect(&moves, boards);
        let phases = self.phases.segment(&moves, player);
        let counters =
            GameCounters::collect(player, &moves, boards, self.config.phases.opening_cutoff);

        let stats = match player {
            Color::White => &white_stats,
            Color::Black => &black_stats,
        };
        let inputs = CompositeInputs::gather(
            player,
            stats,
            &phases,
            &counters,
            &critical_moments,
            &tactical_opportunities,
        );
        let breakdown = self.calculator.breakdown(&inputs);
        let scores = CompositeScores::from_breakdown(&breakdown);

        AnalysisSummary {
            game_id: game_id.to_string(),
            player,
            move_count: moves.len(),
            unanalyzed_moves: moves.iter().filter(|m| !m.is_analyzed()).count(),
            moves,
            white_stats,
            black_stats,
            critical_moments,
            tactical_opportunities,
            phases,
            counters,
            scores,
            breakdown,
        }
    }
}
