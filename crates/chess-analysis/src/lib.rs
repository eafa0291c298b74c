//! Game analysis and performance scoring.
//!
//! This crate turns a finished game transcript into per-move quality
//! judgements, critical moments, tactical opportunities, phase accuracy and
//! nine composite 0-100 performance indexes, using an external
//! position-evaluation oracle such as Stockfish.
//!
//! # Overview
//!
//! - [`PositionEvaluator`] - Oracle contract; [`UciEvaluator`] speaks UCI
//! - [`OracleHandle`] / [`OracleLease`] - Single-owner queue and exclusive access
//! - [`MoveAnalyzer`] - Before/after evaluation and classification of each move
//! - [`CriticalMomentDetector`] - Material evaluation swings
//! - [`TacticalOpportunityDetector`] - Decisive best moves, found or missed
//! - [`GamePhaseSegmenter`] - Opening, middlegame and endgame accuracy
//! - [`CompositeScoreCalculator`] - The nine performance indexes
//! - [`GameReviewer`] - The whole pipeline
//!
//! # Example
//!
//! ```ignore
//! use chess_analysis::{AnalysisConfig, EngineOptions, GameReviewer, OracleHandle, UciEvaluator};
//! use tokio_util::sync::CancellationToken;
//!
//! let config = AnalysisConfig::load()?;
//! let engine = UciEvaluator::spawn("stockfish", &EngineOptions::default()).await?;
//! let oracle = OracleHandle::spawn("stockfish", engine);
//! let lease = oracle.lease().await;
//! let summary = GameReviewer::new(config)?
//!     .review(&transcript, &[lease], &CancellationToken::new())
//!     .await?;
//! println!("Precision: {:.1}", summary.scores.precision);
//! ```

pub mod analyzer;
pub mod composite;
pub mod config;
pub mod counters;
pub mod critical;
pub mod engine;
mod error;
pub mod evaluation;
pub mod oracle;
pub mod phases;
pub mod quality;
pub mod review;
pub mod tactics;
pub mod transcript;

pub use analyzer::MoveAnalyzer;
pub use composite::{
    CompositeIndex, CompositeInputs, CompositeScoreCalculator, CompositeScores, IndexBreakdown,
    ScoreTerm,
};
pub use config::{AnalysisConfig, ConfigError};
pub use counters::{GameCounters, TimeStats};
pub use critical::{CriticalMoment, CriticalMomentDetector, MomentKind};
pub use engine::{EngineError, EngineOptions, UciEvaluator};
pub use error::AnalysisError;
pub use evaluation::Evaluation;
pub use oracle::{
    Alternative, OracleError, OracleHandle, OracleLease, OracleReport, PositionEvaluator,
    SearchBudget,
};
pub use phases::{GamePhase, GamePhaseSegmenter, GamePhases, MoveRange, PhaseWindow};
pub use quality::{AnalyzedMove, MoveJudgement, MoveQuality, PlayerStats};
pub use review::{AnalysisSummary, GameReviewer};
pub use tactics::{Motif, TacticOutcome, TacticalOpportunity, TacticalOpportunityDetector};
pub use transcript::{Move, Transcript};
