//! Per-move analysis against the evaluation oracle.
//!
//! A game of n moves has n+1 positions P0..Pn. Each is evaluated exactly
//! once; the evaluation of P(i-1) serves as the "before" of move i and the
//! evaluation of Pi as its "after". Only positions whose first evaluation
//! timed out are asked for a second time, and then only as a "before".

use std::time::Duration;

use futures_util::{stream, StreamExt};
use tracing::{debug, warn};

use crate::config::AnalysisConfig;
use crate::oracle::{OracleError, OracleLease, OracleReport, SearchBudget};
use crate::quality::{AnalyzedMove, MoveJudgement};
use crate::transcript::Transcript;
use crate::AnalysisError;

/// Judges every move of a transcript.
#[derive(Debug, Clone, Copy)]
pub struct MoveAnalyzer {
    budget: SearchBudget,
    timeout: Duration,
}

impl MoveAnalyzer {
    pub fn new(budget: SearchBudget, timeout: Duration) -> Self {
        Self { budget, timeout }
    }

    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self::new(config.search.budget(), config.search.per_move_timeout())
    }

    /// Analyzes all moves, returning one entry per move in move order.
    ///
    /// With several leases, positions are evaluated concurrently (one
    /// request in flight per lease) and reassembled in order. A timed-out
    /// position leaves the move that produced it unanalyzed.
    ///
    /// The transcript is expected to be validated already.
    pub async fn analyze(
        &self,
        transcript: &Transcript,
        leases: &[OracleLease],
    ) -> Result<Vec<AnalyzedMove>, AnalysisError> {
        if leases.is_empty() {
            return Err(AnalysisError::OracleUnavailable(
                "no oracle lease supplied".to_string(),
            ));
        }
        let fens: Vec<&str> = transcript.positions().collect();
        let move_count = transcript.moves.len();

        let first_pass: Vec<Result<OracleReport, OracleError>> =
            stream::iter(fens.iter().enumerate().map(move |(k, fen)| {
                leases[k % leases.len()].evaluate(fen, self.budget, self.timeout)
            }))
            .buffered(leases.len())
            .collect()
            .await;

        let mut reports: Vec<Option<OracleReport>> = Vec::with_capacity(fens.len());
        for (k, result) in first_pass.into_iter().enumerate() {
            reports.push(self.accept(k, result)?);
        }

        let mut retried: Vec<Option<OracleReport>> = vec![None; move_count];
        for k in 0..move_count {
            if reports[k].is_none() {
                debug!(position = k, "re-requesting timed-out position as pre-move evaluation");
                let result = leases[k % leases.len()]
                    .evaluate(fens[k], self.budget, self.timeout)
                    .await;
                retried[k] = self.accept(k, result)?;
            }
        }

        let analyzed = transcript
            .moves
            .iter()
            .enumerate()
            .map(|(index, mv)| {
                let before = reports[index].as_ref().or(retried[index].as_ref());
                let after = reports[index + 1].as_ref();
                let judgement = match (before, after) {
                    (Some(before), Some(after)) => {
                        let judgement = MoveJudgement::new(
                            mv.uci,
                            before.evaluation,
                            after.evaluation.flip(),
                            before.best_move,
                            before.alternatives.clone(),
                        );
                        debug!(
                            ply = mv.ply,
                            notation = %mv.notation,
                            cp_loss = judgement.centipawn_loss,
                            quality = %judgement.quality,
                            "move classified"
                        );
                        Some(judgement)
                    }
                    _ => {
                        debug!(ply = mv.ply, notation = %mv.notation, "move left unanalyzed");
                        None
                    }
                };
                AnalyzedMove {
                    mv: mv.clone(),
                    judgement,
                }
            })
            .collect();
        Ok(analyzed)
    }

    /// Keeps a report, drops a timeout, and escalates anything else.
    fn accept(
        &self,
        position: usize,
        result: Result<OracleReport, OracleError>,
    ) -> Result<Option<OracleReport>, AnalysisError> {
        match result {
            Ok(report) => Ok(Some(report)),
            Err(OracleError::Timeout(after)) => {
                warn!(position, ?after, "position evaluation timed out");
                Ok(None)
            }
            Err(e) => Err(AnalysisError::OracleUnavailable(e.to_string())),
        }
    }
}
