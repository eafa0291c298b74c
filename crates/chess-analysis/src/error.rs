//! Errors surfaced by a game review.

use thiserror::Error;

/// Fatal errors of the analysis pipeline.
///
/// Per-position timeouts never show up here: they only mark the affected
/// move as unanalyzed.
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// The oracle cannot serve requests; the whole analysis is aborted.
    #[error("oracle unavailable: {0}")]
    OracleUnavailable(String),
    /// The transcript is inconsistent; detected before any oracle call.
    #[error("malformed transcript at ply {ply}: {reason}")]
    MalformedTranscript { ply: usize, reason: String },
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// The review was cancelled; no partial results are kept.
    #[error("analysis cancelled")]
    Cancelled,
}

impl AnalysisError {
    pub(crate) fn malformed(ply: usize, reason: impl Into<String>) -> Self {
        AnalysisError::MalformedTranscript {
            ply,
            reason: reason.into(),
        }
    }
}
