//! Position evaluation oracle contract and its single-owner request queue.
//!
//! The oracle (typically a UCI engine process) is stateful: setting a
//! position and searching it are coupled, so it can serve exactly one
//! request at a time. [`OracleHandle::spawn`] moves the evaluator into a
//! dedicated task that drains an mpsc queue in order. Callers never talk to
//! the evaluator directly; they take an [`OracleLease`], which grants
//! exclusive access for the duration of one job so that, for example, an
//! opponent move-selection request cannot interleave with a running game
//! analysis.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chess_core::UciMove;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, Mutex, OwnedMutexGuard};
use tracing::{debug, warn};

use crate::Evaluation;

/// Depth of the request queue in front of each evaluator.
const QUEUE_CAPACITY: usize = 64;

/// Errors reported by the oracle.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OracleError {
    /// The oracle cannot be reached (process gone, queue closed).
    #[error("oracle unavailable: {0}")]
    Unavailable(String),
    /// A single evaluation exceeded its time budget.
    #[error("evaluation timed out after {0:?}")]
    Timeout(Duration),
    /// The oracle answered with something we could not understand.
    #[error("oracle protocol error: {0}")]
    Protocol(String),
}

/// How much effort the oracle should spend on one position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchBudget {
    /// Fixed search depth in plies.
    Depth(u32),
    /// Fixed thinking time in milliseconds.
    MoveTime(u64),
}

impl SearchBudget {
    /// Arguments for a UCI `go` command.
    pub fn to_go_args(self) -> String {
        match self {
            SearchBudget::Depth(d) => format!("depth {}", d),
            SearchBudget::MoveTime(ms) => format!("movetime {}", ms),
        }
    }
}

/// A ranked alternative continuation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alternative {
    #[serde(rename = "move")]
    pub mv: UciMove,
    /// Evaluation from the side to move's perspective.
    pub evaluation: Evaluation,
}

/// Answer to a single evaluation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleReport {
    /// Evaluation of the top line, from the side to move's perspective.
    pub evaluation: Evaluation,
    /// Preferred move; `None` when the side to move has no legal move.
    pub best_move: Option<UciMove>,
    /// Principal variation starting with `best_move`.
    pub principal_variation: Vec<UciMove>,
    /// Lines ranked 2..N, best first.
    pub alternatives: Vec<Alternative>,
    /// Depth reached by the search.
    pub depth: u32,
}

impl OracleReport {
    /// First alternative whose move differs from the best move.
    pub fn next_best_distinct(&self) -> Option<&Alternative> {
        self.alternatives
            .iter()
            .find(|alt| Some(alt.mv) != self.best_move)
    }
}

/// Request/response boundary to the position-evaluation oracle.
///
/// Implementations are owned by exactly one queue task, so they may keep
/// mutable state between calls.
pub trait PositionEvaluator: Send + 'static {
    /// Evaluates the position given in FEN notation.
    fn evaluate(
        &mut self,
        fen: &str,
        budget: SearchBudget,
    ) -> impl Future<Output = Result<OracleReport, OracleError>> + Send;

    /// Brings the evaluator back to a clean state after an evaluation was
    /// abandoned on timeout.
    fn recover(&mut self) -> impl Future<Output = Result<(), OracleError>> + Send {
        async { Ok(()) }
    }
}

struct EvalRequest {
    fen: String,
    budget: SearchBudget,
    timeout: Duration,
    reply: oneshot::Sender<Result<OracleReport, OracleError>>,
}

/// Cloneable handle to an evaluator running behind its request queue.
#[derive(Clone)]
pub struct OracleHandle {
    name: Arc<str>,
    tx: mpsc::Sender<EvalRequest>,
    gate: Arc<Mutex<()>>,
}

impl OracleHandle {
    /// Moves `evaluator` into its own task and returns a handle to it.
    ///
    /// Must be called from within a tokio runtime. The task ends when every
    /// handle and lease has been dropped.
    pub fn spawn<E: PositionEvaluator>(name: impl Into<String>, evaluator: E) -> Self {
        let name: Arc<str> = Arc::from(name.into());
        let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
        tokio::spawn(run_queue(Arc::clone(&name), evaluator, rx));
        Self {
            name,
            tx,
            gate: Arc::new(Mutex::new(())),
        }
    }

    /// Name given at spawn time.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Waits for exclusive access to this oracle.
    pub async fn lease(&self) -> OracleLease {
        let guard = Arc::clone(&self.gate).lock_owned().await;
        debug!(oracle = %self.name, "lease acquired");
        OracleLease {
            name: Arc::clone(&self.name),
            tx: self.tx.clone(),
            _guard: guard,
        }
    }

    /// Takes the lease only if nobody else holds it.
    pub fn try_lease(&self) -> Option<OracleLease> {
        let guard = Arc::clone(&self.gate).try_lock_owned().ok()?;
        Some(OracleLease {
            name: Arc::clone(&self.name),
            tx: self.tx.clone(),
            _guard: guard,
        })
    }
}

/// Exclusive, scoped permission to send requests to one oracle.
///
/// Released on drop.
pub struct OracleLease {
    name: Arc<str>,
    tx: mpsc::Sender<EvalRequest>,
    _guard: OwnedMutexGuard<()>,
}

impl OracleLease {
    /// Name of the oracle this lease belongs to.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Evaluates one position, giving up after `timeout`.
    ///
    /// Requests sent through the same lease are answered in the order they
    /// were sent.
    pub async fn evaluate(
        &self,
        fen: &str,
        budget: SearchBudget,
        timeout: Duration,
    ) -> Result<OracleReport, OracleError> {
        let (reply, rx) = oneshot::channel();
        let request = EvalRequest {
            fen: fen.to_string(),
            budget,
            timeout,
            reply,
        };
        self.tx
            .send(request)
            .await
            .map_err(|_| OracleError::Unavailable(format!("{}: queue closed", self.name)))?;
        rx.await.map_err(|_| {
            OracleError::Unavailable(format!("{}: request dropped by queue", self.name))
        })?
    }
}

async fn run_queue<E: PositionEvaluator>(
    name: Arc<str>,
    mut evaluator: E,
    mut rx: mpsc::Receiver<EvalRequest>,
) {
    while let Some(request) = rx.recv().await {
        let result = match tokio::time::timeout(
            request.timeout,
            evaluator.evaluate(&request.fen, request.budget),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => {
                warn!(oracle = %name, fen = %request.fen, "evaluation timed out, recovering");
                match tokio::time::timeout(request.timeout, evaluator.recover()).await {
                    Ok(Ok(())) => Err(OracleError::Timeout(request.timeout)),
                    Ok(Err(e)) => Err(e),
                    Err(_) => Err(OracleError::Unavailable(format!(
                        "{}: unresponsive after timeout",
                        name
                    ))),
                }
            }
        };
        // The requester may have given up (cancelled job); that is fine.
        let _ = request.reply.send(result);
    }
    debug!(oracle = %name, "evaluation queue closed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingOracle {
        calls: Arc<AtomicUsize>,
        delay: Duration,
    }

    impl PositionEvaluator for CountingOracle {
        async fn evaluate(
            &mut self,
            fen: &str,
            _budget: SearchBudget,
        ) -> Result<OracleReport, OracleError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            if fen == "dead" {
                return Err(OracleError::Unavailable("dead".to_string()));
            }
            Ok(OracleReport {
                evaluation: Evaluation::Centipawns(n as i32),
                best_move: UciMove::parse("e2e4").ok(),
                principal_variation: vec![],
                alternatives: vec![],
                depth: 1,
            })
        }
    }

    fn counting(delay: Duration) -> (OracleHandle, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let oracle = CountingOracle {
            calls: Arc::clone(&calls),
            delay,
        };
        (OracleHandle::spawn("counting", oracle), calls)
    }

    const BUDGET: SearchBudget = SearchBudget::Depth(4);

    #[test]
    fn go_args() {
        assert_eq!(SearchBudget::Depth(12).to_go_args(), "depth 12");
        assert_eq!(SearchBudget::MoveTime(250).to_go_args(), "movetime 250");
    }

    #[test]
    fn next_best_distinct_skips_duplicate_of_best() {
        let e4 = UciMove::parse("e2e4").unwrap();
        let d4 = UciMove::parse("d2d4").unwrap();
        let report = OracleReport {
            evaluation: Evaluation::Centipawns(30),
            best_move: Some(e4),
            principal_variation: vec![e4],
            alternatives: vec![
                Alternative {
                    mv: e4,
                    evaluation: Evaluation::Centipawns(30),
                },
                Alternative {
                    mv: d4,
                    evaluation: Evaluation::Centipawns(25),
                },
            ],
            depth: 10,
        };
        assert_eq!(report.next_best_distinct().map(|a| a.mv), Some(d4));
    }

    #[tokio::test]
    async fn requests_are_answered_in_order() {
        let (handle, calls) = counting(Duration::from_millis(1));
        let lease = handle.lease().await;
        for expected in 0..5 {
            let report = lease
                .evaluate("pos", BUDGET, Duration::from_secs(1))
                .await
                .unwrap();
            assert_eq!(report.evaluation, Evaluation::Centipawns(expected));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn timeout_is_reported_and_queue_keeps_serving() {
        let (handle, _calls) = counting(Duration::from_millis(100));
        let lease = handle.lease().await;
        let result = lease
            .evaluate("pos", BUDGET, Duration::from_millis(5))
            .await;
        assert_eq!(result, Err(OracleError::Timeout(Duration::from_millis(5))));

        let result = lease.evaluate("pos", BUDGET, Duration::from_secs(2)).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn unavailable_is_passed_through() {
        let (handle, _calls) = counting(Duration::ZERO);
        let lease = handle.lease().await;
        let result = lease.evaluate("dead", BUDGET, Duration::from_secs(1)).await;
        assert!(matches!(result, Err(OracleError::Unavailable(_))));
    }

    #[tokio::test]
    async fn lease_is_exclusive_until_dropped() {
        let (handle, _calls) = counting(Duration::ZERO);
        let lease = handle.lease().await;
        assert_eq!(lease.name(), "counting");
        assert!(handle.try_lease().is_none());
        drop(lease);
        assert!(handle.try_lease().is_some());
    }
}
