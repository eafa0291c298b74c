//! Shared fixtures: a scripted oracle and generated transcripts.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chess_analysis::{
    Alternative, Evaluation, Move, OracleError, OracleReport, PositionEvaluator, SearchBudget,
    Transcript,
};
use chess_core::{Board, Color, UciMove};

/// Oracle answering from a FEN-keyed script.
///
/// Unknown positions evaluate to 0.00 with no best move. Positions listed
/// in `slow_once` hang on their first request only.
#[derive(Default)]
pub struct StubOracle {
    pub reports: HashMap<String, OracleReport>,
    pub slow_once: HashSet<String>,
    pub unavailable: HashSet<String>,
    /// Adds a small, varying delay to every answer.
    pub jitter: bool,
    pub calls: Arc<Mutex<Vec<String>>>,
}

impl StubOracle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared log of every FEN requested, in request order.
    pub fn call_log(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.calls)
    }

    pub fn script(mut self, fen: &str, report: OracleReport) -> Self {
        self.reports.insert(fen.to_string(), report);
        self
    }

    pub fn slow_once(mut self, fen: &str) -> Self {
        self.slow_once.insert(fen.to_string());
        self
    }

    pub fn unavailable_at(mut self, fen: &str) -> Self {
        self.unavailable.insert(fen.to_string());
        self
    }

    pub fn with_jitter(mut self) -> Self {
        self.jitter = true;
        self
    }
}

impl PositionEvaluator for StubOracle {
    async fn evaluate(
        &mut self,
        fen: &str,
        _budget: SearchBudget,
    ) -> Result<OracleReport, OracleError> {
        let seen = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(fen.to_string());
            calls.len()
        };
        if self.slow_once.remove(fen) {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        if self.jitter {
            tokio::time::sleep(Duration::from_millis((seen * 7 % 13) as u64)).await;
        }
        if self.unavailable.contains(fen) {
            return Err(OracleError::Unavailable("engine crashed".to_string()));
        }
        Ok(self.reports.get(fen).cloned().unwrap_or_else(|| report(0, None, &[])))
    }
}

pub fn uci(s: &str) -> UciMove {
    UciMove::parse(s).unwrap()
}

/// A report with a centipawn score for the side to move.
pub fn report(cp: i32, best: Option<&str>, alternatives: &[(&str, i32)]) -> OracleReport {
    report_eval(Evaluation::Centipawns(cp), best, alternatives)
}

pub fn report_eval(
    evaluation: Evaluation,
    best: Option<&str>,
    alternatives: &[(&str, i32)],
) -> OracleReport {
    OracleReport {
        evaluation,
        best_move: best.map(uci),
        principal_variation: best.map(uci).into_iter().collect(),
        alternatives: alternatives
            .iter()
            .map(|(mv, cp)| Alternative {
                mv: uci(mv),
                evaluation: Evaluation::Centipawns(*cp),
            })
            .collect(),
        depth: 12,
    }
}

/// Knights hopping out and back: Nf3 Nf6 Ng1 Ng8, repeated for `plies`
/// plies. Every position has a distinct FEN thanks to the move counters.
pub fn knight_shuffle(plies: usize) -> Transcript {
    const CYCLE: [(&str, &str, &str); 4] = [
        ("Nf3", "g1f3", "rnbqkbnr/pppppppp/8/8/8/5N2/PPPPPPPP/RNBQKB1R"),
        ("Nf6", "g8f6", "rnbqkb1r/pppppppp/5n2/8/8/5N2/PPPPPPPP/RNBQKB1R"),
        ("Ng1", "f3g1", "rnbqkb1r/pppppppp/5n2/8/8/8/PPPPPPPP/RNBQKBNR"),
        ("Ng8", "f6g8", "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR"),
    ];
    let moves = (1..=plies)
        .map(|ply| {
            let (san, mv, placement) = CYCLE[(ply - 1) % 4];
            let color = if ply % 2 == 1 { Color::White } else { Color::Black };
            let side = if color == Color::White { "b" } else { "w" };
            Move {
                ply,
                color,
                notation: san.to_string(),
                uci: uci(mv),
                fen: format!("{} {} - - {} {}", placement, side, ply, ply / 2 + 1),
                time_spent_ms: Some(1_000 + ply as u64 * 10),
            }
        })
        .collect();
    Transcript {
        game_id: format!("shuffle-{}", plies),
        initial_position: Board::STARTPOS.to_string(),
        moves,
    }
}

/// FEN of position Pk (0 = initial).
pub fn position(transcript: &Transcript, k: usize) -> String {
    transcript.positions().nth(k).unwrap().to_string()
}
