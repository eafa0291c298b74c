//! UCI engine wrapper implementing [`PositionEvaluator`].

use std::collections::BTreeMap;
use std::process::Stdio;

use chess_core::UciMove;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::config::AnalysisConfig;
use crate::oracle::{Alternative, OracleError, OracleReport, PositionEvaluator, SearchBudget};
use crate::Evaluation;

/// Maximum number of lines to read before giving up on a UCI response.
pub const MAX_UCI_LINES: usize = 10_000;

const PIPE_CAPACITY: usize = 256;

/// Errors that can occur while starting a chess engine.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Failed to spawn the engine process.
    #[error("Failed to spawn engine: {0}")]
    SpawnError(#[from] std::io::Error),
    /// Engine executable was not found at the specified path.
    #[error("Engine not found at path: {0}")]
    NotFound(String),
    /// Engine failed to initialize properly (UCI handshake failed).
    #[error("Engine initialization failed: {0}")]
    InitFailed(String),
}

/// Engine options sent during the handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOptions {
    pub threads: u32,
    pub hash_mb: u32,
    /// Number of ranked lines requested per search.
    pub multipv: u32,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            threads: 1,
            hash_mb: 64,
            multipv: 3,
        }
    }
}

impl EngineOptions {
    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self {
            threads: config.engine.threads,
            hash_mb: config.engine.hash_mb,
            multipv: config.search.multipv,
        }
    }
}

/// One parsed `info` line carrying a score.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfoLine {
    pub depth: u32,
    /// 1-based line rank; 1 when the engine omits it.
    pub multipv: u32,
    pub evaluation: Evaluation,
    pub pv: Vec<UciMove>,
}

/// Parses a UCI info line.
///
/// Returns `None` for lines without depth or score, and for
/// `lowerbound`/`upperbound` lines, whose score is only a search bound.
pub fn parse_info_line(line: &str) -> Option<InfoLine> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.first() != Some(&"info") {
        return None;
    }

    let mut depth: Option<u32> = None;
    let mut multipv: u32 = 1;
    let mut cp: Option<i32> = None;
    let mut mate: Option<i32> = None;
    let mut pv: Vec<UciMove> = Vec::new();

    let mut i = 1;
    while i < parts.len() {
        match parts[i] {
            "depth" => {
                depth = parts.get(i + 1).and_then(|s| s.parse().ok());
                i += 1;
            }
            "multipv" => {
                multipv = parts.get(i + 1).and_then(|s| s.parse().ok()).unwrap_or(1);
                i += 1;
            }
            "score" => {
                match parts.get(i + 1) {
                    Some(&"cp") => cp = parts.get(i + 2).and_then(|s| s.parse().ok()),
                    Some(&"mate") => mate = parts.get(i + 2).and_then(|s| s.parse().ok()),
                    _ => {}
                }
                i += 2;
            }
            "lowerbound" | "upperbound" => return None,
            "pv" => {
                pv = parts[i + 1..]
                    .iter()
                    .map_while(|m| UciMove::parse(m).ok())
                    .collect();
                break;
            }
            _ => {}
        }
        i += 1;
    }

    Some(InfoLine {
        depth: depth?,
        multipv,
        evaluation: Evaluation::from_uci_score(cp, mate)?,
        pv,
    })
}

/// Parses the move of a `bestmove` line. `Ok(None)` means `(none)`.
pub fn parse_bestmove(line: &str) -> Result<Option<UciMove>, OracleError> {
    let token = line
        .split_whitespace()
        .nth(1)
        .ok_or_else(|| OracleError::Protocol(format!("empty bestmove line: {}", line)))?;
    if token == "(none)" || token == "0000" {
        return Ok(None);
    }
    UciMove::parse(token)
        .map(Some)
        .map_err(|e| OracleError::Protocol(e.to_string()))
}

/// Builds a report from the collected info lines and the bestmove.
fn assemble_report(
    lines: BTreeMap<u32, InfoLine>,
    best_move: Option<UciMove>,
) -> Result<OracleReport, OracleError> {
    let mut lines = lines.into_values();
    let top = lines
        .next()
        .ok_or_else(|| OracleError::Protocol("search ended without a score".to_string()))?;
    let alternatives = lines
        .filter_map(|line| {
            line.pv.first().map(|mv| Alternative {
                mv: *mv,
                evaluation: line.evaluation,
            })
        })
        .collect();
    Ok(OracleReport {
        evaluation: top.evaluation,
        best_move,
        principal_variation: top.pv,
        alternatives,
        depth: top.depth,
    })
}

/// Asynchronous wrapper around a UCI engine process such as Stockfish.
pub struct UciEvaluator {
    /// Kept so the process is killed when the evaluator is dropped.
    _process: Child,
    /// Commands for the writer task.
    stdin_tx: mpsc::Sender<String>,
    /// Whole lines from the reader task. Receiving is cancel-safe, so a
    /// search abandoned on timeout never loses half a line.
    stdout_rx: mpsc::Receiver<String>,
    name: String,
    searching: bool,
}

impl UciEvaluator {
    /// Spawns the engine and performs the UCI handshake.
    pub async fn spawn(engine_path: &str, options: &EngineOptions) -> Result<Self, EngineError> {
        let mut process = Command::new(engine_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => EngineError::NotFound(engine_path.to_string()),
                _ => EngineError::SpawnError(e),
            })?;

        let stdin = process
            .stdin
            .take()
            .ok_or_else(|| EngineError::InitFailed("no stdin".to_string()))?;
        let stdout = process
            .stdout
            .take()
            .ok_or_else(|| EngineError::InitFailed("no stdout".to_string()))?;

        let (stdin_tx, mut stdin_rx) = mpsc::channel::<String>(PIPE_CAPACITY);
        let mut writer = stdin;
        tokio::spawn(async move {
            while let Some(command) = stdin_rx.recv().await {
                if writer.write_all(command.as_bytes()).await.is_err()
                    || writer.write_all(b"\n").await.is_err()
                    || writer.flush().await.is_err()
                {
                    break;
                }
            }
        });

        let (stdout_tx, stdout_rx) = mpsc::channel::<String>(PIPE_CAPACITY);
        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if stdout_tx.send(line).await.is_err() {
                    break;
                }
            }
        });

        let mut engine = Self {
            _process: process,
            stdin_tx,
            stdout_rx,
            name: String::new(),
            searching: false,
        };
        engine
            .init_uci(options)
            .await
            .map_err(|e| EngineError::InitFailed(e.to_string()))?;
        info!(engine = %engine.name, path = engine_path, "engine ready");
        Ok(engine)
    }

    async fn init_uci(&mut self, options: &EngineOptions) -> Result<(), OracleError> {
        self.send_command("uci").await?;
        let mut name = String::new();
        for _ in 0..MAX_UCI_LINES {
            let line = self.read_line().await?;
            if let Some(n) = line.strip_prefix("id name ") {
                name = n.to_string();
            } else if line == "uciok" {
                self.name = if name.is_empty() {
                    "Unknown Engine".to_string()
                } else {
                    name
                };
                self.send_command(&format!("setoption name MultiPV value {}", options.multipv))
                    .await?;
                self.send_command(&format!("setoption name Threads value {}", options.threads))
                    .await?;
                self.send_command(&format!("setoption name Hash value {}", options.hash_mb))
                    .await?;
                self.send_command("setoption name UCI_AnalyseMode value true")
                    .await?;
                return self.wait_ready().await;
            }
        }
        Err(OracleError::Protocol("no uciok".to_string()))
    }

    /// Returns the engine's name as reported via UCI protocol.
    pub fn name(&self) -> &str {
        &self.name
    }

    async fn wait_ready(&mut self) -> Result<(), OracleError> {
        self.send_command("isready").await?;
        for _ in 0..MAX_UCI_LINES {
            if self.read_line().await? == "readyok" {
                return Ok(());
            }
        }
        Err(OracleError::Protocol("no readyok".to_string()))
    }

    async fn send_command(&mut self, command: &str) -> Result<(), OracleError> {
        self.stdin_tx
            .send(command.to_string())
            .await
            .map_err(|_| OracleError::Unavailable("engine stdin closed".to_string()))
    }

    async fn read_line(&mut self) -> Result<String, OracleError> {
        match self.stdout_rx.recv().await {
            Some(line) => Ok(line.trim().to_string()),
            None => Err(OracleError::Unavailable(
                "engine closed unexpectedly".to_string(),
            )),
        }
    }

    async fn search(&mut self, fen: &str, budget: SearchBudget) -> Result<OracleReport, OracleError> {
        self.send_command(&format!("position fen {}", fen)).await?;
        self.send_command(&format!("go {}", budget.to_go_args()))
            .await?;
        self.searching = true;

        let mut lines: BTreeMap<u32, InfoLine> = BTreeMap::new();
        for _ in 0..MAX_UCI_LINES {
            let line = self.read_line().await?;
            if line.starts_with("bestmove") {
                self.searching = false;
                let best_move = parse_bestmove(&line)?;
                return assemble_report(lines, best_move);
            }
            if let Some(info) = parse_info_line(&line) {
                lines.insert(info.multipv, info);
            }
        }
        Err(OracleError::Protocol(
            "too many lines without bestmove".to_string(),
        ))
    }
}

impl PositionEvaluator for UciEvaluator {
    async fn evaluate(
        &mut self,
        fen: &str,
        budget: SearchBudget,
    ) -> Result<OracleReport, OracleError> {
        self.search(fen, budget).await
    }

    async fn recover(&mut self) -> Result<(), OracleError> {
        if self.searching {
            debug!(engine = %self.name, "stopping abandoned search");
            self.send_command("stop").await?;
            let mut drained = false;
            for _ in 0..MAX_UCI_LINES {
                if self.read_line().await?.starts_with("bestmove") {
                    drained = true;
                    break;
                }
            }
            if !drained {
                return Err(OracleError::Protocol("stop not acknowledged".to_string()));
            }
            self.searching = false;
        }
        self.wait_ready().await
    }
}
