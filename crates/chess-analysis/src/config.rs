//! Configuration file loading for game reviews.
//!
//! Settings live in `review.toml` in the current directory. Every field has
//! a default, so an empty or missing file yields a working configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chess_core::Color;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::oracle::SearchBudget;

/// Errors that can occur when loading or parsing configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse the configuration file as valid TOML.
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
    /// A value is out of its allowed range.
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Oracle process settings.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Path to the UCI engine. Defaults to "stockfish" (assumes it's in PATH).
    #[serde(default = "default_engine_path")]
    pub path: String,
    #[serde(default = "default_threads")]
    pub threads: u32,
    #[serde(default = "default_hash_mb")]
    pub hash_mb: u32,
    /// Independent engine processes evaluating positions concurrently.
    #[serde(default = "default_instances")]
    pub instances: usize,
}

fn default_engine_path() -> String {
    "stockfish".to_string()
}

fn default_threads() -> u32 {
    1
}

fn default_hash_mb() -> u32 {
    64
}

fn default_instances() -> usize {
    1
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            path: default_engine_path(),
            threads: default_threads(),
            hash_mb: default_hash_mb(),
            instances: default_instances(),
        }
    }
}

/// Per-position search settings.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct SearchConfig {
    /// Fixed search depth. Ignored when `movetime_ms` is set.
    #[serde(default = "default_depth")]
    pub depth: Option<u32>,
    #[serde(default)]
    pub movetime_ms: Option<u64>,
    /// Ranked lines per search; at least two are needed for tactics.
    #[serde(default = "default_multipv")]
    pub multipv: u32,
    #[serde(default = "default_per_move_timeout_ms")]
    pub per_move_timeout_ms: u64,
}

const DEFAULT_DEPTH: u32 = 14;

fn default_depth() -> Option<u32> {
    Some(DEFAULT_DEPTH)
}

fn default_multipv() -> u32 {
    3
}

fn default_per_move_timeout_ms() -> u64 {
    3_000
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            depth: default_depth(),
            movetime_ms: None,
            multipv: default_multipv(),
            per_move_timeout_ms: default_per_move_timeout_ms(),
        }
    }
}

impl SearchConfig {
    /// Search budget for one position; a move time wins over depth.
    pub fn budget(&self) -> SearchBudget {
        match (self.movetime_ms, self.depth) {
            (Some(ms), _) => SearchBudget::MoveTime(ms),
            (None, Some(depth)) => SearchBudget::Depth(depth),
            (None, None) => SearchBudget::Depth(DEFAULT_DEPTH),
        }
    }

    pub fn per_move_timeout(&self) -> Duration {
        Duration::from_millis(self.per_move_timeout_ms)
    }
}

/// Centipawn thresholds used by the detectors.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct ThresholdConfig {
    /// Minimum White-relative swing reported as a critical moment.
    #[serde(default = "default_critical_swing_cp")]
    pub critical_swing_cp: i32,
    /// Gap between best and second-best line that flags a tactic.
    #[serde(default = "default_decisive_gap_cp")]
    pub decisive_gap_cp: i32,
    /// How close to the best line a played move counts as "found".
    #[serde(default = "default_found_tolerance_cp")]
    pub found_tolerance_cp: i32,
}

fn default_critical_swing_cp() -> i32 {
    100
}

fn default_decisive_gap_cp() -> i32 {
    150
}

fn default_found_tolerance_cp() -> i32 {
    30
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            critical_swing_cp: default_critical_swing_cp(),
            decisive_gap_cp: default_decisive_gap_cp(),
            found_tolerance_cp: default_found_tolerance_cp(),
        }
    }
}

/// Phase boundaries as 1-based transcript move numbers.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
pub struct PhaseConfig {
    /// Last move of the opening.
    #[serde(default = "default_opening_cutoff")]
    pub opening_cutoff: usize,
    /// Last move of the middlegame.
    #[serde(default = "default_middlegame_cutoff")]
    pub middlegame_cutoff: usize,
}

fn default_opening_cutoff() -> usize {
    12
}

fn default_middlegame_cutoff() -> usize {
    35
}

impl Default for PhaseConfig {
    fn default() -> Self {
        Self {
            opening_cutoff: default_opening_cutoff(),
            middlegame_cutoff: default_middlegame_cutoff(),
        }
    }
}

/// Top-level review configuration.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct AnalysisConfig {
    /// Side whose performance is scored. Defaults to white.
    #[serde(default = "default_player")]
    pub player: Color,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub thresholds: ThresholdConfig,
    #[serde(default)]
    pub phases: PhaseConfig,
}

fn default_player() -> Color {
    Color::White
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            player: default_player(),
            engine: EngineConfig::default(),
            search: SearchConfig::default(),
            thresholds: ThresholdConfig::default(),
            phases: PhaseConfig::default(),
        }
    }
}

impl AnalysisConfig {
    /// Loads the configuration from [`Self::config_path()`], or defaults
    /// when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ReadError`] if the file exists but cannot be read,
    /// or [`ConfigError::ParseError`] if the file contains invalid TOML.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path();
        if config_path.exists() {
            Self::from_path(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Loads the configuration from an explicit file.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Returns `review.toml` in the current working directory.
    pub fn config_path() -> PathBuf {
        PathBuf::from("review.toml")
    }

    /// Checks ranges that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.search.multipv < 2 {
            return Err(ConfigError::Invalid(format!(
                "search.multipv must be at least 2, got {}",
                self.search.multipv
            )));
        }
        if self.search.per_move_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "search.per_move_timeout_ms must be positive".to_string(),
            ));
        }
        if matches!(self.search.depth, Some(0)) && self.search.movetime_ms.is_none() {
            return Err(ConfigError::Invalid(
                "search.depth must be positive".to_string(),
            ));
        }
        if matches!(self.search.movetime_ms, Some(0)) {
            return Err(ConfigError::Invalid(
                "search.movetime_ms must be positive".to_string(),
            ));
        }
        if self.phases.opening_cutoff > self.phases.middlegame_cutoff {
            return Err(ConfigError::Invalid(format!(
                "phases.opening_cutoff ({}) exceeds phases.middlegame_cutoff ({})",
                self.phases.opening_cutoff, self.phases.middlegame_cutoff
            )));
        }
        if self.engine.instances == 0 {
            return Err(ConfigError::Invalid(
                "engine.instances must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
