//! Game Review - Analyzes a finished game with a UCI engine.
//!
//! Reads a JSON transcript, evaluates every position with one or more
//! engine processes, and prints the analysis summary as JSON on stdout.
//! Logs go to stderr.

use std::path::PathBuf;

use anyhow::Context;
use chess_analysis::{
    AnalysisConfig, EngineOptions, GameReviewer, OracleHandle, Transcript, UciEvaluator,
};
use chess_core::Color;
use clap::Parser;
use tokio::signal;
use tokio_util::sync::CancellationToken;

/// Game Review - Scores a player's performance in a finished game.
#[derive(Parser)]
#[command(name = "game-review")]
#[command(about = "Analyzes a finished game and prints the review as JSON")]
struct Args {
    /// Path to the game transcript (JSON)
    transcript: PathBuf,

    /// Configuration file (defaults to review.toml when present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Path to the UCI engine executable
    #[arg(long)]
    engine: Option<String>,

    /// Player to score: white or black
    #[arg(long, value_parser = parse_color)]
    player: Option<Color>,

    /// Fixed search depth per position
    #[arg(long)]
    depth: Option<u32>,

    /// Number of engine processes to run
    #[arg(long)]
    instances: Option<usize>,

    /// Pretty-print the JSON output
    #[arg(long)]
    pretty: bool,
}

fn parse_color(s: &str) -> Result<Color, String> {
    Color::from_name(s).ok_or_else(|| format!("expected white or black, got '{}'", s))
}

impl Args {
    fn load_config(&self) -> anyhow::Result<AnalysisConfig> {
        let mut config = match &self.config {
            Some(path) => AnalysisConfig::from_path(path)
                .with_context(|| format!("failed to load config {:?}", path))?,
            None => AnalysisConfig::load().context("failed to load review.toml")?,
        };
        if let Some(engine) = &self.engine {
            config.engine.path = engine.clone();
        }
        if let Some(player) = self.player {
            config.player = player;
        }
        if let Some(depth) = self.depth {
            config.search.depth = Some(depth);
            config.search.movetime_ms = None;
        }
        if let Some(instances) = self.instances {
            config.engine.instances = instances;
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();
    let args = Args::parse();

    let config = args.load_config()?;
    let content = std::fs::read_to_string(&args.transcript)
        .with_context(|| format!("failed to read transcript {:?}", args.transcript))?;
    let transcript: Transcript =
        serde_json::from_str(&content).context("transcript is not valid JSON")?;

    tracing::info!("Engine: {}", config.engine.path);
    tracing::info!("Instances: {}", config.engine.instances);
    tracing::info!("Player: {}", config.player);

    let reviewer = GameReviewer::new(config.clone()).context("analysis failed")?;

    let options = EngineOptions::from_config(&config);
    let mut handles = Vec::with_capacity(config.engine.instances);
    for i in 0..config.engine.instances {
        let engine = UciEvaluator::spawn(&config.engine.path, &options)
            .await
            .context("analysis failed: engine unavailable")?;
        handles.push(OracleHandle::spawn(format!("{}#{}", engine.name(), i), engine));
    }
    let mut leases = Vec::with_capacity(handles.len());
    for handle in &handles {
        leases.push(handle.lease().await);
    }

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown signal received");
            on_signal.cancel();
        }
    });

    let summary = reviewer
        .review(&transcript, &leases, &cancel)
        .await
        .context("analysis failed")?;

    let json = if args.pretty {
        serde_json::to_string_pretty(&summary)?
    } else {
        serde_json::to_string(&summary)?
    };
    println!("{}", json);
    Ok(())
}
