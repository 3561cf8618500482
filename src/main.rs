//! Gridwatch - Autonomous Grid Monitoring Agent
//!
//! Command-line front end for the monitoring agent. Every command loads the
//! agent configuration and persisted state, performs one operation, prints
//! JSON to stdout, and saves state when the operation changed it.
//!
//! # Usage
//!
//! ```bash
//! # Current thresholds and history sizes
//! gridwatch status
//!
//! # Detect issues in a rating snapshot and rank recommendations
//! gridwatch monitor --snapshot ratings.json --scope line --limit 3
//!
//! # Operator feedback on a recommendation
//! gridwatch feedback --action-id critical_loading_..._action_0 --result rejected
//!
//! # Forecast from recorded per-step ratings
//! gridwatch predict --forecast weather.json --ratings forecast_ratings.json
//!
//! # Effective configuration
//! gridwatch config --dump
//! ```
//!
//! # Environment Variables
//!
//! - `GRIDWATCH_CONFIG`: Path to the TOML config (default: ./gridwatch.toml)
//! - `GRIDWATCH_STATE_PATH`: Override `agent.state_path`
//! - `GRIDWATCH_LOG_PATH`: Override `agent.decision_log_path`
//! - `RUST_LOG`: Logging level (default: info)

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

use gridwatch::config::AgentConfig;
use gridwatch::prediction::ReplayRatingEngine;
use gridwatch::types::{
    FeedbackResult, OperatorFeedback, RatingSnapshot, RecommendationScope, SnapshotSummary,
    WeatherParams,
};
use gridwatch::GridMonitorAgent;

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "gridwatch")]
#[command(about = "Autonomous grid monitoring agent")]
#[command(version)]
struct CliArgs {
    /// Path to the agent config TOML (overrides the default search)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: SubCommand,
}

#[derive(clap::Subcommand, Debug)]
enum SubCommand {
    /// Print the agent heartbeat
    Status,

    /// Run detection on a rating snapshot and print issues and recommendations
    Monitor {
        /// JSON file with `{lines, summary}` from the rating engine
        #[arg(long, value_name = "FILE")]
        snapshot: PathBuf,
        /// Recommendation scope: line, area or grid
        #[arg(long, default_value = "grid")]
        scope: RecommendationScope,
        /// Maximum recommendations (default from config)
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Submit operator feedback for a recommendation
    Feedback {
        #[arg(long)]
        action_id: String,
        /// accepted, rejected, or any other verdict (recorded, no threshold change)
        #[arg(long)]
        result: String,
        /// Whether an accepted action achieved its goal
        #[arg(long)]
        success: Option<bool>,
        #[arg(long)]
        notes: Option<String>,
    },

    /// Forecast line ratings and risk over a weather horizon
    Predict {
        /// JSON array of weather steps (`Ta`, `WindVelocity`, ... ; missing fields use defaults)
        #[arg(long, value_name = "FILE")]
        forecast: PathBuf,
        /// JSON array of recorded rating snapshots, one per forecast step
        #[arg(long, value_name = "FILE")]
        ratings: PathBuf,
    },

    /// Validate the effective configuration
    Config {
        /// Print the effective configuration as TOML
        #[arg(long)]
        dump: bool,
    },
}

// ============================================================================
// Helpers
// ============================================================================

fn init_logging(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }
}

fn load_config(path: Option<&Path>) -> Result<AgentConfig> {
    match path {
        Some(p) => {
            let mut config = AgentConfig::load_from_file(p)
                .with_context(|| format!("Failed to load config {}", p.display()))?;
            config.apply_env_overrides();
            Ok(config)
        }
        None => Ok(AgentConfig::load()),
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path, what: &str) -> Result<T> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {what} file {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Invalid {what} JSON in {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn open_agent(config: AgentConfig, engine: ReplayRatingEngine) -> Result<GridMonitorAgent> {
    GridMonitorAgent::open(config, Box::new(engine)).context("Failed to start agent")
}

#[derive(Serialize)]
struct MonitorOutput {
    issues: Vec<gridwatch::Issue>,
    recommendations: Vec<gridwatch::Recommendation>,
}

#[derive(Serialize)]
struct FeedbackOutput {
    action_id: String,
    adjustment: String,
    heartbeat: gridwatch::Heartbeat,
}

// ============================================================================
// Main
// ============================================================================

fn main() -> Result<()> {
    let args = CliArgs::parse();
    init_logging(args.log_json);

    let config = load_config(args.config.as_deref())?;

    match args.command {
        SubCommand::Status => {
            let agent = open_agent(config, ReplayRatingEngine::new(Vec::new()))?;
            print_json(&agent.heartbeat())?;
        }

        SubCommand::Monitor { snapshot, scope, limit } => {
            let mut snap: RatingSnapshot = read_json(&snapshot, "snapshot")?;
            if snap.summary == SnapshotSummary::default() && !snap.lines.is_empty() {
                // Engine output without a summary block
                snap = RatingSnapshot::from_lines(snap.lines);
            }

            let mut agent = open_agent(config, ReplayRatingEngine::new(Vec::new()))?;
            let issues = agent.monitor(&snap)?;
            let recommendations = agent.recommend(&issues, scope, limit)?;
            agent.save_state()?;

            info!(
                issues = issues.len(),
                recommendations = recommendations.len(),
                "Monitoring complete"
            );
            print_json(&MonitorOutput { issues, recommendations })?;
        }

        SubCommand::Feedback { action_id, result, success, notes } => {
            let feedback = OperatorFeedback {
                result: FeedbackResult::from(result),
                success,
                metrics: None,
                notes,
            };
            let mut agent = open_agent(config, ReplayRatingEngine::new(Vec::new()))?;
            let adjustment = agent.learn(&action_id, feedback)?;
            agent.save_state()?;

            print_json(&FeedbackOutput {
                action_id,
                adjustment: format!("{adjustment:?}"),
                heartbeat: agent.heartbeat(),
            })?;
        }

        SubCommand::Predict { forecast, ratings } => {
            let steps: Vec<WeatherParams> = read_json(&forecast, "forecast")?;
            let engine = ReplayRatingEngine::from_file(&ratings)
                .with_context(|| format!("Failed to load ratings {}", ratings.display()))?;
            if engine.len() < steps.len() {
                tracing::warn!(
                    steps = steps.len(),
                    recorded = engine.len(),
                    "Fewer recorded ratings than forecast steps; trailing steps will fail"
                );
            }

            let mut agent = open_agent(config, engine)?;
            let report = agent.predict(&steps)?;
            info!(
                steps = report.predictions.len(),
                succeeded = report.success_count(),
                "Forecast complete"
            );
            print_json(&report)?;
        }

        SubCommand::Config { dump } => {
            config.validate().context("Configuration is invalid")?;
            if dump {
                print!("{}", config.to_toml()?);
            } else {
                info!(
                    state_path = %config.agent.state_path.display(),
                    decision_log = %config.agent.decision_log_path.display(),
                    high_loading = config.thresholds.high_loading,
                    "Configuration is valid"
                );
            }
        }
    }

    Ok(())
}
