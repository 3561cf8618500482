//! Grid Loading Simulation
//!
//! Drives the monitoring agent with a synthetic transmission grid whose
//! ratings respond to weather and whose flows follow a scenario:
//! - Normal operation (noise around a steady load)
//! - Heat wave (ambient temperature climbs, thermal ratings fall)
//! - Load ramp (demand grows every step)
//! - Load spike (sudden demand jump)
//!
//! Each step prints one JSON line with the issues and top recommendation;
//! the mission log goes to stderr.
//!
//! # Usage
//! ```bash
//! ./simulation --steps 60 --scenario full --seed 7 --feedback
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use rand::prelude::*;
use rand_distr::{Distribution, Normal};
use serde::Serialize;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use gridwatch::audit::{AuditSink, JsonlAuditLog, MemoryAuditLog};
use gridwatch::config::AgentConfig;
use gridwatch::prediction::{RatingEngine, RatingError};
use gridwatch::types::{
    LineReading, OperatorFeedback, RatingSnapshot, RecommendationScope, WeatherConditions,
    WeatherParams,
};
use gridwatch::{GridMonitorAgent, PersistentState};

// ============================================================================
// Grid Constants
// ============================================================================

/// Ambient temperature at which lines carry their nominal rating (°C)
const NOMINAL_TA: f64 = 25.0;
/// Wind speed at which lines carry their nominal rating (ft/s)
const NOMINAL_WIND: f64 = 2.0;
/// Fractional rating loss per °C above nominal
const RATING_PER_DEGREE: f64 = 0.008;
/// Fractional rating gain per ft/s of wind above nominal
const RATING_PER_WIND: f64 = 0.04;

/// (name, nominal rating MVA, base flow MVA)
const LINES: &[(&str, f64, f64)] = &[
    ("L1", 220.0, 120.0),
    ("L2", 180.0, 118.0),
    ("L3", 300.0, 165.0),
    ("L4", 150.0, 98.0),
    ("L5", 250.0, 140.0),
    ("L6", 120.0, 84.0),
];

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "grid-simulation")]
#[command(about = "Synthetic grid loading simulation for the gridwatch agent")]
#[command(version = "1.0")]
struct Args {
    /// Number of monitoring steps
    #[arg(short = 'n', long, default_value = "60", value_parser = clap::value_parser!(u32).range(5..=10000))]
    steps: u32,

    /// Scenario: full, normal, heat-wave, ramp or spike
    #[arg(long, default_value = "full")]
    scenario: Scenario,

    /// Random seed for reproducibility
    #[arg(long)]
    seed: Option<u64>,

    /// Simulate operator feedback on the top recommendation of each step
    #[arg(long)]
    feedback: bool,

    /// Forecast steps to run after the simulation
    #[arg(long, default_value = "6")]
    forecast_steps: usize,

    /// Append decisions to this JSON-lines file instead of keeping them in memory
    #[arg(long, value_name = "FILE")]
    decision_log: Option<PathBuf>,

    /// Save the final agent state here
    #[arg(long, value_name = "FILE")]
    state: Option<PathBuf>,

    /// Suppress mission log (only output step records)
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum Scenario {
    Full,
    Normal,
    HeatWave,
    Ramp,
    Spike,
}

// ============================================================================
// Simulation Phases
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
enum Phase {
    /// Steady load, nominal weather; builds history (0-30%)
    Baseline,
    /// Ambient temperature rises to 42°C, wind drops (30-50%)
    HeatWave,
    /// Demand grows ~6% per step (50-70%)
    LoadRamp,
    /// Demand jumps 35% for a short window (70-80%)
    Spike,
    /// Return to nominal (80-100%)
    Recovery,
}

impl Phase {
    fn name(self) -> &'static str {
        match self {
            Phase::Baseline => "Baseline (Steady Load)",
            Phase::HeatWave => "Heat Wave (Rating Decline)",
            Phase::LoadRamp => "Load Ramp (Rising Demand)",
            Phase::Spike => "Load Spike (Sudden Demand Jump)",
            Phase::Recovery => "Recovery (Return to Nominal)",
        }
    }

    fn expected(self) -> &'static str {
        match self {
            Phase::Baseline => "Expected: No issues",
            Phase::HeatWave => "Expected: Rating decline, high loading",
            Phase::LoadRamp => "Expected: Loading trend, high/critical loading",
            Phase::Spike => "Expected: Anomaly, critical overload",
            Phase::Recovery => "Expected: Issues clearing",
        }
    }

    fn for_scenario(scenario: Scenario, progress: f64) -> Self {
        let (event, start, end) = match scenario {
            Scenario::Normal => return Phase::Baseline,
            Scenario::Full => {
                return match progress {
                    p if p < 0.30 => Phase::Baseline,
                    p if p < 0.50 => Phase::HeatWave,
                    p if p < 0.70 => Phase::LoadRamp,
                    p if p < 0.80 => Phase::Spike,
                    _ => Phase::Recovery,
                }
            }
            Scenario::HeatWave => (Phase::HeatWave, 0.30, 0.80),
            Scenario::Ramp => (Phase::LoadRamp, 0.30, 0.80),
            Scenario::Spike => (Phase::Spike, 0.70, 0.80),
        };
        if progress < start {
            Phase::Baseline
        } else if progress < end {
            event
        } else {
            Phase::Recovery
        }
    }
}

// ============================================================================
// Synthetic Grid
// ============================================================================

struct GridConditions {
    rng: StdRng,
    load_factor: f64,
    flow_noise: Normal<f64>,
}

/// Synthetic rating engine: ratings follow weather, flows follow load.
struct SyntheticGrid {
    conditions: Mutex<GridConditions>,
}

impl SyntheticGrid {
    fn new(seed: Option<u64>) -> Result<Self> {
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        Ok(Self {
            conditions: Mutex::new(GridConditions {
                rng,
                load_factor: 1.0,
                flow_noise: Normal::new(0.0, 0.015).context("flow noise distribution")?,
            }),
        })
    }

    fn set_load_factor(&self, factor: f64) {
        if let Ok(mut c) = self.conditions.lock() {
            c.load_factor = factor;
        }
    }

    fn load_factor(&self) -> f64 {
        self.conditions.lock().map(|c| c.load_factor).unwrap_or(1.0)
    }

    fn rating_multiplier(weather: &WeatherConditions) -> f64 {
        let heat = 1.0 - RATING_PER_DEGREE * (weather.ta - NOMINAL_TA);
        let wind = 1.0 + RATING_PER_WIND * (weather.wind_velocity - NOMINAL_WIND);
        (heat * wind).clamp(0.3, 1.5)
    }
}

/// Handle so the agent and the simulation loop drive the same grid.
struct GridEngine(Arc<SyntheticGrid>);

impl RatingEngine for GridEngine {
    fn rate(&self, weather: &WeatherConditions) -> Result<RatingSnapshot, RatingError> {
        if !weather.ta.is_finite() || !weather.wind_velocity.is_finite() {
            return Err(RatingError::InvalidInput(format!(
                "ambient {} °C, wind {} ft/s",
                weather.ta, weather.wind_velocity
            )));
        }
        let mut guard = self
            .0
            .conditions
            .lock()
            .map_err(|_| RatingError::Engine("grid state lock poisoned".to_string()))?;
        let c = &mut *guard;

        let multiplier = SyntheticGrid::rating_multiplier(weather);
        let load = c.load_factor;
        let noise = c.flow_noise;
        let lines = LINES
            .iter()
            .map(|&(name, rating, base_flow)| {
                let flow = base_flow * load * (1.0 + noise.sample(&mut c.rng));
                LineReading::from_flow(name, flow.max(0.0), rating * multiplier)
            })
            .collect();
        Ok(RatingSnapshot::from_lines(lines))
    }
}

/// Weather and demand for one step of a phase.
fn step_inputs(phase: Phase, previous_load: f64, rng: &mut StdRng) -> (WeatherParams, f64) {
    let jitter: f64 = rng.gen_range(-0.5..0.5);
    match phase {
        Phase::Baseline | Phase::Recovery => (
            WeatherParams {
                ta: Some(NOMINAL_TA + jitter),
                wind_velocity: Some(NOMINAL_WIND),
                ..WeatherParams::default()
            },
            1.0,
        ),
        Phase::HeatWave => (
            WeatherParams {
                ta: Some(42.0 + jitter),
                wind_velocity: Some(0.5),
                sun_time: Some(14.0),
                ..WeatherParams::default()
            },
            1.05,
        ),
        Phase::LoadRamp => (
            WeatherParams {
                ta: Some(30.0 + jitter),
                ..WeatherParams::default()
            },
            previous_load * 1.06,
        ),
        Phase::Spike => (
            WeatherParams {
                ta: Some(NOMINAL_TA + jitter),
                ..WeatherParams::default()
            },
            1.35,
        ),
    }
}

// ============================================================================
// Output
// ============================================================================

#[derive(Serialize)]
struct StepRecord<'a> {
    step: u32,
    phase: &'a str,
    avg_loading: f64,
    max_loading: f64,
    issues: Vec<String>,
    top_recommendation: Option<String>,
    high_loading_threshold: f64,
}

fn log_mission(step: u32, message: &str, quiet: bool) {
    if !quiet {
        eprintln!("[step {:>4}] {}", step, message);
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    let config = AgentConfig::default();
    let grid = Arc::new(SyntheticGrid::new(args.seed)?);
    let audit: Box<dyn AuditSink> = match &args.decision_log {
        Some(path) => Box::new(JsonlAuditLog::new(path.clone())?),
        None => Box::new(MemoryAuditLog::new()),
    };
    let mut agent = GridMonitorAgent::new(
        config.clone(),
        PersistentState::new(config.thresholds.clone()),
        Box::new(GridEngine(Arc::clone(&grid))),
        audit,
    );
    let engine = GridEngine(Arc::clone(&grid));
    let mut rng = match args.seed {
        Some(s) => StdRng::seed_from_u64(s.wrapping_add(1)),
        None => StdRng::from_entropy(),
    };

    // Mission briefing
    log_mission(0, &"=".repeat(70), args.quiet);
    log_mission(0, "GRID LOADING SIMULATION v1.0", args.quiet);
    log_mission(0, &"=".repeat(70), args.quiet);
    log_mission(0, &format!("  Lines: {}", LINES.len()), args.quiet);
    log_mission(0, &format!("  Steps: {}", args.steps), args.quiet);
    log_mission(0, &format!("  Scenario: {:?}", args.scenario), args.quiet);
    log_mission(0, &format!("  Operator feedback: {}", args.feedback), args.quiet);
    if let Some(seed) = args.seed {
        log_mission(0, &format!("  Random seed: {}", seed), args.quiet);
    }
    log_mission(0, &"=".repeat(70), args.quiet);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut phase: Option<Phase> = None;
    let mut total_issues = 0usize;
    let mut last_weather = WeatherParams::default();

    for step in 0..args.steps {
        let progress = f64::from(step) / f64::from(args.steps);
        let current = Phase::for_scenario(args.scenario, progress);
        if phase != Some(current) {
            log_mission(step, &format!(">>> PHASE: {}", current.name()), args.quiet);
            log_mission(step, &format!("    {}", current.expected()), args.quiet);
            phase = Some(current);
        }

        let (weather, load) = step_inputs(current, grid.load_factor(), &mut rng);
        grid.set_load_factor(load);
        let snapshot = engine
            .rate(&weather.resolve(&config.forecast.defaults))
            .context("synthetic grid rating failed")?;
        last_weather = weather;

        let issues = agent.monitor(&snapshot)?;
        let recommendations = agent.recommend(&issues, RecommendationScope::Grid, None)?;
        total_issues += issues.len();

        if args.feedback {
            if let Some(top) = recommendations.first() {
                // Operators act on critical advice and wave off the rest
                let feedback = if top.priority == 1 {
                    OperatorFeedback::accepted(rng.gen_bool(0.7))
                } else if rng.gen_bool(0.5) {
                    OperatorFeedback::rejected()
                } else {
                    OperatorFeedback::accepted(true)
                };
                agent.learn(&top.id, feedback)?;
            }
        }

        let record = StepRecord {
            step,
            phase: current.name(),
            avg_loading: snapshot.summary.avg_loading,
            max_loading: snapshot.summary.max_loading,
            issues: issues.iter().map(|i| format!("{} {}", i.severity, i.reason)).collect(),
            top_recommendation: recommendations.first().map(|r| r.action.clone()),
            high_loading_threshold: agent.thresholds().high_loading,
        };
        writeln!(out, "{}", serde_json::to_string(&record)?)?;
    }
    out.flush()?;

    // Forecast from the last observed weather, warming 1.5°C per step
    if args.forecast_steps > 0 {
        let base_ta = last_weather.ta.unwrap_or(NOMINAL_TA);
        let horizon: Vec<WeatherParams> = (0..args.forecast_steps)
            .map(|i| WeatherParams {
                ta: Some(base_ta + 1.5 * i as f64),
                ..last_weather.clone()
            })
            .collect();
        let report = agent.predict(&horizon)?;
        writeln!(out, "{}", serde_json::to_string(&report)?)?;
        out.flush()?;
    }

    if let Some(path) = &args.state {
        let mut state = agent.state().clone();
        state
            .save(path)
            .with_context(|| format!("Failed to save state to {}", path.display()))?;
        log_mission(args.steps, &format!("State saved to {}", path.display()), args.quiet);
    }

    // Mission debrief
    let hb = agent.heartbeat();
    log_mission(args.steps, &"=".repeat(70), args.quiet);
    log_mission(args.steps, "SIMULATION COMPLETE", args.quiet);
    log_mission(args.steps, &format!("Issues raised: {}", total_issues), args.quiet);
    log_mission(args.steps, &format!("Feedback events: {}", hb.action_history_size), args.quiet);
    log_mission(
        args.steps,
        &format!("Final high_loading threshold: {:.1}%", hb.thresholds.high_loading),
        args.quiet,
    );
    log_mission(args.steps, &"=".repeat(70), args.quiet);

    Ok(())
}
