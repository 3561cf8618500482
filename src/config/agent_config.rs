//! Agent Configuration - operator-tunable TOML values
//!
//! Every section implements `Default` with the built-in values so that a
//! missing file or a partial file behaves exactly like the defaults for the
//! keys it does not mention.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

use crate::types::threshold_defaults;
use crate::types::{StressLevel, ThresholdSet, WeatherConditions};

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "GRIDWATCH_CONFIG";
/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "gridwatch.toml";
/// Overrides `agent.state_path`.
pub const STATE_PATH_ENV_VAR: &str = "GRIDWATCH_STATE_PATH";
/// Overrides `agent.decision_log_path`.
pub const LOG_PATH_ENV_VAR: &str = "GRIDWATCH_LOG_PATH";

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration for an agent deployment.
///
/// Load with `AgentConfig::load()` which searches:
/// 1. `$GRIDWATCH_CONFIG`
/// 2. `./gridwatch.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Runtime switches and file locations
    #[serde(default)]
    pub agent: AgentSection,

    /// Initial detection thresholds (used when no persisted state exists)
    #[serde(default)]
    pub thresholds: ThresholdSet,

    /// Feedback-driven threshold controller
    #[serde(default)]
    pub learning: LearningConfig,

    #[serde(default)]
    pub recommendations: RecommendationConfig,

    /// Line stress-level cut-offs
    #[serde(default)]
    pub stress: StressConfig,

    /// Forecast confidence model and weather defaults
    #[serde(default)]
    pub forecast: ForecastConfig,
}

impl AgentConfig {
    /// Load configuration using the standard search order, then apply
    /// path overrides from the environment.
    pub fn load() -> Self {
        let mut config = Self::search();
        config.apply_env_overrides();
        config
    }

    fn search() -> Self {
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), "Loaded agent config from {}", CONFIG_ENV_VAR);
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from {}, falling back", CONFIG_ENV_VAR);
                    }
                }
            } else {
                warn!(path = %path, "{} points to non-existent file, falling back", CONFIG_ENV_VAR);
            }
        }

        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!("Loaded agent config from ./{}", LOCAL_CONFIG_FILE);
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./{}, using defaults", LOCAL_CONFIG_FILE);
                }
            }
        }

        info!("No {} found, using built-in defaults", LOCAL_CONFIG_FILE);
        Self::default()
    }

    /// Apply `GRIDWATCH_STATE_PATH` and `GRIDWATCH_LOG_PATH` if set.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var(STATE_PATH_ENV_VAR) {
            self.agent.state_path = PathBuf::from(path);
        }
        if let Ok(path) = std::env::var(LOG_PATH_ENV_VAR) {
            self.agent.decision_log_path = PathBuf::from(path);
        }
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        Self::from_toml_str(&contents).map_err(|e| match e {
            ConfigError::Parse(_, inner) => ConfigError::Parse(path.to_path_buf(), inner),
            other => other,
        })
    }

    /// Parse and validate a TOML document. Unknown keys are logged, not fatal.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        for w in super::validation::validate_unknown_keys(contents) {
            warn!("{}", w);
        }
        let config: Self =
            toml::from_str(contents).map_err(|e| ConfigError::Parse(PathBuf::new(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the current config to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Validate all values for internal consistency.
    ///
    /// Rules:
    /// - Thresholds are finite, positive where used as divisors, and critical >= high
    /// - Learning bounds bracket the initial `high_loading`, stay at or below
    ///   `critical_loading`, and the step is positive
    /// - Stress cut-offs ascend
    /// - Forecast confidence floor and decay lie within [0, 1]
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = self.thresholds.violations();

        let l = &self.learning;
        if !l.step.is_finite() || l.step <= 0.0 {
            errors.push(format!("learning.step must be a positive number (got {})", l.step));
        }
        if !(l.high_loading_min.is_finite() && l.high_loading_max.is_finite())
            || l.high_loading_min > l.high_loading_max
        {
            errors.push(format!(
                "learning.high_loading_min ({}) must be <= high_loading_max ({})",
                l.high_loading_min, l.high_loading_max
            ));
        } else if !(l.high_loading_min..=l.high_loading_max).contains(&self.thresholds.high_loading) {
            errors.push(format!(
                "thresholds.high_loading ({:.1}) must lie within learning bounds {:.1}..={:.1}",
                self.thresholds.high_loading, l.high_loading_min, l.high_loading_max
            ));
        }
        if l.high_loading_max > self.thresholds.critical_loading {
            errors.push(format!(
                "learning.high_loading_max ({:.1}) must be <= thresholds.critical_loading ({:.1})",
                l.high_loading_max, self.thresholds.critical_loading
            ));
        }
        if l.feedback_history_cap == 0 {
            errors.push("learning.feedback_history_cap must be > 0".to_string());
        }

        if self.recommendations.default_limit == 0 {
            errors.push("recommendations.default_limit must be > 0".to_string());
        }

        let s = &self.stress;
        if !(s.caution.is_finite() && s.high.is_finite() && s.critical.is_finite())
            || s.caution > s.high
            || s.high > s.critical
        {
            errors.push(format!(
                "stress cut-offs must ascend: caution ({}) <= high ({}) <= critical ({})",
                s.caution, s.high, s.critical
            ));
        }

        let f = &self.forecast;
        if !(0.0..=1.0).contains(&f.confidence_floor) {
            errors.push(format!(
                "forecast.confidence_floor ({}) must be within 0..=1",
                f.confidence_floor
            ));
        }
        if !(0.0..=1.0).contains(&f.confidence_decay_per_step) {
            errors.push(format!(
                "forecast.confidence_decay_per_step ({}) must be within 0..=1",
                f.confidence_decay_per_step
            ));
        }

        let (range_errors, range_warnings) = super::validation::validate_physical_ranges(self);
        errors.extend(range_errors);
        for w in &range_warnings {
            warn!("{}", w);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config I/O error ({}): {1}", .0.display())]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Config parse error ({}): {1}", .0.display())]
    Parse(PathBuf, #[source] toml::de::Error),

    #[error("Config serialization error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Config validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),
}

// ============================================================================
// Sections
// ============================================================================

/// Runtime switches and file locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSection {
    /// Master switch; a disabled agent refuses every operation
    pub enabled: bool,
    /// Persisted state document
    pub state_path: PathBuf,
    /// Append-only decision log (JSON lines)
    pub decision_log_path: PathBuf,
    /// Whether `save_state` writes to disk
    pub persistence_enabled: bool,
}

impl Default for AgentSection {
    fn default() -> Self {
        Self {
            enabled: true,
            state_path: PathBuf::from("data/agent_state.json"),
            decision_log_path: PathBuf::from("data/agent_decisions.log"),
            persistence_enabled: true,
        }
    }
}

/// Bounded single-knob controller on `high_loading`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LearningConfig {
    /// Adjustment per feedback event (%)
    pub step: f64,
    pub high_loading_min: f64,
    pub high_loading_max: f64,
    /// Retained operator feedback records
    pub feedback_history_cap: usize,
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            step: threshold_defaults::LEARNING_STEP,
            high_loading_min: threshold_defaults::HIGH_LOADING_MIN,
            high_loading_max: threshold_defaults::HIGH_LOADING_MAX,
            feedback_history_cap: threshold_defaults::FEEDBACK_HISTORY_CAP,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommendationConfig {
    /// Recommendations returned when the caller gives no limit
    pub default_limit: usize,
}

impl Default for RecommendationConfig {
    fn default() -> Self {
        Self { default_limit: 5 }
    }
}

/// Loading cut-offs for the normal/caution/high/critical stress buckets (%).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StressConfig {
    pub caution: f64,
    pub high: f64,
    pub critical: f64,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            caution: threshold_defaults::STRESS_CAUTION,
            high: threshold_defaults::STRESS_HIGH,
            critical: threshold_defaults::STRESS_CRITICAL,
        }
    }
}

impl StressConfig {
    pub fn classify(&self, loading_pct: f64) -> StressLevel {
        StressLevel::classify(loading_pct, self.caution, self.high, self.critical)
    }
}

/// Forecast confidence model: `max(floor, 1 − decay × step)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    pub confidence_decay_per_step: f64,
    pub confidence_floor: f64,
    /// Weather values used for any field a forecast step leaves out
    pub defaults: WeatherConditions,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            confidence_decay_per_step: 0.1,
            confidence_floor: 0.5,
            defaults: WeatherConditions::default(),
        }
    }
}

impl ForecastConfig {
    /// Confidence for the 0-based forecast step `index`.
    pub fn step_confidence(&self, index: usize) -> f64 {
        (1.0 - self.confidence_decay_per_step * index as f64)
            .max(self.confidence_floor)
            .clamp(0.0, 1.0)
    }
}

// ============================================================================
// Tests
// ============================================================================
