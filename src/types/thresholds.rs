//! Detection thresholds, learning bounds, and forecast risk levels

use serde::{Deserialize, Serialize};

/// Built-in threshold defaults
pub mod threshold_defaults {
    // === Line Loading ===
    /// Lines at or above this loading are "high" (%)
    pub const HIGH_LOADING: f64 = 90.0;
    /// Lines at or above this loading are "critical" (%)
    pub const CRITICAL_LOADING: f64 = 100.0;

    // === History-Based Detectors ===
    /// Minimum OLS slope of average loading to flag a trend (% per snapshot)
    pub const TREND_SLOPE: f64 = 5.0;
    /// Minimum snapshot-to-snapshot rise in average loading to flag a rating decline (%)
    pub const RATING_DECLINE: f64 = 10.0;
    /// Number of snapshots kept for trend/anomaly analysis
    pub const HISTORICAL_WINDOW: usize = 10;

    // === Learning Bounds ===
    /// Lowest value the learning loop may drive `high_loading` to (%)
    pub const HIGH_LOADING_MIN: f64 = 70.0;
    /// Highest value the learning loop may drive `high_loading` to (%)
    pub const HIGH_LOADING_MAX: f64 = 95.0;
    /// Fixed adjustment applied per feedback event (%)
    pub const LEARNING_STEP: f64 = 2.0;
    /// Maximum retained operator feedback records
    pub const FEEDBACK_HISTORY_CAP: usize = 100;

    // === Stress Levels ===
    pub const STRESS_CAUTION: f64 = 60.0;
    pub const STRESS_HIGH: f64 = 90.0;
    pub const STRESS_CRITICAL: f64 = 100.0;

    // === Anomaly Detection ===
    /// z-score above which an anomaly issue is raised
    pub const ANOMALY_Z_WARNING: f64 = 2.0;
    /// z-score above which an anomaly is escalated to high severity
    pub const ANOMALY_Z_HIGH: f64 = 3.0;
}

// ============================================================================
// Threshold Set
// ============================================================================

/// Tunable knobs controlling detector sensitivity.
///
/// Detectors and the predictor only ever see `&ThresholdSet`; the learning
/// loop is the single writer of `high_loading`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdSet {
    pub high_loading: f64,
    pub critical_loading: f64,
    pub trend_slope_threshold: f64,
    pub rating_decline_threshold: f64,
    pub historical_window: usize,
}

impl Default for ThresholdSet {
    fn default() -> Self {
        Self {
            high_loading: threshold_defaults::HIGH_LOADING,
            critical_loading: threshold_defaults::CRITICAL_LOADING,
            trend_slope_threshold: threshold_defaults::TREND_SLOPE,
            rating_decline_threshold: threshold_defaults::RATING_DECLINE,
            historical_window: threshold_defaults::HISTORICAL_WINDOW,
        }
    }
}

impl ThresholdSet {
    /// Collect every internal-consistency violation.
    pub fn violations(&self) -> Vec<String> {
        let mut errors = Vec::new();
        let finite = [
            ("high_loading", self.high_loading),
            ("critical_loading", self.critical_loading),
            ("trend_slope_threshold", self.trend_slope_threshold),
            ("rating_decline_threshold", self.rating_decline_threshold),
        ];
        for (name, value) in finite {
            if !value.is_finite() {
                errors.push(format!("thresholds.{name} must be finite (got {value})"));
            }
        }
        if self.critical_loading < self.high_loading {
            errors.push(format!(
                "thresholds.critical_loading ({:.1}) must be >= high_loading ({:.1})",
                self.critical_loading, self.high_loading
            ));
        }
        if self.trend_slope_threshold <= 0.0 {
            errors.push("thresholds.trend_slope_threshold must be > 0".to_string());
        }
        if self.rating_decline_threshold <= 0.0 {
            errors.push("thresholds.rating_decline_threshold must be > 0".to_string());
        }
        if self.historical_window == 0 {
            errors.push("thresholds.historical_window must be > 0".to_string());
        }
        errors
    }
}

// ============================================================================
// Forecast Risk
// ============================================================================

/// Per-line risk assigned to a forecast step.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    #[default]
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// Classify a forecast loading against the current thresholds.
    pub fn classify(loading_pct: f64, thresholds: &ThresholdSet) -> Self {
        if loading_pct >= thresholds.critical_loading {
            RiskLevel::High
        } else if loading_pct >= thresholds.high_loading {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "LOW"),
            RiskLevel::Medium => write!(f, "MEDIUM"),
            RiskLevel::High => write!(f, "HIGH"),
        }
    }
}
