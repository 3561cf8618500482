//! Issue types: Severity, IssueKind, Issue, RecommendedAction, MetricSnapshots

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::StressLevel;

/// Affected-lines marker for issues that concern the grid as a whole.
pub const SYSTEM_WIDE: &str = "system-wide";

/// Clamp a confidence value into `[0, 1]`, mapping NaN to 0.
pub fn unit_confidence(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

// ============================================================================
// Severity
// ============================================================================

/// Issue severity, ordered from least to most urgent.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Recommendation priority: 1 is most urgent.
    pub fn priority(self) -> u8 {
        match self {
            Severity::Critical => 1,
            Severity::High => 2,
            Severity::Medium => 3,
            Severity::Low => 4,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Low => write!(f, "LOW"),
            Severity::Medium => write!(f, "MEDIUM"),
            Severity::High => write!(f, "HIGH"),
            Severity::Critical => write!(f, "CRITICAL"),
        }
    }
}

// ============================================================================
// Issue Kind
// ============================================================================

/// Which detector produced an issue.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    CriticalOverload,
    HighLoading,
    LoadingTrend,
    RatingDecline,
    Anomaly,
}

impl IssueKind {
    /// Prefix used when building issue ids.
    pub fn id_prefix(self) -> &'static str {
        match self {
            IssueKind::CriticalOverload => "critical_loading",
            IssueKind::HighLoading => "high_loading",
            IssueKind::LoadingTrend => "loading_trend",
            IssueKind::RatingDecline => "rating_decline",
            IssueKind::Anomaly => "anomaly",
        }
    }

    /// Decision-log action name written when an issue of this kind is raised.
    pub fn audit_action(self) -> &'static str {
        match self {
            IssueKind::CriticalOverload => "critical_overload_detected",
            IssueKind::HighLoading => "high_loading_detected",
            IssueKind::LoadingTrend => "loading_trend_detected",
            IssueKind::RatingDecline => "rating_decline_detected",
            IssueKind::Anomaly => "anomaly_detected",
        }
    }

    pub fn issue_id(self, timestamp: &DateTime<Utc>) -> String {
        format!("{}_{}", self.id_prefix(), timestamp.to_rfc3339())
    }
}

// ============================================================================
// Metric Snapshots
// ============================================================================

/// Loading figures for one affected line at detection time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineMetrics {
    pub loading_pct: f64,
    pub rating_mva: f64,
    pub flow_mva: f64,
    pub margin_mva: f64,
    pub stress_level: StressLevel,
}

/// Evidence captured by the detector that raised an issue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MetricSnapshots {
    Lines {
        lines: BTreeMap<String, LineMetrics>,
    },
    Trend {
        recent_loadings: Vec<f64>,
        slope: f64,
        projected_next: f64,
    },
    RatingDecline {
        previous_avg_loading: f64,
        current_avg_loading: f64,
        change: f64,
    },
    Anomaly {
        current_loading: f64,
        baseline_mean: f64,
        baseline_std: f64,
        z_score: f64,
    },
}

// ============================================================================
// Recommended Action
// ============================================================================

/// A remedial action proposed by a detector, with estimated impact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendedAction {
    pub action: String,
    /// Estimated change in flow on the affected lines (MVA, negative = relief)
    pub estimated_mva_change: f64,
    /// Estimated change in loading (percentage points)
    pub estimated_pct_change: f64,
    pub reasoning: String,
    pub confidence: f64,
}

impl RecommendedAction {
    pub fn new(
        action: impl Into<String>,
        estimated_mva_change: f64,
        estimated_pct_change: f64,
        reasoning: impl Into<String>,
        confidence: f64,
    ) -> Self {
        Self {
            action: action.into(),
            estimated_mva_change,
            estimated_pct_change,
            reasoning: reasoning.into(),
            confidence: unit_confidence(confidence),
        }
    }
}

// ============================================================================
// Issue
// ============================================================================

/// A detected grid condition. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub id: String,
    pub kind: IssueKind,
    pub severity: Severity,
    pub reason: String,
    pub affected_lines: Vec<String>,
    pub metric_snapshots: MetricSnapshots,
    pub timestamp: DateTime<Utc>,
    pub confidence: f64,
    pub recommended_actions: Vec<RecommendedAction>,
}

impl Issue {
    /// Whether the issue names concrete lines rather than the whole system.
    pub fn is_line_specific(&self) -> bool {
        !self.affected_lines.is_empty() && self.affected_lines.iter().all(|l| l != SYSTEM_WIDE)
    }
}
