//! Snapshot types: LineReading, SnapshotSummary, RatingSnapshot, GridSnapshot, StressLevel

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Rating Engine Output / Monitor Input
// ============================================================================

/// Per-line thermal loading as produced by the rating engine.
///
/// Missing numeric fields deserialize as 0.0 so partially populated engine
/// output can still be monitored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineReading {
    /// Line identifier (e.g. "L12")
    pub name: String,
    /// Loading as a percentage of the thermal rating (flow / rating × 100)
    #[serde(default)]
    pub loading_pct: f64,
    /// Thermal rating under the current weather (MVA)
    #[serde(default)]
    pub rating_mva: f64,
    /// Apparent power flow on the line (MVA)
    #[serde(default)]
    pub flow_mva: f64,
    /// Rating minus flow (MVA); negative means overloaded
    #[serde(default)]
    pub margin_mva: f64,
}

impl LineReading {
    /// Build a reading from flow and rating, deriving loading and margin.
    pub fn from_flow(name: impl Into<String>, flow_mva: f64, rating_mva: f64) -> Self {
        let loading_pct = if rating_mva > 0.0 {
            flow_mva / rating_mva * 100.0
        } else {
            0.0
        };
        Self {
            name: name.into(),
            loading_pct,
            rating_mva,
            flow_mva,
            margin_mva: rating_mva - flow_mva,
        }
    }
}

/// System-wide summary statistics attached to a rating snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotSummary {
    /// Mean loading across all lines (%)
    #[serde(default)]
    pub avg_loading: f64,
    /// Highest loading of any line (%)
    #[serde(default)]
    pub max_loading: f64,
    /// Lines at or above 100% loading
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overloaded_lines: Option<usize>,
    /// Lines at or above 90% loading
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub high_stress_lines: Option<usize>,
    /// Lines at or above 60% loading
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caution_lines: Option<usize>,
    /// Total number of rated lines
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_lines: Option<usize>,
}

/// Structured output of one rating-engine run: `{lines, summary}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RatingSnapshot {
    #[serde(default)]
    pub lines: Vec<LineReading>,
    #[serde(default)]
    pub summary: SnapshotSummary,
}

impl RatingSnapshot {
    /// Build a snapshot from line readings, computing the summary.
    pub fn from_lines(lines: Vec<LineReading>) -> Self {
        let count = lines.len();
        let (sum, max) = lines.iter().fold((0.0_f64, 0.0_f64), |(s, m), l| {
            (s + l.loading_pct, m.max(l.loading_pct))
        });
        let avg_loading = if count == 0 { 0.0 } else { sum / count as f64 };
        let count_at = |pct: f64| lines.iter().filter(|l| l.loading_pct >= pct).count();

        let summary = SnapshotSummary {
            avg_loading,
            max_loading: max,
            overloaded_lines: Some(count_at(100.0)),
            high_stress_lines: Some(count_at(90.0)),
            caution_lines: Some(count_at(60.0)),
            total_lines: Some(count),
        };
        Self { lines, summary }
    }
}

// ============================================================================
// History Entry
// ============================================================================

/// Condensed snapshot kept in the bounded monitoring history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridSnapshot {
    pub timestamp: DateTime<Utc>,
    pub avg_loading: f64,
    pub max_loading: f64,
    pub line_count: usize,
}

impl GridSnapshot {
    pub fn capture(snapshot: &RatingSnapshot, timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            avg_loading: snapshot.summary.avg_loading,
            max_loading: snapshot.summary.max_loading,
            line_count: snapshot.lines.len(),
        }
    }
}

// ============================================================================
// Stress Level
// ============================================================================

/// Severity bucket derived from a line's loading percentage.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum StressLevel {
    Normal,
    Caution,
    High,
    Critical,
}

impl StressLevel {
    /// Classify a loading percentage against caution/high/critical cut-offs.
    pub fn classify(loading_pct: f64, caution: f64, high: f64, critical: f64) -> Self {
        if loading_pct < caution {
            StressLevel::Normal
        } else if loading_pct < high {
            StressLevel::Caution
        } else if loading_pct < critical {
            StressLevel::High
        } else {
            StressLevel::Critical
        }
    }
}

impl std::fmt::Display for StressLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StressLevel::Normal => write!(f, "normal"),
            StressLevel::Caution => write!(f, "caution"),
            StressLevel::High => write!(f, "high"),
            StressLevel::Critical => write!(f, "critical"),
        }
    }
}
