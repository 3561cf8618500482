//! Issue detection over the current rating snapshot and monitoring history
//!
//! Each call to [`IssueDetector::observe`] appends the snapshot to the
//! bounded history and then runs the detectors in order. Detectors are
//! independent: one returning an error is logged and skipped, the rest
//! still run.
//!
//! ## Detectors
//!
//! 1. **Overload** - per-line critical and high loading buckets
//! 2. **Trend** - OLS slope of recent average loading (>= 3 snapshots)
//! 3. **RatingDecline** - snapshot-to-snapshot jump in average loading (>= 2 snapshots)
//! 4. **Anomaly** - z-score of current loading against history (>= 5 snapshots)

pub mod overload;
pub mod trend;
pub mod rating_decline;
pub mod anomaly;

pub use anomaly::AnomalyDetector;
pub use overload::OverloadDetector;
pub use rating_decline::RatingDeclineDetector;
pub use trend::TrendDetector;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::StressConfig;
use crate::state::PersistentState;
use crate::types::{GridSnapshot, Issue, RatingSnapshot, ThresholdSet};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum DetectorError {
    #[error("{detector}: non-finite {metric} ({value})")]
    NonFinite {
        detector: &'static str,
        metric: &'static str,
        value: f64,
    },
}

/// Read-only inputs shared by every detector for one monitoring pass.
#[derive(Debug, Clone, Copy)]
pub struct DetectionContext<'a> {
    pub snapshot: &'a RatingSnapshot,
    /// Average loading per history entry, oldest first, current snapshot last
    pub history: &'a [f64],
    pub thresholds: &'a ThresholdSet,
    pub stress: &'a StressConfig,
    pub timestamp: DateTime<Utc>,
}

impl DetectionContext<'_> {
    pub fn current_avg_loading(&self) -> f64 {
        self.snapshot.summary.avg_loading
    }
}

/// A single, independent issue detector.
pub trait Detector: Send + Sync {
    /// Detector name used in logs
    fn name(&self) -> &'static str;

    /// Inspect the context and return zero or more issues
    fn detect(&self, ctx: &DetectionContext<'_>) -> Result<Vec<Issue>, DetectorError>;
}

/// Create the four standard detectors in evaluation order
pub fn default_detectors() -> Vec<Box<dyn Detector>> {
    vec![
        Box::new(OverloadDetector),
        Box::new(TrendDetector),
        Box::new(RatingDeclineDetector),
        Box::new(AnomalyDetector),
    ]
}

// ============================================================================
// Issue Detector
// ============================================================================

pub struct IssueDetector {
    detectors: Vec<Box<dyn Detector>>,
}

impl Default for IssueDetector {
    fn default() -> Self {
        Self::new(default_detectors())
    }
}

impl IssueDetector {
    pub fn new(detectors: Vec<Box<dyn Detector>>) -> Self {
        Self { detectors }
    }

    /// Record `snapshot` in the history, then run every detector.
    pub fn observe(
        &self,
        state: &mut PersistentState,
        snapshot: &RatingSnapshot,
        stress: &StressConfig,
        timestamp: DateTime<Utc>,
    ) -> Vec<Issue> {
        let window = state.thresholds.historical_window;
        state.push_snapshot(GridSnapshot::capture(snapshot, timestamp), window);

        let history = state.avg_loadings();
        let ctx = DetectionContext {
            snapshot,
            history: &history,
            thresholds: &state.thresholds,
            stress,
            timestamp,
        };
        self.run(&ctx)
    }

    /// Run every detector against `ctx`, isolating failures.
    pub fn run(&self, ctx: &DetectionContext<'_>) -> Vec<Issue> {
        let mut issues = Vec::new();
        for detector in &self.detectors {
            match detector.detect(ctx) {
                Ok(found) => {
                    if !found.is_empty() {
                        debug!(detector = detector.name(), count = found.len(), "Issues detected");
                    }
                    issues.extend(found);
                }
                Err(e) => {
                    warn!(detector = detector.name(), error = %e, "Detector failed, skipping");
                }
            }
        }
        issues
    }
}

/// Reject NaN/inf inputs before they reach arithmetic that would hide them.
pub(crate) fn ensure_finite(
    detector: &'static str,
    metric: &'static str,
    values: &[f64],
) -> Result<(), DetectorError> {
    match values.iter().find(|v| !v.is_finite()) {
        Some(&value) => Err(DetectorError::NonFinite { detector, metric, value }),
        None => Ok(()),
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::types::LineReading;

    pub fn snapshot_with_avg(avg: f64) -> RatingSnapshot {
        let mut snap = RatingSnapshot::from_lines(vec![LineReading::from_flow("L1", avg, 100.0)]);
        snap.summary.avg_loading = avg;
        snap
    }

    pub fn context<'a>(
        snapshot: &'a RatingSnapshot,
        history: &'a [f64],
        thresholds: &'a ThresholdSet,
        stress: &'a StressConfig,
    ) -> DetectionContext<'a> {
        DetectionContext {
            snapshot,
            history,
            thresholds,
            stress,
            timestamp: Utc::now(),
        }
    }
}
