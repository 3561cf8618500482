//! Anomaly detector: z-score of the current average loading against the
//! rest of the monitoring history.

use statrs::statistics::Statistics;

use super::{ensure_finite, DetectionContext, Detector, DetectorError};
use crate::types::threshold_defaults::{ANOMALY_Z_HIGH, ANOMALY_Z_WARNING};
use crate::types::{
    unit_confidence, Issue, IssueKind, MetricSnapshots, RecommendedAction, Severity, SYSTEM_WIDE,
};

/// Minimum history entries (including the current one) before evaluating
pub const MIN_ANOMALY_POINTS: usize = 5;

pub struct AnomalyDetector;

impl Detector for AnomalyDetector {
    fn name(&self) -> &'static str {
        "Anomaly"
    }

    fn detect(&self, ctx: &DetectionContext<'_>) -> Result<Vec<Issue>, DetectorError> {
        let n = ctx.history.len();
        if n < MIN_ANOMALY_POINTS {
            return Ok(Vec::new());
        }
        let baseline = &ctx.history[..n - 1];
        let current = ctx.current_avg_loading();
        ensure_finite(self.name(), "avg_loading", baseline)?;
        ensure_finite(self.name(), "avg_loading", &[current])?;

        let mean = baseline.iter().mean();
        let std = baseline.iter().population_std_dev();
        if std == 0.0 {
            return Ok(Vec::new());
        }

        let z_score = (current - mean).abs() / std;
        if z_score <= ANOMALY_Z_WARNING {
            return Ok(Vec::new());
        }

        let confidence = unit_confidence(z_score / 4.0);
        let severity = if z_score > ANOMALY_Z_HIGH {
            Severity::High
        } else {
            Severity::Medium
        };
        Ok(vec![Issue {
            id: IssueKind::Anomaly.issue_id(&ctx.timestamp),
            kind: IssueKind::Anomaly,
            severity,
            reason: format!(
                "Current loading ({current:.1}%) deviates {z_score:.1} std deviations from baseline"
            ),
            affected_lines: vec![SYSTEM_WIDE.to_string()],
            metric_snapshots: MetricSnapshots::Anomaly {
                current_loading: current,
                baseline_mean: mean,
                baseline_std: std,
                z_score,
            },
            timestamp: ctx.timestamp,
            confidence,
            recommended_actions: vec![RecommendedAction::new(
                "Investigate cause of sudden loading change",
                0.0,
                0.0,
                "Unexpected changes may indicate equipment issues or data anomalies",
                confidence,
            )],
        }])
    }
}
