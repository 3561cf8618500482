//! Rating decline detector: a jump in average loading between consecutive
//! snapshots, usually caused by weather lowering thermal ratings.

use super::{ensure_finite, DetectionContext, Detector, DetectorError};
use crate::types::{
    unit_confidence, Issue, IssueKind, MetricSnapshots, RecommendedAction, Severity, SYSTEM_WIDE,
};

pub struct RatingDeclineDetector;

impl Detector for RatingDeclineDetector {
    fn name(&self) -> &'static str {
        "RatingDecline"
    }

    fn detect(&self, ctx: &DetectionContext<'_>) -> Result<Vec<Issue>, DetectorError> {
        let n = ctx.history.len();
        if n < 2 {
            return Ok(Vec::new());
        }
        let previous = ctx.history[n - 2];
        let current = ctx.current_avg_loading();
        ensure_finite(self.name(), "avg_loading", &[previous, current])?;

        let change = current - previous;
        let threshold = ctx.thresholds.rating_decline_threshold;
        if change <= threshold {
            return Ok(Vec::new());
        }

        let confidence = unit_confidence(change / (threshold * 2.0));
        Ok(vec![Issue {
            id: IssueKind::RatingDecline.issue_id(&ctx.timestamp),
            kind: IssueKind::RatingDecline,
            severity: Severity::Medium,
            reason: format!(
                "Average loading increased by {change:.1}% (likely weather-driven rating decline)"
            ),
            affected_lines: vec![SYSTEM_WIDE.to_string()],
            metric_snapshots: MetricSnapshots::RatingDecline {
                previous_avg_loading: previous,
                current_avg_loading: current,
                change,
            },
            timestamp: ctx.timestamp,
            confidence,
            recommended_actions: vec![RecommendedAction::new(
                "Monitor weather forecast and prepare for further rating reductions",
                0.0,
                0.0,
                "Weather conditions may continue to degrade line ratings",
                confidence,
            )],
        }])
    }
}
