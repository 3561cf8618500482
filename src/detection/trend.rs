//! Loading trend detector: least-squares slope of recent average loading

use statrs::statistics::Statistics;

use super::{ensure_finite, DetectionContext, Detector, DetectorError};
use crate::types::{
    unit_confidence, Issue, IssueKind, MetricSnapshots, RecommendedAction, Severity, SYSTEM_WIDE,
};

/// Minimum history entries before a trend is evaluated
pub const MIN_TREND_POINTS: usize = 3;
/// Number of most recent entries fitted
pub const TREND_LOOKBACK: usize = 5;

/// Flags a sustained rise in average loading. Slope is in % per snapshot,
/// assuming evenly spaced monitoring calls.
pub struct TrendDetector;

impl Detector for TrendDetector {
    fn name(&self) -> &'static str {
        "Trend"
    }

    fn detect(&self, ctx: &DetectionContext<'_>) -> Result<Vec<Issue>, DetectorError> {
        if ctx.history.len() < MIN_TREND_POINTS {
            return Ok(Vec::new());
        }
        let start = ctx.history.len().saturating_sub(TREND_LOOKBACK);
        let recent = &ctx.history[start..];
        ensure_finite(self.name(), "avg_loading", recent)?;

        let slope = ols_slope(recent);
        let threshold = ctx.thresholds.trend_slope_threshold;
        if slope <= threshold {
            return Ok(Vec::new());
        }

        let confidence = unit_confidence(slope / (threshold * 2.0));
        let last = recent.last().copied().unwrap_or_default();
        Ok(vec![Issue {
            id: IssueKind::LoadingTrend.issue_id(&ctx.timestamp),
            kind: IssueKind::LoadingTrend,
            severity: Severity::Medium,
            reason: format!("Average loading increasing at {slope:.2}% per snapshot"),
            affected_lines: vec![SYSTEM_WIDE.to_string()],
            metric_snapshots: MetricSnapshots::Trend {
                recent_loadings: recent.to_vec(),
                slope,
                projected_next: last + slope,
            },
            timestamp: ctx.timestamp,
            confidence,
            recommended_actions: vec![RecommendedAction::new(
                "Review load forecast and adjust generation schedule",
                -slope * 10.0,
                -slope,
                "Proactive adjustment can prevent future overloads",
                confidence,
            )],
        }])
    }
}

/// Least-squares slope of `values` against their index.
///
/// slope = Σ[(xi - x̄)(yi - ȳ)] / Σ(xi - x̄)²
pub fn ols_slope(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let xs: Vec<f64> = (0..values.len()).map(|i| i as f64).collect();
    let x_mean = xs.iter().mean();
    let y_mean = values.iter().mean();

    let (num, den) = xs
        .iter()
        .zip(values)
        .fold((0.0, 0.0), |(num, den), (x, y)| {
            let dx = x - x_mean;
            (num + dx * (y - y_mean), den + dx * dx)
        });
    if den == 0.0 {
        0.0
    } else {
        num / den
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StressConfig;
    use crate::detection::test_support::{context, snapshot_with_avg};
    use crate::types::ThresholdSet;

    fn detect(history: &[f64]) -> Vec<Issue> {
        let snap = snapshot_with_avg(history.last().copied().unwrap_or_default());
        let thresholds = ThresholdSet::default();
        let stress = StressConfig::default();
        TrendDetector
            .detect(&context(&snap, history, &thresholds, &stress))
            .expect("finite history")
    }

    #[test]
    fn test_ols_slope_of_line() {
        assert!((ols_slope(&[10.0, 16.0, 22.0, 28.0]) - 6.0).abs() < 1e-12);
        assert_eq!(ols_slope(&[50.0; 5]), 0.0);
    }

    #[test]
    fn test_needs_three_points() {
        assert!(detect(&[10.0, 40.0]).is_empty());
    }

    #[test]
    fn test_steep_rise_flags_medium_issue() {
        let issues = detect(&[40.0, 48.0, 56.0, 64.0]);
        assert_eq!(issues.len(), 1);
        let issue = &issues[0];
        assert_eq!(issue.severity, Severity::Medium);
        assert_eq!(issue.affected_lines, vec![SYSTEM_WIDE.to_string()]);
        assert!((issue.confidence - 0.8).abs() < 1e-9);
        match &issue.metric_snapshots {
            MetricSnapshots::Trend { slope, projected_next, .. } => {
                assert!((slope - 8.0).abs() < 1e-9);
                assert!((projected_next - 72.0).abs() < 1e-9);
            }
            other => panic!("unexpected snapshot {other:?}"),
        }
        assert!((issue.recommended_actions[0].estimated_mva_change - -80.0).abs() < 1e-9);
    }

    #[test]
    fn test_only_last_five_points_fitted() {
        // Early spike outside the lookback must not affect the fit
        let issues = detect(&[0.0, 90.0, 50.0, 50.0, 50.0, 50.0, 50.0]);
        assert!(issues.is_empty());
    }

    #[test]
    fn test_nan_history_is_an_error() {
        let snap = snapshot_with_avg(50.0);
        let thresholds = ThresholdSet::default();
        let stress = StressConfig::default();
        let history = [40.0, f64::NAN, 50.0];
        let result = TrendDetector.detect(&context(&snap, &history, &thresholds, &stress));
        assert!(matches!(result, Err(DetectorError::NonFinite { .. })));
    }
}
