//! Overload detector: per-line loading against the critical and high thresholds

use std::collections::BTreeMap;

use super::{DetectionContext, Detector, DetectorError};
use crate::types::{
    Issue, IssueKind, LineMetrics, LineReading, MetricSnapshots, RecommendedAction, Severity,
};

/// Buckets lines into `critical` (>= critical_loading) and `high`
/// (>= high_loading and < critical_loading); each non-empty bucket is one issue.
pub struct OverloadDetector;

impl Detector for OverloadDetector {
    fn name(&self) -> &'static str {
        "Overload"
    }

    fn detect(&self, ctx: &DetectionContext<'_>) -> Result<Vec<Issue>, DetectorError> {
        let t = ctx.thresholds;
        let lines = &ctx.snapshot.lines;

        let critical: Vec<&LineReading> = lines
            .iter()
            .filter(|l| l.loading_pct >= t.critical_loading)
            .collect();
        let high: Vec<&LineReading> = lines
            .iter()
            .filter(|l| l.loading_pct >= t.high_loading && l.loading_pct < t.critical_loading)
            .collect();

        let mut issues = Vec::new();
        if !critical.is_empty() {
            issues.push(Issue {
                id: IssueKind::CriticalOverload.issue_id(&ctx.timestamp),
                kind: IssueKind::CriticalOverload,
                severity: Severity::Critical,
                reason: format!(
                    "{} line(s) at or above {}% loading",
                    critical.len(),
                    t.critical_loading
                ),
                affected_lines: critical.iter().map(|l| l.name.clone()).collect(),
                metric_snapshots: line_metrics(ctx, &critical),
                timestamp: ctx.timestamp,
                confidence: 1.0,
                recommended_actions: critical_actions(&critical),
            });
        }
        if !high.is_empty() {
            issues.push(Issue {
                id: IssueKind::HighLoading.issue_id(&ctx.timestamp),
                kind: IssueKind::HighLoading,
                severity: Severity::High,
                reason: format!(
                    "{} line(s) between {}-{}% loading",
                    high.len(),
                    t.high_loading,
                    t.critical_loading
                ),
                affected_lines: high.iter().map(|l| l.name.clone()).collect(),
                metric_snapshots: line_metrics(ctx, &high),
                timestamp: ctx.timestamp,
                confidence: 1.0,
                recommended_actions: high_actions(&high),
            });
        }
        Ok(issues)
    }
}

fn line_metrics(ctx: &DetectionContext<'_>, lines: &[&LineReading]) -> MetricSnapshots {
    let lines: BTreeMap<String, LineMetrics> = lines
        .iter()
        .map(|l| {
            (
                l.name.clone(),
                LineMetrics {
                    loading_pct: l.loading_pct,
                    rating_mva: l.rating_mva,
                    flow_mva: l.flow_mva,
                    margin_mva: l.margin_mva,
                    stress_level: ctx.stress.classify(l.loading_pct),
                },
            )
        })
        .collect();
    MetricSnapshots::Lines { lines }
}

fn critical_actions(lines: &[&LineReading]) -> Vec<RecommendedAction> {
    let excess: f64 = lines.iter().map(|l| l.flow_mva - l.rating_mva).sum();
    let margin: f64 = lines.iter().map(|l| l.margin_mva.abs()).sum();
    vec![
        RecommendedAction::new(
            "Immediate load shedding or line switching",
            -excess * 0.3,
            -20.0,
            "Critical overload requires immediate action to prevent equipment damage",
            0.95,
        ),
        RecommendedAction::new(
            "Emergency generation redispatch",
            -margin * 0.5,
            -15.0,
            "Redistribute power flow to relieve stressed lines",
            0.85,
        ),
    ]
}

fn high_actions(lines: &[&LineReading]) -> Vec<RecommendedAction> {
    let flow: f64 = lines.iter().map(|l| l.flow_mva).sum();
    vec![
        RecommendedAction::new(
            "Prepare contingency plans and increase monitoring",
            0.0,
            0.0,
            "High loading indicates potential for overload with minor changes",
            0.90,
        ),
        RecommendedAction::new(
            "Consider preemptive generation adjustment",
            -flow * 0.1,
            -10.0,
            "Small adjustments now can prevent critical issues later",
            0.75,
        ),
    ]
}
