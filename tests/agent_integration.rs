//! Agent Integration Tests
//!
//! Drives `GridMonitorAgent` end to end through the public API: detection,
//! recommendation, learning, forecasting, state persistence and the
//! JSON-lines decision log on disk.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use gridwatch::config::AgentConfig;
use gridwatch::learning::ThresholdAdjustment;
use gridwatch::types::{LineReading, RatingSnapshot, RecommendationScope, WeatherConditions};
use gridwatch::{
    GridMonitorAgent, IssueKind, JsonlAuditLog, OperatorFeedback, PersistentState, RatingEngine,
    RatingError, ReplayRatingEngine, RiskLevel, Severity, WeatherParams,
};

// ============================================================================
// Helpers
// ============================================================================

/// Config with state and decision log placed in a temp directory.
fn temp_config(dir: &tempfile::TempDir) -> AgentConfig {
    let mut config = AgentConfig::default();
    config.agent.state_path = dir.path().join("state").join("agent_state.json");
    config.agent.decision_log_path = dir.path().join("logs").join("decisions.log");
    config
}

fn open_agent(config: AgentConfig) -> GridMonitorAgent {
    GridMonitorAgent::open(config, Box::new(ReplayRatingEngine::new(Vec::new())))
        .expect("agent should open")
}

/// Snapshot of `n` identical lines at the given loading.
fn uniform_snapshot(n: usize, loading_pct: f64) -> RatingSnapshot {
    RatingSnapshot::from_lines(
        (0..n)
            .map(|i| LineReading::from_flow(format!("L{i}"), loading_pct, 100.0))
            .collect(),
    )
}

/// Rating engine that fails on one call and otherwise derates with heat.
struct FlakyEngine {
    calls: AtomicUsize,
    fail_on: usize,
}

impl RatingEngine for FlakyEngine {
    fn rate(&self, conditions: &WeatherConditions) -> Result<RatingSnapshot, RatingError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call == self.fail_on {
            return Err(RatingError::Engine("power flow diverged".to_string()));
        }
        let rating = 180.0 - 2.0 * conditions.ta;
        Ok(RatingSnapshot::from_lines(vec![
            LineReading::from_flow("North", 110.0, rating),
            LineReading::from_flow("South", 40.0, rating),
        ]))
    }
}

fn step(ta: f64) -> WeatherParams {
    WeatherParams {
        ta: Some(ta),
        ..WeatherParams::default()
    }
}

// ============================================================================
// Detection and Recommendation
// ============================================================================

#[test]
fn overloaded_line_yields_single_certain_critical_issue() {
    let dir = tempfile::tempdir().expect("tmpdir");
    let mut agent = open_agent(temp_config(&dir));

    let snap = RatingSnapshot::from_lines(vec![
        LineReading::from_flow("Kahe-Wahiawa", 105.0, 100.0),
        LineReading::from_flow("Halawa-Iwilei", 40.0, 100.0),
    ]);
    let issues = agent.monitor(&snap).expect("monitor");

    assert_eq!(issues.len(), 1, "Only the overload should fire: {issues:?}");
    let issue = &issues[0];
    assert_eq!(issue.kind, IssueKind::CriticalOverload);
    assert_eq!(issue.severity, Severity::Critical);
    assert_eq!(issue.affected_lines, vec!["Kahe-Wahiawa".to_string()]);
    assert_eq!(issue.confidence, 1.0);
    assert!(issue.id.starts_with("critical_loading_"));
}

#[test]
fn flat_history_raises_no_trend_or_anomaly() {
    let dir = tempfile::tempdir().expect("tmpdir");
    let mut agent = open_agent(temp_config(&dir));

    for _ in 0..5 {
        let issues = agent.monitor(&uniform_snapshot(4, 50.0)).expect("monitor");
        assert!(issues.is_empty(), "Steady 50% loading must be quiet: {issues:?}");
    }
    assert_eq!(agent.state().history.len(), 5);
}

#[test]
fn rising_load_is_flagged_as_trend() {
    let dir = tempfile::tempdir().expect("tmpdir");
    let mut agent = open_agent(temp_config(&dir));

    let mut kinds = Vec::new();
    for loading in [40.0, 48.0, 56.0, 64.0, 72.0] {
        let issues = agent.monitor(&uniform_snapshot(3, loading)).expect("monitor");
        kinds.extend(issues.into_iter().map(|i| i.kind));
    }
    assert!(kinds.contains(&IssueKind::LoadingTrend), "got {kinds:?}");
}

#[test]
fn line_scope_drops_system_wide_issues() {
    let dir = tempfile::tempdir().expect("tmpdir");
    let mut agent = open_agent(temp_config(&dir));

    let mut issues = Vec::new();
    for loading in [40.0, 48.0, 56.0, 64.0] {
        issues = agent.monitor(&uniform_snapshot(3, loading)).expect("monitor");
    }
    let mut snap = uniform_snapshot(3, 72.0);
    snap.lines.push(LineReading::from_flow("Hot", 112.0, 100.0));
    snap = RatingSnapshot::from_lines(snap.lines);
    issues.extend(agent.monitor(&snap).expect("monitor"));

    let grid = agent
        .recommend(&issues, RecommendationScope::Grid, Some(50))
        .expect("grid recommendations");
    let line = agent
        .recommend(&issues, RecommendationScope::Line, Some(50))
        .expect("line recommendations");

    assert!(line.len() < grid.len(), "line={} grid={}", line.len(), grid.len());
    assert!(line.iter().all(|r| r.id.starts_with("critical_loading_")));
    assert!(grid.windows(2).all(|w| w[0].priority <= w[1].priority));
}

// ============================================================================
// Learning
// ============================================================================

#[test]
fn repeated_rejections_saturate_at_upper_bound() {
    let dir = tempfile::tempdir().expect("tmpdir");
    let mut agent = open_agent(temp_config(&dir));

    for i in 0..20 {
        agent
            .learn(&format!("high_loading_x_action_{i}"), OperatorFeedback::rejected())
            .expect("learn");
    }
    assert_eq!(agent.thresholds().high_loading, 95.0);
    assert_eq!(agent.state().action_history.len(), 20);

    let last = agent
        .learn("high_loading_x_action_20", OperatorFeedback::rejected())
        .expect("learn");
    assert_eq!(last, ThresholdAdjustment::Raised { from: 95.0, to: 95.0 });
}

#[test]
fn acceptance_outcome_decides_threshold_direction() {
    let dir = tempfile::tempdir().expect("tmpdir");
    let mut agent = open_agent(temp_config(&dir));

    let kept = agent
        .learn("critical_loading_x_action_0", OperatorFeedback::accepted(true))
        .expect("learn");
    assert_eq!(kept, ThresholdAdjustment::Maintained);

    let lowered = agent
        .learn("critical_loading_x_action_1", OperatorFeedback::accepted(false))
        .expect("learn");
    assert_eq!(lowered, ThresholdAdjustment::Lowered { from: 90.0, to: 88.0 });
    assert_eq!(agent.thresholds().high_loading, 88.0);
}

// ============================================================================
// Forecasting
// ============================================================================

#[test]
fn failed_forecast_step_is_isolated() {
    let dir = tempfile::tempdir().expect("tmpdir");
    let config = temp_config(&dir);
    let engine = FlakyEngine {
        calls: AtomicUsize::new(0),
        fail_on: 1,
    };
    let mut agent = GridMonitorAgent::open(config.clone(), Box::new(engine)).expect("open");

    let report = agent.predict(&[step(20.0), step(30.0), step(40.0)]).expect("predict");

    assert_eq!(report.predictions.len(), 3);
    assert!(report.predictions[0].is_success());
    assert!(report.predictions[2].is_success());
    assert!(report.predictions[1].error().is_some());
    assert_eq!(report.predictions[1].confidence(), 0.0);
    assert_eq!(report.success_count(), 2);

    // Confidence decays with step position, not with success count
    assert!((report.predictions[0].confidence() - 1.0).abs() < 1e-9);
    assert!((report.predictions[2].confidence() - 0.8).abs() < 1e-9);

    let log = JsonlAuditLog::new(config.agent.decision_log_path).expect("log");
    let entries = log.read_entries().expect("entries");
    let last = entries.last().expect("predict entry");
    assert_eq!(last.action, "predictions_generated");
    assert_eq!(last.details["forecast_count"], 3);
    assert_eq!(last.details["success_count"], 2);
}

#[test]
fn hot_forecast_marks_loaded_line_high_risk() {
    let dir = tempfile::tempdir().expect("tmpdir");
    let engine = FlakyEngine {
        calls: AtomicUsize::new(0),
        fail_on: usize::MAX,
    };
    let mut agent = GridMonitorAgent::open(temp_config(&dir), Box::new(engine)).expect("open");

    // Rating 180 - 2 * 40 = 100 MVA, so North runs at 110%
    let report = agent.predict(&[step(40.0)]).expect("predict");
    match &report.predictions[0] {
        gridwatch::PredictionOutcome::Forecast {
            predicted_ratings,
            risk_levels,
            ..
        } => {
            assert_eq!(predicted_ratings["North"], 100.0);
            assert_eq!(risk_levels["North"], RiskLevel::High);
            assert_eq!(risk_levels["South"], RiskLevel::Low);
        }
        other => panic!("expected forecast, got {other:?}"),
    }
}

// ============================================================================
// Persistence and Decision Log
// ============================================================================

#[test]
fn state_survives_restart() {
    let dir = tempfile::tempdir().expect("tmpdir");
    let config = temp_config(&dir);

    let saved = {
        let mut agent = open_agent(config.clone());
        agent.monitor(&uniform_snapshot(2, 55.0)).expect("monitor");
        agent.monitor(&uniform_snapshot(2, 58.0)).expect("monitor");
        agent
            .learn("high_loading_x_action_0", OperatorFeedback::rejected())
            .expect("learn");
        assert!(agent.save_state().expect("save"));
        agent.state().clone()
    };

    let loaded = PersistentState::load_from_file(&config.agent.state_path).expect("load");
    assert_eq!(loaded.history, saved.history);
    assert_eq!(loaded.action_history, saved.action_history);
    assert_eq!(loaded.thresholds, saved.thresholds);
    assert_eq!(loaded.version, saved.version);

    let reopened = open_agent(config);
    assert_eq!(reopened.thresholds().high_loading, 92.0);
    assert_eq!(reopened.heartbeat().history_size, 2);
}

#[test]
fn out_of_range_stored_threshold_is_clamped_on_open() {
    let dir = tempfile::tempdir().expect("tmpdir");
    let config = temp_config(&dir);

    let mut stored = PersistentState::default();
    stored.thresholds.high_loading = 50.0;
    stored.save(&config.agent.state_path).expect("save");

    let mut agent = open_agent(config);
    assert_eq!(agent.thresholds().high_loading, 70.0);

    agent
        .learn("high_loading_x_action_0", OperatorFeedback::rejected())
        .expect("learn");
    assert_eq!(agent.thresholds().high_loading, 72.0);
}

#[test]
fn learned_thresholds_reload_with_low_critical_limit() {
    let dir = tempfile::tempdir().expect("tmpdir");
    let mut config = temp_config(&dir);
    config.thresholds.critical_loading = 92.0;
    config.learning.high_loading_max = 92.0;
    config.validate().expect("consistent config");

    let mut agent = open_agent(config.clone());
    agent.monitor(&uniform_snapshot(2, 60.0)).expect("monitor");
    for i in 0..3 {
        agent
            .learn(&format!("high_loading_x_action_{i}"), OperatorFeedback::rejected())
            .expect("learn");
    }
    assert_eq!(agent.thresholds().high_loading, 92.0);
    agent.save_state().expect("save");

    let loaded = PersistentState::load_from_file(&config.agent.state_path)
        .expect("learned state must stay loadable");
    assert_eq!(loaded.action_history.len(), 3);
    assert_eq!(loaded.history.len(), 1);
    assert_eq!(&loaded.thresholds, agent.thresholds());
}

#[test]
fn history_is_bounded_and_heartbeat_is_read_only() {
    let dir = tempfile::tempdir().expect("tmpdir");
    let config = temp_config(&dir);
    let window = config.thresholds.historical_window;
    let mut agent = open_agent(config);

    for n in 1..=window + 5 {
        agent.monitor(&uniform_snapshot(3, 50.0)).expect("monitor");
        assert_eq!(agent.heartbeat().history_size, n.min(window), "after {n} snapshots");
    }

    let before = agent.state().clone();
    let first = agent.heartbeat();
    let second = agent.heartbeat();
    assert_eq!(agent.state(), &before);
    assert_eq!(first.history_size, second.history_size);
    assert_eq!(first.thresholds, second.thresholds);
}

#[test]
fn corrupt_state_file_starts_fresh_from_config() {
    let dir = tempfile::tempdir().expect("tmpdir");
    let mut config = temp_config(&dir);
    config.thresholds.high_loading = 85.0;
    std::fs::create_dir_all(config.agent.state_path.parent().expect("parent")).expect("mkdir");
    std::fs::write(&config.agent.state_path, "{ not json").expect("write");

    let agent = open_agent(config);
    assert_eq!(agent.thresholds().high_loading, 85.0);
    assert_eq!(agent.heartbeat().history_size, 0);
}

#[test]
fn decision_log_records_each_decision_in_order() {
    let dir = tempfile::tempdir().expect("tmpdir");
    let config = temp_config(&dir);
    let mut agent = open_agent(config.clone());

    let snap = RatingSnapshot::from_lines(vec![
        LineReading::from_flow("A", 120.0, 100.0),
        LineReading::from_flow("B", 92.0, 100.0),
    ]);
    let issues = agent.monitor(&snap).expect("monitor");
    let recs = agent
        .recommend(&issues, RecommendationScope::Grid, None)
        .expect("recommend");
    agent.learn(&recs[0].id, OperatorFeedback::accepted(true)).expect("learn");

    let log = JsonlAuditLog::new(config.agent.decision_log_path).expect("log");
    let actions: Vec<String> = log
        .read_entries()
        .expect("entries")
        .into_iter()
        .map(|e| e.action)
        .collect();
    assert_eq!(
        actions,
        vec![
            "critical_overload_detected",
            "high_loading_detected",
            "recommendations_generated",
            "feedback_received",
        ]
    );
}

#[test]
fn shared_agent_serializes_concurrent_feedback() {
    let dir = tempfile::tempdir().expect("tmpdir");
    let mut config = temp_config(&dir);
    config.learning.feedback_history_cap = 1000;
    let shared = open_agent(config).into_shared();

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let agent = shared.clone();
            thread::spawn(move || {
                for i in 0..10 {
                    let mut guard = agent.lock().expect("lock");
                    guard
                        .learn(&format!("t{t}_action_{i}"), OperatorFeedback::rejected())
                        .expect("learn");
                }
            })
        })
        .collect();
    for h in handles {
        h.join().expect("thread");
    }

    let agent = shared.lock().expect("lock");
    assert_eq!(agent.state().action_history.len(), 40);
    assert_eq!(agent.thresholds().high_loading, 95.0);
}
