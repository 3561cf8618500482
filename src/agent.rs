//! Grid Monitor Agent - the observe → detect → recommend → learn loop
//!
//! `GridMonitorAgent` owns the persistent state, the issue detector, the
//! forecast predictor, the recommender, the learning loop, and the decision
//! audit sink. Every autonomous decision is written to the audit sink with a
//! summary of the state at that moment.
//!
//! Mutating calls take `&mut self`; wrap the agent in [`SharedAgent`] to
//! serialize callers across threads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::{debug, info};

use crate::audit::{AuditEntry, AuditError, AuditSink, JsonlAuditLog};
use crate::config::AgentConfig;
use crate::detection::IssueDetector;
use crate::learning::{LearningLoop, ThresholdAdjustment};
use crate::prediction::{Predictor, RatingEngine};
use crate::recommendation::ActionRecommender;
use crate::state::{PersistentState, StateError};
use crate::types::{
    ForecastReport, Issue, OperatorFeedback, RatingSnapshot, Recommendation, RecommendationScope,
    ThresholdSet, WeatherParams,
};

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Agent is disabled in configuration")]
    Disabled,

    #[error(transparent)]
    Audit(#[from] AuditError),

    #[error(transparent)]
    State(#[from] StateError),
}

/// Point-in-time status report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Heartbeat {
    pub timestamp: DateTime<Utc>,
    pub state_version: String,
    pub history_size: usize,
    pub action_history_size: usize,
    pub thresholds: ThresholdSet,
}

/// Agent shared between threads; the mutex serializes state mutation.
pub type SharedAgent = Arc<Mutex<GridMonitorAgent>>;

// ============================================================================
// Agent
// ============================================================================

pub struct GridMonitorAgent {
    config: AgentConfig,
    state: PersistentState,
    detector: IssueDetector,
    predictor: Predictor,
    recommender: ActionRecommender,
    learning: LearningLoop,
    audit: Box<dyn AuditSink>,
}

impl GridMonitorAgent {
    /// Adopt `state`, pulling its `high_loading` inside the learning bounds.
    pub fn new(
        config: AgentConfig,
        mut state: PersistentState,
        engine: Box<dyn RatingEngine>,
        audit: Box<dyn AuditSink>,
    ) -> Self {
        let learning = LearningLoop::new(config.learning.clone());
        learning.enforce_bounds(&mut state);
        Self {
            config,
            state,
            detector: IssueDetector::default(),
            predictor: Predictor::new(engine),
            recommender: ActionRecommender,
            learning,
            audit,
        }
    }

    /// Build an agent from the configured state file and decision log.
    ///
    /// Missing or unusable state starts fresh from `config.thresholds`.
    pub fn open(config: AgentConfig, engine: Box<dyn RatingEngine>) -> Result<Self, AgentError> {
        let state = PersistentState::load_or_new(&config.agent.state_path, config.thresholds.clone());
        let audit = JsonlAuditLog::new(config.agent.decision_log_path.clone())?;
        let agent = Self::new(config, state, engine, Box::new(audit));
        info!(
            state_path = %agent.config.agent.state_path.display(),
            decision_log = %agent.config.agent.decision_log_path.display(),
            high_loading = agent.state.thresholds.high_loading,
            "Grid monitor agent ready"
        );
        Ok(agent)
    }

    pub fn into_shared(self) -> SharedAgent {
        Arc::new(Mutex::new(self))
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn state(&self) -> &PersistentState {
        &self.state
    }

    pub fn thresholds(&self) -> &ThresholdSet {
        &self.state.thresholds
    }

    fn ensure_enabled(&self) -> Result<(), AgentError> {
        if self.config.agent.enabled {
            Ok(())
        } else {
            Err(AgentError::Disabled)
        }
    }

    fn log_decision(&self, action: &str, details: serde_json::Value) -> Result<(), AuditError> {
        self.audit.record(&AuditEntry::new(action, details, &self.state))
    }

    // ========================================================================
    // Operations
    // ========================================================================

    /// Record a snapshot in the history and return every detected issue.
    ///
    /// The snapshot is pushed before any issue is audited. An `Err` from a
    /// failed audit write therefore still means the history advanced; the
    /// issues after the failing one are neither logged nor returned.
    pub fn monitor(&mut self, snapshot: &RatingSnapshot) -> Result<Vec<Issue>, AgentError> {
        self.ensure_enabled()?;
        let issues = self
            .detector
            .observe(&mut self.state, snapshot, &self.config.stress, Utc::now());

        for issue in &issues {
            let details = serde_json::to_value(issue).map_err(AuditError::from)?;
            self.log_decision(issue.kind.audit_action(), details)?;
        }
        debug!(
            lines = snapshot.lines.len(),
            avg_loading = snapshot.summary.avg_loading,
            issues = issues.len(),
            "Monitoring pass complete"
        );
        Ok(issues)
    }

    /// Forecast ratings and risk across the given weather horizon.
    pub fn predict(&mut self, forecast: &[WeatherParams]) -> Result<ForecastReport, AgentError> {
        self.ensure_enabled()?;
        let report = self
            .predictor
            .predict(forecast, &self.state.thresholds, &self.config.forecast);

        self.log_decision(
            "predictions_generated",
            json!({
                "forecast_count": forecast.len(),
                "success_count": report.success_count(),
            }),
        )?;
        Ok(report)
    }

    /// Rank the issues' actions. `limit` defaults to the configured value.
    pub fn recommend(
        &self,
        issues: &[Issue],
        scope: RecommendationScope,
        limit: Option<usize>,
    ) -> Result<Vec<Recommendation>, AgentError> {
        self.ensure_enabled()?;
        let limit = limit.unwrap_or(self.config.recommendations.default_limit);
        let recommendations = self.recommender.recommend(issues, scope, limit);

        self.log_decision(
            "recommendations_generated",
            json!({
                "issue_count": issues.len(),
                "recommendation_count": recommendations.len(),
                "top_priority": recommendations.first().map(|r| r.priority),
            }),
        )?;
        Ok(recommendations)
    }

    /// Apply operator feedback on a recommendation.
    pub fn learn(
        &mut self,
        action_id: &str,
        feedback: OperatorFeedback,
    ) -> Result<ThresholdAdjustment, AgentError> {
        self.ensure_enabled()?;
        let result = feedback.result.to_string();
        let adjustment = self.learning.learn(&mut self.state, action_id, feedback);

        self.log_decision(
            "feedback_received",
            json!({
                "action_id": action_id,
                "result": result,
                "updated_thresholds": self.state.thresholds,
            }),
        )?;
        Ok(adjustment)
    }

    pub fn heartbeat(&self) -> Heartbeat {
        Heartbeat {
            timestamp: Utc::now(),
            state_version: self.state.version.clone(),
            history_size: self.state.history.len(),
            action_history_size: self.state.action_history.len(),
            thresholds: self.state.thresholds.clone(),
        }
    }

    /// Flush state to the configured path. Returns `false` when persistence
    /// is disabled.
    pub fn save_state(&mut self) -> Result<bool, AgentError> {
        if !self.config.agent.persistence_enabled {
            debug!("Persistence disabled, state not saved");
            return Ok(false);
        }
        let path = self.config.agent.state_path.clone();
        self.state.save(&path)?;
        info!(path = %path.display(), "Agent state saved");
        Ok(true)
    }
}
