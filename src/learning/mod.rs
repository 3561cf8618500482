//! Feedback-driven threshold learning
//!
//! A bounded single-knob controller on `high_loading`:
//!
//! | result   | success        | effect                              |
//! |----------|----------------|-------------------------------------|
//! | accepted | true           | none                                |
//! | accepted | false / absent | lower by `step`, floor at `min`     |
//! | rejected | any            | raise by `step`, ceiling at `max`   |
//!
//! Every write is kept within `min..=max` and never above
//! `critical_loading`, so a persisted threshold set always reloads.
//! | other    | any            | none                                |
//!
//! Lowering the threshold makes the high-loading detector fire earlier; an
//! accepted action that did not help means the agent acted too late.

use chrono::Utc;
use tracing::{info, warn};

use crate::config::LearningConfig;
use crate::state::PersistentState;
use crate::types::{ActionFeedbackRecord, FeedbackResult, OperatorFeedback};

/// What a feedback event did to the thresholds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ThresholdAdjustment {
    Maintained,
    Lowered { from: f64, to: f64 },
    Raised { from: f64, to: f64 },
    Ignored,
}

#[derive(Debug, Clone)]
pub struct LearningLoop {
    config: LearningConfig,
}

impl LearningLoop {
    pub fn new(config: LearningConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LearningConfig {
        &self.config
    }

    /// Record the feedback and adjust `high_loading`. This is the only
    /// writer of the threshold set after startup.
    pub fn learn(
        &self,
        state: &mut PersistentState,
        action_id: &str,
        feedback: OperatorFeedback,
    ) -> ThresholdAdjustment {
        let ceiling = self.ceiling(state.thresholds.critical_loading);
        let adjustment = self.adjustment_for(state.thresholds.high_loading, ceiling, &feedback);
        match adjustment {
            ThresholdAdjustment::Lowered { to, .. } | ThresholdAdjustment::Raised { to, .. } => {
                state.thresholds.high_loading = to;
            }
            ThresholdAdjustment::Maintained | ThresholdAdjustment::Ignored => {}
        }

        match adjustment {
            ThresholdAdjustment::Maintained => {
                info!(action_id, "Action successful, thresholds maintained");
            }
            ThresholdAdjustment::Lowered { from, to } => {
                info!(action_id, from, to, "Action accepted but unsuccessful, lowering high_loading threshold");
            }
            ThresholdAdjustment::Raised { from, to } => {
                info!(action_id, from, to, "Action rejected, raising high_loading threshold");
            }
            ThresholdAdjustment::Ignored => {
                info!(action_id, result = %feedback.result, "Unrecognized feedback result, thresholds unchanged");
            }
        }

        state.record_feedback(
            ActionFeedbackRecord {
                action_id: action_id.to_string(),
                timestamp: Utc::now(),
                feedback,
            },
            self.config.feedback_history_cap,
        );
        adjustment
    }

    /// Pull an adopted `high_loading` back inside the learning bounds.
    ///
    /// Returns `true` when the value had to be moved.
    pub fn enforce_bounds(&self, state: &mut PersistentState) -> bool {
        let current = state.thresholds.high_loading;
        let bounded = self.bounded(current, self.ceiling(state.thresholds.critical_loading));
        if bounded == current {
            return false;
        }
        warn!(
            from = current,
            to = bounded,
            min = self.config.high_loading_min,
            max = self.config.high_loading_max,
            "Stored high_loading outside learning bounds, clamping"
        );
        state.thresholds.high_loading = bounded;
        true
    }

    /// Highest value `high_loading` may take for the given critical limit.
    fn ceiling(&self, critical_loading: f64) -> f64 {
        self.config.high_loading_max.min(critical_loading)
    }

    // Ceiling can sit below the floor under a bad config; the floor wins
    fn bounded(&self, value: f64, ceiling: f64) -> f64 {
        if value.is_nan() {
            return self.config.high_loading_min;
        }
        value.min(ceiling).max(self.config.high_loading_min)
    }

    fn adjustment_for(&self, current: f64, ceiling: f64, feedback: &OperatorFeedback) -> ThresholdAdjustment {
        let c = &self.config;
        match feedback.result {
            FeedbackResult::Accepted if feedback.success.unwrap_or(false) => ThresholdAdjustment::Maintained,
            FeedbackResult::Accepted => ThresholdAdjustment::Lowered {
                from: current,
                to: self.bounded(current - c.step, ceiling),
            },
            FeedbackResult::Rejected => ThresholdAdjustment::Raised {
                from: current,
                to: self.bounded(current + c.step, ceiling),
            },
            FeedbackResult::Other(_) => ThresholdAdjustment::Ignored,
        }
    }
}

impl Default for LearningLoop {
    fn default() -> Self {
        Self::new(LearningConfig::default())
    }
}
