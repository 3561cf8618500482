//! Operator feedback types: FeedbackResult, OperatorFeedback, ActionFeedbackRecord

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Operator verdict on a recommendation.
///
/// Unrecognized verdicts are kept verbatim so they survive a save/load
/// round trip, but they never move a threshold.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FeedbackResult {
    Accepted,
    Rejected,
    Other(String),
}

impl Default for FeedbackResult {
    fn default() -> Self {
        FeedbackResult::Other("unknown".to_string())
    }
}

impl From<String> for FeedbackResult {
    fn from(s: String) -> Self {
        match s.as_str() {
            "accepted" => FeedbackResult::Accepted,
            "rejected" => FeedbackResult::Rejected,
            _ => FeedbackResult::Other(s),
        }
    }
}

impl From<&str> for FeedbackResult {
    fn from(s: &str) -> Self {
        FeedbackResult::from(s.to_string())
    }
}

impl From<FeedbackResult> for String {
    fn from(r: FeedbackResult) -> Self {
        r.to_string()
    }
}

impl std::fmt::Display for FeedbackResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeedbackResult::Accepted => write!(f, "accepted"),
            FeedbackResult::Rejected => write!(f, "rejected"),
            FeedbackResult::Other(s) => write!(f, "{s}"),
        }
    }
}

/// Feedback submitted by an operator about a previously issued recommendation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OperatorFeedback {
    #[serde(default)]
    pub result: FeedbackResult,
    /// Whether an accepted action achieved its goal
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    /// Free-form outcome measurements (e.g. observed loading after the action)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<BTreeMap<String, serde_json::Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl OperatorFeedback {
    pub fn accepted(success: bool) -> Self {
        Self {
            result: FeedbackResult::Accepted,
            success: Some(success),
            ..Self::default()
        }
    }

    pub fn rejected() -> Self {
        Self {
            result: FeedbackResult::Rejected,
            ..Self::default()
        }
    }
}

/// A feedback event as retained in the bounded action history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionFeedbackRecord {
    pub action_id: String,
    pub timestamp: DateTime<Utc>,
    pub feedback: OperatorFeedback,
}
