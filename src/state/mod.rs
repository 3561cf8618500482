//! Persistent agent state: thresholds, bounded monitoring history, and the
//! bounded operator feedback log.
//!
//! The state is stored as a single pretty-printed JSON document:
//!
//! ```json
//! { "history": [...], "action_history": [...], "thresholds": {...},
//!   "version": "1.0.0", "last_updated": "2026-01-01T00:00:00Z" }
//! ```
//!
//! Saves are atomic (write `<path>.tmp`, then rename). Loading never fails:
//! a missing, corrupt, or inconsistent file yields a fresh state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::types::{ActionFeedbackRecord, GridSnapshot, ThresholdSet};

/// Version string written with every saved state document.
pub const STATE_VERSION: &str = "1.0.0";

#[derive(Debug, Error)]
pub enum StateError {
    #[error("State I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("State serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("State version mismatch: file has {found}, expected {expected}")]
    VersionMismatch { found: String, expected: String },

    #[error("Invalid persisted thresholds: {}", .0.join("; "))]
    InvalidThresholds(Vec<String>),
}

// ============================================================================
// Persistent State
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistentState {
    /// Condensed monitoring snapshots, oldest first
    #[serde(default)]
    pub history: VecDeque<GridSnapshot>,
    /// Operator feedback records, oldest first
    #[serde(default)]
    pub action_history: VecDeque<ActionFeedbackRecord>,
    pub thresholds: ThresholdSet,
    pub version: String,
    pub last_updated: DateTime<Utc>,
}

impl Default for PersistentState {
    fn default() -> Self {
        Self::new(ThresholdSet::default())
    }
}

impl PersistentState {
    /// Fresh state with empty history and the given initial thresholds.
    pub fn new(thresholds: ThresholdSet) -> Self {
        Self {
            history: VecDeque::new(),
            action_history: VecDeque::new(),
            thresholds,
            version: STATE_VERSION.to_string(),
            last_updated: Utc::now(),
        }
    }

    /// Append a history entry and drop the oldest entries beyond `window`.
    pub fn push_snapshot(&mut self, snapshot: GridSnapshot, window: usize) {
        self.history.push_back(snapshot);
        while self.history.len() > window {
            self.history.pop_front();
        }
    }

    /// Append a feedback record and drop the oldest records beyond `cap`.
    pub fn record_feedback(&mut self, record: ActionFeedbackRecord, cap: usize) {
        self.action_history.push_back(record);
        while self.action_history.len() > cap {
            self.action_history.pop_front();
        }
    }

    /// Average loading values in history order.
    pub fn avg_loadings(&self) -> Vec<f64> {
        self.history.iter().map(|s| s.avg_loading).collect()
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    /// Save atomically to `path`, creating the parent directory if needed.
    pub fn save(&mut self, path: &Path) -> Result<(), StateError> {
        self.last_updated = Utc::now();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(self)?;

        let tmp_path = tmp_path_for(path);
        std::fs::write(&tmp_path, json)?;
        std::fs::rename(&tmp_path, path)?;

        debug!(
            path = %path.display(),
            history = self.history.len(),
            action_history = self.action_history.len(),
            "Agent state saved"
        );
        Ok(())
    }

    /// Read and validate a state document.
    pub fn load_from_file(path: &Path) -> Result<Self, StateError> {
        let json = std::fs::read_to_string(path)?;
        let state: Self = serde_json::from_str(&json)?;

        if state.version != STATE_VERSION {
            return Err(StateError::VersionMismatch {
                found: state.version,
                expected: STATE_VERSION.to_string(),
            });
        }
        let violations = state.thresholds.violations();
        if !violations.is_empty() {
            return Err(StateError::InvalidThresholds(violations));
        }
        Ok(state)
    }

    /// Load from `path`, falling back to built-in default thresholds.
    pub fn load(path: &Path) -> Self {
        Self::load_or_new(path, ThresholdSet::default())
    }

    /// Load from `path`, or start fresh with `initial` thresholds when the
    /// file is missing or unusable.
    pub fn load_or_new(path: &Path, initial: ThresholdSet) -> Self {
        match Self::load_from_file(path) {
            Ok(state) => {
                info!(
                    path = %path.display(),
                    history = state.history.len(),
                    action_history = state.action_history.len(),
                    high_loading = state.thresholds.high_loading,
                    "Agent state loaded"
                );
                state
            }
            Err(StateError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "No agent state file found, starting fresh");
                Self::new(initial)
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Unusable agent state file, starting fresh");
                Self::new(initial)
            }
        }
    }
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".tmp");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::OperatorFeedback;

    fn snapshot(avg: f64) -> GridSnapshot {
        GridSnapshot {
            timestamp: Utc::now(),
            avg_loading: avg,
            max_loading: avg + 10.0,
            line_count: 3,
        }
    }

    #[test]
    fn test_history_trimmed_to_window() {
        let mut state = PersistentState::default();
        for i in 0..15 {
            state.push_snapshot(snapshot(i as f64), 10);
        }
        assert_eq!(state.history.len(), 10);
        assert_eq!(state.history.front().map(|s| s.avg_loading), Some(5.0));
        assert_eq!(state.history.back().map(|s| s.avg_loading), Some(14.0));
    }

    #[test]
    fn test_feedback_trimmed_to_cap() {
        let mut state = PersistentState::default();
        for i in 0..105 {
            state.record_feedback(
                ActionFeedbackRecord {
                    action_id: format!("a{i}"),
                    timestamp: Utc::now(),
                    feedback: OperatorFeedback::rejected(),
                },
                100,
            );
        }
        assert_eq!(state.action_history.len(), 100);
        assert_eq!(state.action_history[0].action_id, "a5");
    }

    #[test]
    fn test_save_then_load_roundtrip() {
        let dir = tempfile::tempdir().expect("tmpdir");
        let path = dir.path().join("nested").join("agent_state.json");

        let mut state = PersistentState::default();
        state.push_snapshot(snapshot(42.0), 10);
        state.push_snapshot(snapshot(47.5), 10);
        state.record_feedback(
            ActionFeedbackRecord {
                action_id: "critical_loading_x_action_0".to_string(),
                timestamp: Utc::now(),
                feedback: OperatorFeedback::accepted(false),
            },
            100,
        );
        state.thresholds.high_loading = 86.0;
        state.save(&path).expect("save");

        assert!(path.exists());
        assert!(!tmp_path_for(&path).exists());

        let loaded = PersistentState::load(&path);
        assert_eq!(loaded.history, state.history);
        assert_eq!(loaded.action_history, state.action_history);
        assert_eq!(loaded.thresholds, state.thresholds);
        assert_eq!(loaded.version, state.version);
    }

    #[test]
    fn test_missing_file_yields_default() {
        let dir = tempfile::tempdir().expect("tmpdir");
        let state = PersistentState::load(&dir.path().join("absent.json"));
        assert!(state.history.is_empty());
        assert_eq!(state.thresholds, ThresholdSet::default());
        assert_eq!(state.version, STATE_VERSION);
    }

    #[test]
    fn test_corrupt_file_yields_initial_thresholds() {
        let dir = tempfile::tempdir().expect("tmpdir");
        let path = dir.path().join("state.json");
        std::fs::write(&path, "{ not json").expect("write");

        let initial = ThresholdSet {
            high_loading: 80.0,
            ..ThresholdSet::default()
        };
        let state = PersistentState::load_or_new(&path, initial.clone());
        assert_eq!(state.thresholds, initial);
    }

    #[test]
    fn test_inconsistent_thresholds_rejected() {
        let dir = tempfile::tempdir().expect("tmpdir");
        let path = dir.path().join("state.json");
        let mut bad = PersistentState::default();
        bad.thresholds.historical_window = 0;
        bad.save(&path).expect("save");

        assert!(matches!(
            PersistentState::load_from_file(&path),
            Err(StateError::InvalidThresholds(_))
        ));
        assert_eq!(PersistentState::load(&path).thresholds, ThresholdSet::default());
    }
}
