//! Decision audit log: one JSON object per autonomous decision.
//!
//! Components receive an `AuditSink` at construction. `JsonlAuditLog`
//! appends to a JSON-lines file; `MemoryAuditLog` keeps entries in memory
//! for tests and embedded callers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::debug;

use crate::state::PersistentState;
use crate::types::ThresholdSet;

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("Decision log I/O error ({}): {1}", .0.display())]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Decision log serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

// ============================================================================
// Entries
// ============================================================================

/// Agent state summary attached to every decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSummary {
    pub history_size: usize,
    pub action_history_size: usize,
    pub thresholds: ThresholdSet,
}

impl StateSummary {
    pub fn of(state: &PersistentState) -> Self {
        Self {
            history_size: state.history.len(),
            action_history_size: state.action_history.len(),
            thresholds: state.thresholds.clone(),
        }
    }
}

/// One line of the decision log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    /// Decision name, e.g. `critical_overload_detected`
    pub action: String,
    /// Decision-specific data
    pub details: serde_json::Value,
    pub state_snapshot: StateSummary,
}

impl AuditEntry {
    pub fn new(action: impl Into<String>, details: serde_json::Value, state: &PersistentState) -> Self {
        Self {
            timestamp: Utc::now(),
            action: action.into(),
            details,
            state_snapshot: StateSummary::of(state),
        }
    }
}

// ============================================================================
// Sinks
// ============================================================================

/// Destination for decision records.
pub trait AuditSink: Send + Sync {
    fn record(&self, entry: &AuditEntry) -> Result<(), AuditError>;
}

/// Append-only JSON-lines decision log.
#[derive(Debug)]
pub struct JsonlAuditLog {
    path: PathBuf,
}

impl JsonlAuditLog {
    /// Open a log at `path`, creating its parent directory.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, AuditError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| AuditError::Io(parent.to_path_buf(), e))?;
            }
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every entry back, skipping lines that do not parse.
    pub fn read_entries(&self) -> Result<Vec<AuditEntry>, AuditError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(AuditError::Io(self.path.clone(), e)),
        };
        Ok(contents
            .lines()
            .filter(|l| !l.trim().is_empty())
            .filter_map(|l| serde_json::from_str(l).ok())
            .collect())
    }
}

impl AuditSink for JsonlAuditLog {
    fn record(&self, entry: &AuditEntry) -> Result<(), AuditError> {
        let line = serde_json::to_string(entry)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| AuditError::Io(self.path.clone(), e))?;
        writeln!(file, "{line}").map_err(|e| AuditError::Io(self.path.clone(), e))?;
        debug!(action = %entry.action, "Decision logged");
        Ok(())
    }
}

/// In-memory sink. Clones share the same entry buffer.
#[derive(Debug, Clone, Default)]
pub struct MemoryAuditLog {
    entries: Arc<Mutex<Vec<AuditEntry>>>,
}

impl MemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<AuditEntry> {
        match self.entries.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Names of all recorded decisions, in order.
    pub fn actions(&self) -> Vec<String> {
        self.entries().into_iter().map(|e| e.action).collect()
    }
}

impl AuditSink for MemoryAuditLog {
    fn record(&self, entry: &AuditEntry) -> Result<(), AuditError> {
        let mut guard = match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.push(entry.clone());
        Ok(())
    }
}
