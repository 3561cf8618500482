//! Gridwatch: Autonomous Grid Monitoring Agent
//!
//! Closed-loop operational intelligence for transmission line loading.
//!
//! ## Architecture
//!
//! - **Detection**: Overload, loading trend, rating decline and anomaly detectors
//! - **Prediction**: Weather-driven rating forecasts through a pluggable rating engine
//! - **Recommendation**: Prioritized, bounded remedial action lists
//! - **Learning**: Operator feedback adjusts the high-loading threshold within bounds
//! - **Audit**: Append-only JSON-lines log of every autonomous decision
//! - **State**: Versioned JSON persistence of thresholds and bounded history

pub mod config;
pub mod types;
pub mod state;
pub mod audit;
pub mod detection;
pub mod prediction;
pub mod recommendation;
pub mod learning;
pub mod agent;

// Re-export agent configuration
pub use config::AgentConfig;

// Re-export commonly used types
pub use types::{
    ForecastReport, GridSnapshot, Issue, IssueKind, LineReading, OperatorFeedback,
    PredictionOutcome, RatingSnapshot, Recommendation, RecommendationScope, RiskLevel, Severity,
    ThresholdSet, WeatherParams,
};

// Re-export the agent façade
pub use agent::{AgentError, GridMonitorAgent, Heartbeat, SharedAgent};

// Re-export pluggable seams
pub use audit::{AuditSink, JsonlAuditLog, MemoryAuditLog};
pub use prediction::{RatingEngine, RatingError, ReplayRatingEngine};
pub use state::{PersistentState, StateError};
