//! Shared data structures for the grid monitoring agent
//!
//! This module defines the records flowing through the control loop:
//! - Observe: RatingSnapshot (engine output / monitor input), GridSnapshot (history)
//! - Detect: Issue, RecommendedAction, MetricSnapshots
//! - Recommend: Recommendation, RecommendationScope
//! - Forecast: WeatherParams, PredictionOutcome, ForecastReport
//! - Learn: OperatorFeedback, ActionFeedbackRecord, ThresholdSet

mod snapshot;
mod issue;
mod recommendation;
mod feedback;
mod prediction;
pub mod thresholds;

pub use snapshot::*;
pub use issue::*;
pub use recommendation::*;
pub use feedback::*;
pub use prediction::*;
pub use thresholds::*;
