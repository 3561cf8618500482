//! Weather-driven rating forecasts
//!
//! The thermal-rating physics lives behind the [`RatingEngine`] trait. The
//! [`Predictor`] walks a forecast horizon, fills missing weather fields from
//! the configured defaults, calls the engine once per step, and turns each
//! result into a [`PredictionOutcome`]. A failed step becomes a `Failed`
//! outcome and the remaining steps still run.

mod replay;

pub use replay::ReplayRatingEngine;

use chrono::Utc;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, error};

use crate::config::ForecastConfig;
use crate::types::{
    ForecastReport, PredictionOutcome, RatingSnapshot, RiskLevel, ThresholdSet, WeatherConditions,
    WeatherParams, FORECAST_MODEL,
};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum RatingError {
    #[error("Rating engine failure: {0}")]
    Engine(String),

    #[error("Invalid weather input: {0}")]
    InvalidInput(String),

    #[error("No recorded rating snapshot for step {step} ({available} available)")]
    ReplayExhausted { step: usize, available: usize },
}

/// Computes line ratings and loadings for a set of weather conditions.
pub trait RatingEngine: Send + Sync {
    fn rate(&self, conditions: &WeatherConditions) -> Result<RatingSnapshot, RatingError>;
}

// ============================================================================
// Predictor
// ============================================================================

pub struct Predictor {
    engine: Box<dyn RatingEngine>,
}

impl Predictor {
    pub fn new(engine: Box<dyn RatingEngine>) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &dyn RatingEngine {
        self.engine.as_ref()
    }

    /// Forecast every step in order. Never fails as a whole.
    pub fn predict(
        &self,
        forecast: &[WeatherParams],
        thresholds: &ThresholdSet,
        config: &ForecastConfig,
    ) -> ForecastReport {
        let predictions = forecast
            .iter()
            .enumerate()
            .map(|(index, step)| self.predict_step(index, step, thresholds, config))
            .collect();

        ForecastReport {
            predictions,
            model: FORECAST_MODEL.to_string(),
            generated_at: Utc::now(),
        }
    }

    fn predict_step(
        &self,
        index: usize,
        step: &WeatherParams,
        thresholds: &ThresholdSet,
        config: &ForecastConfig,
    ) -> PredictionOutcome {
        let timestamp = step.timestamp.unwrap_or_else(Utc::now);
        let conditions = step.resolve(&config.defaults);

        match self.engine.rate(&conditions) {
            Ok(snapshot) => {
                let mut predicted_ratings = BTreeMap::new();
                let mut risk_levels = BTreeMap::new();
                for line in &snapshot.lines {
                    predicted_ratings.insert(line.name.clone(), line.rating_mva);
                    risk_levels.insert(line.name.clone(), RiskLevel::classify(line.loading_pct, thresholds));
                }
                let confidence = config.step_confidence(index);
                debug!(step = index, lines = predicted_ratings.len(), confidence, "Forecast step rated");
                PredictionOutcome::Forecast {
                    timestamp,
                    predicted_ratings,
                    risk_levels,
                    confidence,
                    weather_conditions: conditions,
                }
            }
            Err(e) => {
                error!(step = index, ta = conditions.ta, error = %e, "Forecast step failed");
                PredictionOutcome::Failed {
                    timestamp,
                    error: e.to_string(),
                    confidence: 0.0,
                }
            }
        }
    }
}
