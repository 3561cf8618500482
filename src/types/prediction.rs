//! Forecast types: WeatherParams, WeatherConditions, PredictionOutcome, ForecastReport

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::RiskLevel;

/// Model identifier reported with every forecast.
pub const FORECAST_MODEL: &str = "ieee738";

// ============================================================================
// Weather Inputs
// ============================================================================

/// One forecast step as supplied by the caller. Absent fields are filled
/// from [`WeatherConditions`] defaults before the rating engine is called.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WeatherParams {
    #[serde(rename = "timestamp", default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    /// Ambient temperature (°C)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ta: Option<f64>,
    /// Wind speed (ft/s)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wind_velocity: Option<f64>,
    /// Wind angle relative to the conductor (degrees)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wind_angle_deg: Option<f64>,
    /// Solar hour of day
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sun_time: Option<f64>,
    /// Day of year, e.g. "12 Jun"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emissivity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub absorptivity: Option<f64>,
    /// Conductor orientation, e.g. "EastWest"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<String>,
    /// "Clear" or "Industrial"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub atmosphere: Option<String>,
    /// Elevation (ft)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elevation: Option<f64>,
    /// Latitude (degrees)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
}

impl WeatherParams {
    /// Fill every absent field from `defaults`.
    pub fn resolve(&self, defaults: &WeatherConditions) -> WeatherConditions {
        WeatherConditions {
            ta: self.ta.unwrap_or(defaults.ta),
            wind_velocity: self.wind_velocity.unwrap_or(defaults.wind_velocity),
            wind_angle_deg: self.wind_angle_deg.unwrap_or(defaults.wind_angle_deg),
            sun_time: self.sun_time.unwrap_or(defaults.sun_time),
            date: self.date.clone().unwrap_or_else(|| defaults.date.clone()),
            emissivity: self.emissivity.unwrap_or(defaults.emissivity),
            absorptivity: self.absorptivity.unwrap_or(defaults.absorptivity),
            direction: self.direction.clone().unwrap_or_else(|| defaults.direction.clone()),
            atmosphere: self.atmosphere.clone().unwrap_or_else(|| defaults.atmosphere.clone()),
            elevation: self.elevation.unwrap_or(defaults.elevation),
            latitude: self.latitude.unwrap_or(defaults.latitude),
        }
    }
}

/// Fully specified weather parameter set passed to the rating engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct WeatherConditions {
    pub ta: f64,
    pub wind_velocity: f64,
    pub wind_angle_deg: f64,
    pub sun_time: f64,
    pub date: String,
    pub emissivity: f64,
    pub absorptivity: f64,
    pub direction: String,
    pub atmosphere: String,
    pub elevation: f64,
    pub latitude: f64,
}

impl Default for WeatherConditions {
    fn default() -> Self {
        Self {
            ta: 25.0,
            wind_velocity: 2.0,
            wind_angle_deg: 90.0,
            sun_time: 12.0,
            date: "12 Jun".to_string(),
            emissivity: 0.8,
            absorptivity: 0.8,
            direction: "EastWest".to_string(),
            atmosphere: "Clear".to_string(),
            elevation: 1000.0,
            latitude: 27.0,
        }
    }
}

// ============================================================================
// Forecast Outputs
// ============================================================================

/// Result of a single forecast step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PredictionOutcome {
    Forecast {
        timestamp: DateTime<Utc>,
        /// Line name → predicted thermal rating (MVA)
        predicted_ratings: BTreeMap<String, f64>,
        risk_levels: BTreeMap<String, RiskLevel>,
        confidence: f64,
        weather_conditions: WeatherConditions,
    },
    Failed {
        timestamp: DateTime<Utc>,
        error: String,
        confidence: f64,
    },
}

impl PredictionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, PredictionOutcome::Forecast { .. })
    }

    pub fn confidence(&self) -> f64 {
        match self {
            PredictionOutcome::Forecast { confidence, .. }
            | PredictionOutcome::Failed { confidence, .. } => *confidence,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            PredictionOutcome::Forecast { timestamp, .. }
            | PredictionOutcome::Failed { timestamp, .. } => *timestamp,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            PredictionOutcome::Failed { error, .. } => Some(error),
            PredictionOutcome::Forecast { .. } => None,
        }
    }
}

/// Full forecast response: `{predictions, model, generated_at}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastReport {
    pub predictions: Vec<PredictionOutcome>,
    pub model: String,
    pub generated_at: DateTime<Utc>,
}

impl ForecastReport {
    pub fn success_count(&self) -> usize {
        self.predictions.iter().filter(|p| p.is_success()).count()
    }
}
