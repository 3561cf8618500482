//! Recommendation types: Recommendation, EstimatedImpact, RecommendationScope

use serde::{Deserialize, Serialize};

/// Estimated effect of carrying out a recommendation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EstimatedImpact {
    pub mva: f64,
    pub loading_pct: f64,
}

/// A ranked, operator-facing recommendation derived from one issue action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub id: String,
    /// 1 (most urgent) to 5
    pub priority: u8,
    pub action: String,
    pub estimated_impact: EstimatedImpact,
    pub confidence: f64,
    pub justification: String,
}

/// Which issues a recommendation request should draw from.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationScope {
    /// Only issues that name specific lines
    Line,
    /// Regional view; snapshots carry no area topology so this keeps every issue
    Area,
    #[default]
    Grid,
}

impl std::str::FromStr for RecommendationScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "line" => Ok(RecommendationScope::Line),
            "area" => Ok(RecommendationScope::Area),
            "grid" => Ok(RecommendationScope::Grid),
            other => Err(format!("unknown scope '{other}' (expected line, area or grid)")),
        }
    }
}

impl std::fmt::Display for RecommendationScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecommendationScope::Line => write!(f, "line"),
            RecommendationScope::Area => write!(f, "area"),
            RecommendationScope::Grid => write!(f, "grid"),
        }
    }
}
