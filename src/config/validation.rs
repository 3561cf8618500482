//! Config validation: unknown-key detection with Levenshtein suggestions
//! and physical range checks.
//!
//! Raw TOML is first parsed into `toml::Value` and its key tree compared
//! against the known field names, producing "did you mean?" warnings.
//! Warnings never break an existing config; serde deserialization and
//! `AgentConfig::validate` decide what is fatal.

use std::collections::HashSet;

/// A non-fatal config warning (typo, suspicious value).
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref s) = self.suggestion {
            write!(f, ", did you mean '{s}'?")?;
        }
        Ok(())
    }
}

// ============================================================================
// Known Config Keys
// ============================================================================

/// Returns the complete set of valid dotted key paths for `AgentConfig`.
///
/// Must be kept in step with the structs in `agent_config.rs`.
pub fn known_config_keys() -> HashSet<&'static str> {
    let keys: &[&str] = &[
        // [agent]
        "agent",
        "agent.enabled",
        "agent.state_path",
        "agent.decision_log_path",
        "agent.persistence_enabled",
        // [thresholds]
        "thresholds",
        "thresholds.high_loading",
        "thresholds.critical_loading",
        "thresholds.trend_slope_threshold",
        "thresholds.rating_decline_threshold",
        "thresholds.historical_window",
        // [learning]
        "learning",
        "learning.step",
        "learning.high_loading_min",
        "learning.high_loading_max",
        "learning.feedback_history_cap",
        // [recommendations]
        "recommendations",
        "recommendations.default_limit",
        // [stress]
        "stress",
        "stress.caution",
        "stress.high",
        "stress.critical",
        // [forecast]
        "forecast",
        "forecast.confidence_decay_per_step",
        "forecast.confidence_floor",
        // [forecast.defaults]
        "forecast.defaults",
        "forecast.defaults.Ta",
        "forecast.defaults.WindVelocity",
        "forecast.defaults.WindAngleDeg",
        "forecast.defaults.SunTime",
        "forecast.defaults.Date",
        "forecast.defaults.Emissivity",
        "forecast.defaults.Absorptivity",
        "forecast.defaults.Direction",
        "forecast.defaults.Atmosphere",
        "forecast.defaults.Elevation",
        "forecast.defaults.Latitude",
    ];
    keys.iter().copied().collect()
}

// ============================================================================
// TOML Key Walking
// ============================================================================

/// Recursively walks a `toml::Value` tree and collects all dotted key paths.
///
/// A table `{ a = { b = 1, c = 2 } }` yields `["a", "a.b", "a.c"]`.
pub fn walk_toml_keys(value: &toml::Value, prefix: &str) -> Vec<String> {
    let mut keys = Vec::new();
    if let Some(table) = value.as_table() {
        for (k, v) in table {
            let path = if prefix.is_empty() {
                k.clone()
            } else {
                format!("{prefix}.{k}")
            };
            keys.push(path.clone());
            if v.is_table() {
                keys.extend(walk_toml_keys(v, &path));
            }
        }
    }
    keys
}

// ============================================================================
// Levenshtein Distance
// ============================================================================

fn levenshtein(a: &str, b: &str) -> usize {
    let b_chars: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b_chars.len();
    }
    if b_chars.is_empty() {
        return a.chars().count();
    }

    let mut prev: Vec<usize> = (0..=b_chars.len()).collect();
    let mut curr = vec![0; b_chars.len() + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b_chars.iter().enumerate() {
            let cost = usize::from(ca != *cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b_chars.len()]
}

/// Suggest the closest known key for an unknown key, if within edit distance 3.
pub fn suggest_correction(unknown: &str, known: &HashSet<&str>) -> Option<String> {
    known
        .iter()
        .map(|k| (*k, levenshtein(unknown, k)))
        .filter(|(_, dist)| *dist <= 3)
        .min_by(|(ka, da), (kb, db)| da.cmp(db).then_with(|| ka.cmp(kb)))
        .map(|(k, _)| k.to_string())
}

/// Parse a raw TOML string and return warnings for any unknown config keys.
pub fn validate_unknown_keys(raw_toml: &str) -> Vec<ValidationWarning> {
    let value: toml::Value = match raw_toml.parse() {
        Ok(v) => v,
        Err(_) => return Vec::new(), // serde reports parse errors
    };

    let known = known_config_keys();
    walk_toml_keys(&value, "")
        .into_iter()
        .filter(|key| !known.contains(key.as_str()))
        .map(|key| ValidationWarning {
            suggestion: suggest_correction(&key, &known),
            message: format!("Unknown config key '{key}'"),
            field: key,
        })
        .collect()
}

// ============================================================================
// Physical Range Validation
// ============================================================================

/// Validate physical ranges on a parsed `AgentConfig`.
///
/// Returns (errors, warnings): errors are impossible values that must
/// prevent startup; warnings are suspicious but not fatal.
pub fn validate_physical_ranges(
    config: &super::AgentConfig,
) -> (Vec<String>, Vec<ValidationWarning>) {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    let w = &config.forecast.defaults;
    if !(-90.0..=90.0).contains(&w.latitude) {
        errors.push(format!(
            "forecast.defaults.Latitude = {:.1} is outside -90..=90 degrees",
            w.latitude
        ));
    }
    for (name, value) in [("Emissivity", w.emissivity), ("Absorptivity", w.absorptivity)] {
        if !(0.0..=1.0).contains(&value) {
            errors.push(format!("forecast.defaults.{name} = {value:.2} must be within 0..=1"));
        }
    }
    if w.wind_velocity < 0.0 {
        errors.push(format!(
            "forecast.defaults.WindVelocity = {:.2} cannot be negative",
            w.wind_velocity
        ));
    }

    // Loading above 200% is beyond any emergency rating the dashboard accepts
    let t = &config.thresholds;
    if t.critical_loading > 200.0 {
        warnings.push(ValidationWarning {
            field: "thresholds.critical_loading".to_string(),
            message: format!(
                "thresholds.critical_loading = {:.1}% is above the 200% emergency limit",
                t.critical_loading
            ),
            suggestion: None,
        });
    }
    if t.historical_window > 1000 {
        warnings.push(ValidationWarning {
            field: "thresholds.historical_window".to_string(),
            message: format!(
                "thresholds.historical_window = {} snapshots makes the persisted state large",
                t.historical_window
            ),
            suggestion: None,
        });
    }

    (errors, warnings)
}
