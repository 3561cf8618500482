//! Config Validation Tests
//!
//! Typo detection, physical range checks and consistency validation of the
//! agent configuration, exercised independently from the agent itself.

use gridwatch::config::validation::{
    known_config_keys, suggest_correction, validate_physical_ranges, validate_unknown_keys,
};
use gridwatch::config::{AgentConfig, ConfigError};

// ============================================================================
// Typo Detection Tests
// ============================================================================

#[test]
fn typo_in_threshold_warns_with_suggestion() {
    let toml_str = r#"
[thresholds]
high_loadng = 88.0
"#;
    let warnings = validate_unknown_keys(toml_str);
    assert_eq!(warnings.len(), 1, "Expected exactly 1 warning");
    assert!(warnings[0].field.contains("high_loadng"));
    assert_eq!(
        warnings[0].suggestion.as_deref(),
        Some("thresholds.high_loading"),
        "Should suggest the correct spelling"
    );
}

#[test]
fn typo_in_weather_default_warns() {
    let toml_str = r#"
[forecast.defaults]
Latitde = 40.0
"#;
    let warnings = validate_unknown_keys(toml_str);
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].suggestion.as_deref(), Some("forecast.defaults.Latitude"));
}

#[test]
fn valid_config_produces_zero_warnings() {
    let toml_str = r#"
[agent]
enabled = true
state_path = "/var/lib/gridwatch/state.json"
decision_log_path = "/var/log/gridwatch/decisions.log"
persistence_enabled = true

[thresholds]
high_loading = 88.0
critical_loading = 100.0
trend_slope_threshold = 4.0
rating_decline_threshold = 8.0
historical_window = 12

[learning]
step = 1.5
high_loading_min = 72.0
high_loading_max = 94.0
feedback_history_cap = 200

[recommendations]
default_limit = 8

[stress]
caution = 65.0
high = 88.0
critical = 100.0

[forecast]
confidence_decay_per_step = 0.05
confidence_floor = 0.6

[forecast.defaults]
Ta = 30.0
WindVelocity = 3.0
Direction = "NorthSouth"
Atmosphere = "Industrial"
Elevation = 500.0
Latitude = 33.0
"#;
    let warnings = validate_unknown_keys(toml_str);
    assert!(
        warnings.is_empty(),
        "Valid config should produce 0 warnings, got: {:?}",
        warnings.iter().map(|w| &w.field).collect::<Vec<_>>()
    );
    let config = AgentConfig::from_toml_str(toml_str).expect("valid config should load");
    assert_eq!(config.learning.feedback_history_cap, 200);
    assert_eq!(config.forecast.defaults.atmosphere, "Industrial");
}

#[test]
fn unknown_section_warns() {
    let toml_str = r#"
[dashboard]
port = 8080
"#;
    let warnings = validate_unknown_keys(toml_str);
    assert!(warnings.iter().any(|w| w.field == "dashboard"));
    assert!(warnings.iter().any(|w| w.field == "dashboard.port"));
}

#[test]
fn known_keys_set_is_complete() {
    let config = AgentConfig::default();
    let toml_str = config.to_toml().expect("Default config should serialize");
    let warnings = validate_unknown_keys(&toml_str);
    assert!(
        warnings.is_empty(),
        "Default config serialization should produce 0 unknown-key warnings, got: {:?}",
        warnings.iter().map(|w| &w.field).collect::<Vec<_>>()
    );
}

#[test]
fn suggest_correction_returns_none_for_garbage() {
    let known = known_config_keys();
    let s = suggest_correction("zzz_completely_invalid_xyz_12345", &known);
    assert!(s.is_none(), "Garbage string should not match anything");
}

// ============================================================================
// Range Validation Tests
// ============================================================================

#[test]
fn latitude_out_of_range_is_error() {
    let mut config = AgentConfig::default();
    config.forecast.defaults.latitude = 123.0;
    let (errors, _) = validate_physical_ranges(&config);
    assert!(errors.iter().any(|e| e.contains("Latitude")));
}

#[test]
fn emissivity_above_one_is_error() {
    let mut config = AgentConfig::default();
    config.forecast.defaults.emissivity = 1.4;
    let (errors, _) = validate_physical_ranges(&config);
    assert!(errors.iter().any(|e| e.contains("Emissivity")));
}

#[test]
fn negative_wind_is_error() {
    let mut config = AgentConfig::default();
    config.forecast.defaults.wind_velocity = -1.0;
    assert!(config.validate().is_err());
}

#[test]
fn extreme_critical_loading_is_warning() {
    let mut config = AgentConfig::default();
    config.thresholds.critical_loading = 250.0;
    let (errors, warnings) = validate_physical_ranges(&config);
    assert!(errors.is_empty());
    assert!(warnings.iter().any(|w| w.field == "thresholds.critical_loading"));
}

#[test]
fn all_defaults_pass_validation() {
    let config = AgentConfig::default();
    let (errors, warnings) = validate_physical_ranges(&config);
    assert!(errors.is_empty(), "Default config should have 0 range errors: {:?}", errors);
    assert!(warnings.is_empty());
    assert!(config.validate().is_ok(), "Default config must always pass full validation");
}

// ============================================================================
// Consistency Validation
// ============================================================================

#[test]
fn validate_collects_every_violation() {
    let mut config = AgentConfig::default();
    config.thresholds.historical_window = 0;
    config.stress.caution = 95.0;
    config.forecast.confidence_floor = 1.5;
    match config.validate() {
        Err(ConfigError::Validation(errors)) => assert_eq!(errors.len(), 3, "{errors:?}"),
        other => panic!("expected validation failure, got {other:?}"),
    }
}

#[test]
fn learning_ceiling_above_critical_loading_is_rejected() {
    let toml_str = r#"
[thresholds]
critical_loading = 92.0
"#;
    match AgentConfig::from_toml_str(toml_str) {
        Err(ConfigError::Validation(errors)) => {
            assert_eq!(errors.len(), 1, "{errors:?}");
            assert!(errors[0].contains("learning.high_loading_max"));
        }
        other => panic!("expected validation failure, got {other:?}"),
    }

    let consistent = r#"
[thresholds]
critical_loading = 92.0

[learning]
high_loading_max = 92.0
"#;
    assert!(AgentConfig::from_toml_str(consistent).is_ok());
}

#[test]
fn load_from_file_reports_parse_errors_with_path() {
    let dir = tempfile::tempdir().expect("tmpdir");
    let path = dir.path().join("gridwatch.toml");
    std::fs::write(&path, "[thresholds]\nhigh_loading = \"ninety\"\n").expect("write");
    let err = AgentConfig::load_from_file(&path).expect_err("type mismatch must fail");
    assert!(matches!(err, ConfigError::Parse(ref p, _) if p == &path));
}

#[test]
fn config_roundtrip_preserves_values() {
    let mut original = AgentConfig::default();
    original.thresholds.high_loading = 86.0;
    original.learning.step = 1.0;
    original.forecast.defaults.direction = "NorthSouth".to_string();

    let toml_str = original.to_toml().expect("Serialization should work");
    let roundtripped = AgentConfig::from_toml_str(&toml_str).expect("Deserialization should work");

    assert!((roundtripped.thresholds.high_loading - 86.0).abs() < f64::EPSILON);
    assert!((roundtripped.learning.step - 1.0).abs() < f64::EPSILON);
    assert_eq!(roundtripped.forecast.defaults.direction, "NorthSouth");
}
