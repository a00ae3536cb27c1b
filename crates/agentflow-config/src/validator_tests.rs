use super::*;
use crate::loader::ConfigLoader;

#[test]
fn test_default_config_is_valid() {
    let result = ConfigValidator::validate(&Config::default());
    assert!(result.is_valid());
    assert!(result.warnings.is_empty());
}

#[test]
fn test_zero_history_is_error() {
    let mut config = Config::default();
    config.queue.max_history = 0;

    let result = ConfigValidator::validate(&config);
    assert!(!result.is_valid());
    assert_eq!(result.errors[0].path, "queue.max_history");
}

#[test]
fn test_bad_multiplier_is_error() {
    let mut config = Config::default();
    config.runtime.default_backoff_multiplier = 0.5;

    let result = ConfigValidator::validate(&config);
    assert!(result
        .errors
        .iter()
        .any(|e| e.path == "runtime.default_backoff_multiplier"));
}

#[test]
fn test_filter_directive_level_is_warning() {
    let config = ConfigLoader::load_str(
        r#"
        [logging]
        level = "agentflow_runtime=debug"
        "#,
    )
    .unwrap();

    let result = ConfigValidator::validate(&config);
    assert!(result.is_valid());
    assert_eq!(result.warnings.len(), 1);
    assert_eq!(result.warnings[0].path, "logging.level");
}

#[test]
fn test_low_backoff_cap_is_warning() {
    let mut config = Config::default();
    config.runtime.max_backoff_ms = 10;

    let result = ConfigValidator::validate(&config);
    assert!(result.is_valid());
    assert!(result
        .warnings
        .iter()
        .any(|w| w.path == "runtime.max_backoff_ms"));
}

#[test]
fn test_into_result() {
    let mut config = Config::default();
    config.workflow.step_timeout_ms = 0;

    let err = ConfigValidator::validate(&config).into_result().unwrap_err();
    assert!(matches!(err, ConfigError::InvalidValue { field, .. } if field == "workflow.step_timeout_ms"));

    let warnings = ConfigValidator::validate(&Config::default())
        .into_result()
        .unwrap();
    assert!(warnings.is_empty());
}
