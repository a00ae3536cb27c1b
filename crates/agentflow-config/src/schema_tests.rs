use super::*;

#[test]
fn test_config_default() {
    let config = Config::default();
    assert_eq!(config.logging.level, "info");
    assert!(config.logging.file_dir.is_none());
    assert_eq!(config.queue.max_history, 100);
    assert_eq!(config.runtime.max_log_entries, 1000);
    assert_eq!(config.workflow.step_timeout_ms, 60_000);
}

#[test]
fn test_runtime_config_default() {
    let runtime = RuntimeConfig::default();
    assert_eq!(runtime.default_backoff_ms, 1000);
    assert_eq!(runtime.default_backoff_multiplier, 2.0);
    assert_eq!(runtime.max_backoff_ms, 30_000);
    assert!(!runtime.retry_on_timeout);
}

#[test]
fn test_workflow_config_default() {
    let workflow = WorkflowConfig::default();
    assert_eq!(workflow.step_priority, TaskPriority::High);
    assert_eq!(workflow.on_unhandled_failure, UnhandledFailure::Abort);
    assert!(workflow.schedules_enabled);
}

#[test]
fn test_workflow_config_from_toml() {
    let workflow: WorkflowConfig = toml::from_str(
        r#"
            step_priority = "critical"
            on_unhandled_failure = "continue"
        "#,
    )
    .unwrap();
    assert_eq!(workflow.step_priority, TaskPriority::Critical);
    assert_eq!(workflow.on_unhandled_failure, UnhandledFailure::Continue);
    assert_eq!(workflow.step_timeout_ms, 60_000);
}

#[test]
fn test_config_serialization_round_trip() {
    let config = Config::default();
    let text = toml::to_string(&config).unwrap();
    let parsed: Config = toml::from_str(&text).unwrap();
    assert_eq!(parsed.queue.max_history, config.queue.max_history);
    assert_eq!(parsed.logging.file_prefix, "agentflow.log");
}
