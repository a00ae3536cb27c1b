//! Configuration schema definitions.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use agentflow_protocols::TaskPriority;

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub queue: QueueConfig,

    #[serde(default)]
    pub runtime: RuntimeConfig,

    #[serde(default)]
    pub workflow: WorkflowConfig,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines on the console instead of human-readable output.
    #[serde(default)]
    pub json: bool,

    /// Directory for daily rolling log files. Disabled when unset.
    #[serde(default)]
    pub file_dir: Option<PathBuf>,

    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_file_prefix() -> String {
    "agentflow.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
            file_dir: None,
            file_prefix: default_file_prefix(),
        }
    }
}

/// Task queue configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Capacity of each of the completed and failed history lists.
    #[serde(default = "default_max_history")]
    pub max_history: usize,
}

fn default_max_history() -> usize {
    100
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_history: default_max_history(),
        }
    }
}

/// Agent runtime configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Capacity of the runtime's structured log buffer.
    #[serde(default = "default_max_log_entries")]
    pub max_log_entries: usize,

    /// Backoff base for agents without a retry policy.
    #[serde(default = "default_backoff_ms")]
    pub default_backoff_ms: u64,

    #[serde(default = "default_backoff_multiplier")]
    pub default_backoff_multiplier: f64,

    /// Upper bound on a single backoff delay.
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,

    /// Whether a timed-out attempt consumes retries instead of failing at once.
    #[serde(default)]
    pub retry_on_timeout: bool,
}

fn default_max_log_entries() -> usize {
    1000
}

fn default_backoff_ms() -> u64 {
    1000
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_max_backoff_ms() -> u64 {
    30_000
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_log_entries: default_max_log_entries(),
            default_backoff_ms: default_backoff_ms(),
            default_backoff_multiplier: default_backoff_multiplier(),
            max_backoff_ms: default_max_backoff_ms(),
            retry_on_timeout: false,
        }
    }
}

/// What happens when a step fails and has no `on_failure` edge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnhandledFailure {
    /// End the run as failed.
    #[default]
    Abort,
    /// Advance to the next step in declaration order.
    Continue,
}

/// Workflow engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Timeout applied to step tasks that do not set their own.
    #[serde(default = "default_step_timeout_ms")]
    pub step_timeout_ms: u64,

    /// Priority of step tasks that do not set their own.
    #[serde(default = "default_step_priority")]
    pub step_priority: TaskPriority,

    #[serde(default)]
    pub on_unhandled_failure: UnhandledFailure,

    /// Whether interval schedules are armed on registration.
    #[serde(default = "default_true")]
    pub schedules_enabled: bool,
}

fn default_step_timeout_ms() -> u64 {
    60_000
}

fn default_step_priority() -> TaskPriority {
    TaskPriority::High
}

fn default_true() -> bool {
    true
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            step_timeout_ms: default_step_timeout_ms(),
            step_priority: default_step_priority(),
            on_unhandled_failure: UnhandledFailure::default(),
            schedules_enabled: true,
        }
    }
}

#[cfg(test)]
#[path = "schema_tests.rs"]
mod tests;
