//! Per-run state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::definition::Variables;

/// Lifecycle of one workflow run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowState {
    #[default]
    Idle,
    Running,
    Paused,
    Completed,
    Failed,
    Cancelled,
}

impl WorkflowState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            WorkflowState::Completed | WorkflowState::Failed | WorkflowState::Cancelled
        )
    }
}

/// Snapshot of a live run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowContext {
    pub workflow_id: String,
    /// Workflow defaults merged with the run's overrides.
    pub variables: Variables,
    pub current_step_index: usize,
    /// Task currently dispatched for the run, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_task_id: Option<String>,
    /// Data of each completed step, keyed by step id.
    pub step_results: Variables,
    /// Completed step ids in execution order.
    pub executed_steps: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub state: WorkflowState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl WorkflowContext {
    pub fn new(workflow_id: impl Into<String>, variables: Variables) -> Self {
        Self {
            workflow_id: workflow_id.into(),
            variables,
            current_step_index: 0,
            current_task_id: None,
            step_results: Variables::new(),
            executed_steps: Vec::new(),
            started_at: Utc::now(),
            state: WorkflowState::Running,
            error: None,
        }
    }
}

/// Outcome of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowResult {
    pub workflow_id: String,
    pub success: bool,
    pub state: WorkflowState,
    /// Number of distinct steps that completed.
    pub completed_steps: usize,
    pub total_steps: usize,
    pub duration_ms: u64,
    pub step_results: Variables,
    pub executed_steps: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
