//! Workflow errors.

use agentflow_protocols::RegistryError;
use agentflow_runtime::RuntimeError;
use agentflow_workqueue::QueueError;
use thiserror::Error;

/// Workflow error types.
///
/// Only caller mistakes and definition problems escape
/// [`crate::WorkflowEngine::execute_workflow`]; step failures end up in
/// [`crate::WorkflowResult::error`].
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("Workflow not found: {0}")]
    WorkflowNotFound(String),

    #[error("Workflow already running: {0}")]
    AlreadyRunning(String),

    /// Definition failed static validation.
    #[error("Invalid workflow {workflow_id}: {reason}")]
    InvalidWorkflow { workflow_id: String, reason: String },

    #[error("Step not found: {0}")]
    StepNotFound(String),

    #[error("No agent available for task type: {0}")]
    NoAgent(String),

    /// The step's task ran and reported failure.
    #[error("{message}")]
    StepFailed { step_id: String, message: String },

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    #[error("Failed to read workflow file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid workflow JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid workflow TOML: {0}")]
    Toml(#[from] toml::de::Error),
}

impl WorkflowError {
    pub(crate) fn invalid(workflow_id: &str, reason: impl Into<String>) -> Self {
        WorkflowError::InvalidWorkflow {
            workflow_id: workflow_id.to_string(),
            reason: reason.into(),
        }
    }
}
