//! Workflow events.

use serde_json::Value;

use crate::context::WorkflowResult;

/// Notifications emitted by [`crate::WorkflowEngine`].
#[derive(Debug, Clone)]
pub enum WorkflowEvent {
    WorkflowStarted { workflow_id: String, name: String },
    WorkflowCompleted(WorkflowResult),
    WorkflowFailed { workflow_id: String, error: String },
    WorkflowCancelled { workflow_id: String },
    WorkflowPaused { workflow_id: String },
    WorkflowResumed { workflow_id: String },
    StepStarted { workflow_id: String, step_id: String },
    StepCompleted { workflow_id: String, step_id: String, result: Value },
    StepFailed { workflow_id: String, step_id: String, error: String },
    /// Conditions were not met; no result is recorded.
    StepSkipped { workflow_id: String, step_id: String },
}

impl WorkflowEvent {
    /// Wire name of the event, e.g. `step:completed`.
    pub fn name(&self) -> &'static str {
        match self {
            WorkflowEvent::WorkflowStarted { .. } => "workflow:started",
            WorkflowEvent::WorkflowCompleted(_) => "workflow:completed",
            WorkflowEvent::WorkflowFailed { .. } => "workflow:failed",
            WorkflowEvent::WorkflowCancelled { .. } => "workflow:cancelled",
            WorkflowEvent::WorkflowPaused { .. } => "workflow:paused",
            WorkflowEvent::WorkflowResumed { .. } => "workflow:resumed",
            WorkflowEvent::StepStarted { .. } => "step:started",
            WorkflowEvent::StepCompleted { .. } => "step:completed",
            WorkflowEvent::StepFailed { .. } => "step:failed",
            WorkflowEvent::StepSkipped { .. } => "step:skipped",
        }
    }

    pub fn workflow_id(&self) -> &str {
        match self {
            WorkflowEvent::WorkflowCompleted(result) => &result.workflow_id,
            WorkflowEvent::WorkflowStarted { workflow_id, .. }
            | WorkflowEvent::WorkflowFailed { workflow_id, .. }
            | WorkflowEvent::WorkflowCancelled { workflow_id }
            | WorkflowEvent::WorkflowPaused { workflow_id }
            | WorkflowEvent::WorkflowResumed { workflow_id }
            | WorkflowEvent::StepStarted { workflow_id, .. }
            | WorkflowEvent::StepCompleted { workflow_id, .. }
            | WorkflowEvent::StepFailed { workflow_id, .. }
            | WorkflowEvent::StepSkipped { workflow_id, .. } => workflow_id,
        }
    }
}
