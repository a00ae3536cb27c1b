//! Queue errors.

use agentflow_protocols::TaskStatus;
use thiserror::Error;

/// Queue error types.
#[derive(Debug, Error)]
pub enum QueueError {
    /// Task not found.
    #[error("Task not found: {0}")]
    TaskNotFound(String),

    /// A task with this id already exists.
    #[error("Duplicate task id: {0}")]
    DuplicateTask(String),

    /// Parent of a child task not found.
    #[error("Parent task {0} not found")]
    ParentNotFound(String),

    /// Transition not allowed from the task's current status.
    #[error("Task {task_id} cannot be {action} while {status:?}")]
    InvalidTransition {
        task_id: String,
        action: &'static str,
        status: TaskStatus,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_transition_display() {
        let err = QueueError::InvalidTransition {
            task_id: "t1".to_string(),
            action: "started",
            status: TaskStatus::Paused,
        };
        assert_eq!(err.to_string(), "Task t1 cannot be started while Paused");
    }

    #[test]
    fn test_parent_not_found_display() {
        let err = QueueError::ParentNotFound("p1".to_string());
        assert!(err.to_string().contains("p1"));
    }
}
