//! Queue events.

use agentflow_protocols::Task;

/// Notifications emitted by [`crate::TaskQueue`].
#[derive(Debug, Clone)]
pub enum QueueEvent {
    TaskAdded(Task),
    TaskUpdated(Task),
    TaskStarted(Task),
    TaskCompleted(Task),
    TaskFailed { task: Task, error: String },
    TaskCancelled(Task),
    QueueCleared,
    QueuePaused,
    QueueResumed,
}

impl QueueEvent {
    /// Wire name of the event, e.g. `task:added`.
    pub fn name(&self) -> &'static str {
        match self {
            QueueEvent::TaskAdded(_) => "task:added",
            QueueEvent::TaskUpdated(_) => "task:updated",
            QueueEvent::TaskStarted(_) => "task:started",
            QueueEvent::TaskCompleted(_) => "task:completed",
            QueueEvent::TaskFailed { .. } => "task:failed",
            QueueEvent::TaskCancelled(_) => "task:cancelled",
            QueueEvent::QueueCleared => "queue:cleared",
            QueueEvent::QueuePaused => "queue:paused",
            QueueEvent::QueueResumed => "queue:resumed",
        }
    }

    /// Task carried by the event, if any.
    pub fn task(&self) -> Option<&Task> {
        match self {
            QueueEvent::TaskAdded(task)
            | QueueEvent::TaskUpdated(task)
            | QueueEvent::TaskStarted(task)
            | QueueEvent::TaskCompleted(task)
            | QueueEvent::TaskFailed { task, .. }
            | QueueEvent::TaskCancelled(task) => Some(task),
            QueueEvent::QueueCleared | QueueEvent::QueuePaused | QueueEvent::QueueResumed => None,
        }
    }
}
