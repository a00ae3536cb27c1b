//! Task definition, priority, and lifecycle status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque key/value payload carried by a task.
pub type Payload = serde_json::Map<String, serde_json::Value>;

/// Task priority levels.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    /// Low priority.
    Low,
    /// Medium priority.
    #[default]
    Medium,
    /// High priority.
    High,
    /// Critical priority.
    Critical,
}

impl TaskPriority {
    /// All priorities, highest first.
    pub const ALL: [TaskPriority; 4] = [
        TaskPriority::Critical,
        TaskPriority::High,
        TaskPriority::Medium,
        TaskPriority::Low,
    ];

    /// Ordering weight used by the queue (critical=4 ... low=1).
    pub fn weight(self) -> u8 {
        match self {
            TaskPriority::Critical => 4,
            TaskPriority::High => 3,
            TaskPriority::Medium => 2,
            TaskPriority::Low => 1,
        }
    }

    /// Lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            TaskPriority::Critical => "critical",
            TaskPriority::High => "high",
            TaskPriority::Medium => "medium",
            TaskPriority::Low => "low",
        }
    }
}

/// Task status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Waiting in queue.
    #[default]
    Queued,
    /// Currently being processed.
    Running,
    /// Held in place until resumed.
    Paused,
    /// Completed successfully.
    Completed,
    /// Failed.
    Failed,
    /// Cancelled by the caller.
    Cancelled,
}

impl TaskStatus {
    /// Terminal states leave the live queue.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled
        )
    }
}

/// A unit of work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Unique task ID.
    pub id: String,
    /// Capability identifier, e.g. `dom.click`.
    #[serde(rename = "type")]
    pub task_type: String,
    /// Human-readable name.
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: TaskPriority,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub payload: Payload,
    /// Per-attempt timeout in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    /// Retry budget granted at creation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retries: Option<u32>,
    /// Retries left; never exceeds `retries`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retries_remaining: Option<u32>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_task_id: Option<String>,
    #[serde(default)]
    pub child_task_ids: Vec<String>,
}

impl Task {
    /// Create a queued task with default settings.
    pub fn new(task_type: impl Into<String>, name: impl Into<String>) -> Self {
        TaskSpec::new(task_type, name).into_task()
    }

    /// Generate a fresh task ID.
    pub fn generate_id() -> String {
        format!("task-{}", Uuid::new_v4().simple())
    }

    /// Retries left for this task, falling back to the original budget.
    pub fn effective_retries_remaining(&self) -> u32 {
        self.retries_remaining.or(self.retries).unwrap_or(0)
    }

    /// Number of retries already spent.
    pub fn retries_consumed(&self) -> u32 {
        self.retries
            .unwrap_or(0)
            .saturating_sub(self.effective_retries_remaining())
    }

    /// Copy of this task with one retry consumed.
    pub fn next_attempt(&self) -> Self {
        let mut next = self.clone();
        next.retries_remaining = Some(self.effective_retries_remaining().saturating_sub(1));
        next
    }

    /// Whether the task has left the live queue.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// A partially specified task, completed with defaults by [`TaskSpec::into_task`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskSpec {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub task_type: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: Option<TaskPriority>,
    #[serde(default)]
    pub payload: Payload,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    #[serde(default)]
    pub retries: Option<u32>,
    #[serde(default)]
    pub agent_id: Option<String>,
    #[serde(default)]
    pub parent_task_id: Option<String>,
    #[serde(default)]
    pub child_task_ids: Vec<String>,
}

impl TaskSpec {
    pub fn new(task_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            task_type: task_type.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_priority(mut self, priority: TaskPriority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_payload(mut self, payload: Payload) -> Self {
        self.payload = payload;
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = Some(retries);
        self
    }

    pub fn with_agent(mut self, agent_id: impl Into<String>) -> Self {
        self.agent_id = Some(agent_id.into());
        self
    }

    pub fn with_parent(mut self, parent_task_id: impl Into<String>) -> Self {
        self.parent_task_id = Some(parent_task_id.into());
        self
    }

    /// Rebuild a spec from an existing task, dropping identity and lifecycle.
    pub fn from_task(task: &Task) -> Self {
        Self {
            id: None,
            task_type: task.task_type.clone(),
            name: task.name.clone(),
            description: task.description.clone(),
            priority: Some(task.priority),
            payload: task.payload.clone(),
            timeout_ms: task.timeout_ms,
            retries: task.retries,
            agent_id: None,
            parent_task_id: None,
            child_task_ids: Vec::new(),
        }
    }

    /// Fill in defaults: fresh id, `queued`, now, `medium`.
    pub fn into_task(self) -> Task {
        Task {
            id: self.id.unwrap_or_else(Task::generate_id),
            task_type: self.task_type,
            name: self.name,
            description: self.description,
            priority: self.priority.unwrap_or_default(),
            status: TaskStatus::Queued,
            payload: self.payload,
            timeout_ms: self.timeout_ms,
            retries: self.retries,
            retries_remaining: self.retries,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            agent_id: self.agent_id,
            parent_task_id: self.parent_task_id,
            child_task_ids: self.child_task_ids,
        }
    }
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;
