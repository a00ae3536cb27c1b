//! Runtime events.

use agentflow_protocols::{LogEntry, Task, TaskResult};

/// Notifications emitted by [`crate::AgentRuntime`].
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    AgentRegistered { agent_id: String },
    AgentUnregistered { agent_id: String },
    AgentInitialized { agent_id: String },
    AgentPaused { agent_id: String },
    AgentResumed { agent_id: String },
    AgentTerminated { agent_id: String },
    TaskStarted { agent_id: String, task: Task },
    TaskCompleted { agent_id: String, task: Task, result: TaskResult },
    TaskFailed { agent_id: String, task: Task, result: TaskResult },
    TaskRetrying { agent_id: String, task: Task, retries_remaining: u32, delay_ms: u64 },
    TaskCancelled { task: Task },
    Log(LogEntry),
}

impl RuntimeEvent {
    /// Wire name of the event, e.g. `task:retrying`.
    pub fn name(&self) -> &'static str {
        match self {
            RuntimeEvent::AgentRegistered { .. } => "agent:registered",
            RuntimeEvent::AgentUnregistered { .. } => "agent:unregistered",
            RuntimeEvent::AgentInitialized { .. } => "agent:initialized",
            RuntimeEvent::AgentPaused { .. } => "agent:paused",
            RuntimeEvent::AgentResumed { .. } => "agent:resumed",
            RuntimeEvent::AgentTerminated { .. } => "agent:terminated",
            RuntimeEvent::TaskStarted { .. } => "task:started",
            RuntimeEvent::TaskCompleted { .. } => "task:completed",
            RuntimeEvent::TaskFailed { .. } => "task:failed",
            RuntimeEvent::TaskRetrying { .. } => "task:retrying",
            RuntimeEvent::TaskCancelled { .. } => "task:cancelled",
            RuntimeEvent::Log(_) => "log",
        }
    }
}
