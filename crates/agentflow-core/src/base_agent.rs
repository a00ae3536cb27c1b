//! Shared agent scaffolding.
//!
//! [`BaseAgent`] owns the status machine, progress, bounded activity log,
//! and current-task bookkeeping. Concrete agents supply an [`AgentHandler`]
//! with the actual behavior.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU8, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use tracing::debug;

use agentflow_protocols::{
    Agent, AgentError, AgentMetadata, AgentStatus, LogEntry, LogLevel, Task, TaskContext,
    TaskError, TaskResult,
};

/// Maximum number of log entries an agent keeps.
pub const MAX_AGENT_LOGS: usize = 500;

/// Agent-specific behavior plugged into [`BaseAgent`].
#[async_trait]
pub trait AgentHandler: Send + Sync + 'static {
    async fn on_initialize(&self, _state: &AgentState) -> Result<(), AgentError> {
        Ok(())
    }

    /// Perform the task. The returned value becomes `TaskResult::data`.
    async fn on_execute(
        &self,
        task: &Task,
        ctx: &TaskContext,
        state: &AgentState,
    ) -> Result<Option<Value>, AgentError>;

    fn on_pause(&self) {}

    fn on_resume(&self) {}

    fn on_terminate(&self) {}
}

/// Mutable state of an agent built on [`BaseAgent`].
pub struct AgentState {
    metadata: AgentMetadata,
    status: RwLock<AgentStatus>,
    progress: AtomicU8,
    logs: RwLock<VecDeque<LogEntry>>,
    current_task: RwLock<Option<Task>>,
}

impl AgentState {
    fn new(metadata: AgentMetadata) -> Self {
        Self {
            metadata,
            status: RwLock::new(AgentStatus::Idle),
            progress: AtomicU8::new(0),
            logs: RwLock::new(VecDeque::new()),
            current_task: RwLock::new(None),
        }
    }

    pub fn metadata(&self) -> &AgentMetadata {
        &self.metadata
    }

    pub fn status(&self) -> AgentStatus {
        *self.status.read()
    }

    fn set_status(&self, status: AgentStatus) {
        *self.status.write() = status;
    }

    /// Record the end of a task unless the agent was terminated meanwhile.
    fn finish(&self, status: AgentStatus) {
        let mut current = self.status.write();
        if *current != AgentStatus::Terminated {
            *current = status;
        }
    }

    pub fn progress(&self) -> u8 {
        self.progress.load(Ordering::SeqCst)
    }

    /// Set progress, clamped to 100.
    pub fn set_progress(&self, progress: u8) {
        self.progress.store(progress.min(100), Ordering::SeqCst);
    }

    pub fn current_task(&self) -> Option<Task> {
        self.current_task.read().clone()
    }

    /// Append a log entry tagged with this agent and the current task.
    pub fn log(&self, level: LogLevel, message: impl Into<String>, data: Option<Value>) {
        let mut entry = LogEntry::new(level, message).with_agent(self.metadata.id.clone());
        if let Some(task) = self.current_task.read().as_ref() {
            entry = entry.with_task(task.id.clone());
        }
        if let Some(data) = data {
            entry = entry.with_data(data);
        }

        let mut logs = self.logs.write();
        logs.push_back(entry);
        while logs.len() > MAX_AGENT_LOGS {
            logs.pop_front();
        }
    }

    pub fn logs(&self) -> Vec<LogEntry> {
        self.logs.read().iter().cloned().collect()
    }

    fn logs_for_task(&self, task_id: &str) -> Vec<LogEntry> {
        self.logs
            .read()
            .iter()
            .filter(|e| e.task_id.as_deref() == Some(task_id))
            .cloned()
            .collect()
    }
}

/// Clears the current task if `execute` is dropped before it finishes,
/// as happens when the runtime times out or cancels an attempt.
struct ExecutionGuard<'a> {
    state: &'a AgentState,
    armed: bool,
}

impl<'a> ExecutionGuard<'a> {
    fn new(state: &'a AgentState) -> Self {
        Self { state, armed: true }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for ExecutionGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if matches!(self.state.status(), AgentStatus::Running | AgentStatus::Paused) {
            self.state.finish(AgentStatus::Idle);
        }
        self.state.log(LogLevel::Warn, "Task aborted", None);
        *self.state.current_task.write() = None;
        debug!(agent = %self.state.metadata.id, "Execution dropped before completion");
    }
}

/// An [`Agent`] implementation that delegates behavior to a handler.
pub struct BaseAgent<H: AgentHandler> {
    state: AgentState,
    handler: H,
}

impl<H: AgentHandler> BaseAgent<H> {
    /// Create an agent. Unset config fields take the base defaults.
    pub fn new(mut metadata: AgentMetadata, handler: H) -> Self {
        metadata.config = agentflow_protocols::AgentConfig::base_defaults().merged(&metadata.config);
        Self {
            state: AgentState::new(metadata),
            handler,
        }
    }

    pub fn state(&self) -> &AgentState {
        &self.state
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }
}

#[async_trait]
impl<H: AgentHandler> Agent for BaseAgent<H> {
    fn metadata(&self) -> &AgentMetadata {
        &self.state.metadata
    }

    async fn initialize(&self) -> Result<(), AgentError> {
        self.state.set_status(AgentStatus::Initializing);
        self.state.log(LogLevel::Info, "Initializing agent", None);

        match self.handler.on_initialize(&self.state).await {
            Ok(()) => {
                self.state.set_status(AgentStatus::Idle);
                self.state.log(LogLevel::Info, "Agent initialized", None);
                Ok(())
            }
            Err(e) => {
                self.state.set_status(AgentStatus::Failed);
                self.state
                    .log(LogLevel::Error, format!("Initialization failed: {}", e), None);
                Err(AgentError::InitializationFailed(e.to_string()))
            }
        }
    }

    async fn execute(&self, task: &Task, ctx: TaskContext) -> Result<TaskResult, AgentError> {
        *self.state.current_task.write() = Some(task.clone());
        self.state.set_status(AgentStatus::Running);
        self.state.set_progress(0);
        self.state.log(
            LogLevel::Info,
            format!("Starting task: {}", task.name),
            Some(serde_json::json!({ "taskId": task.id })),
        );
        debug!(agent = %self.state.metadata.id, task = %task.id, "Executing task");

        let mut guard = ExecutionGuard::new(&self.state);
        let outcome = self.handler.on_execute(task, &ctx, &self.state).await;
        guard.disarm();

        let result = match outcome {
            Ok(data) => {
                self.state.finish(AgentStatus::Completed);
                self.state.set_progress(100);
                self.state
                    .log(LogLevel::Info, format!("Task completed: {}", task.name), None);
                TaskResult::success(task.id.clone(), data)
            }
            Err(e) => {
                self.state.finish(AgentStatus::Failed);
                self.state
                    .log(LogLevel::Error, format!("Task failed: {}", e), None);
                TaskResult::failure(task.id.clone(), TaskError::from_error(&e))
            }
        };
        let result = result.with_logs(self.state.logs_for_task(&task.id));

        *self.state.current_task.write() = None;
        if self.state.status() == AgentStatus::Completed {
            self.state.set_status(AgentStatus::Idle);
        }
        Ok(result)
    }

    fn pause(&self) {
        if self.state.status() == AgentStatus::Running {
            self.state.set_status(AgentStatus::Paused);
            self.handler.on_pause();
            self.state.log(LogLevel::Info, "Agent paused", None);
        }
    }

    fn resume(&self) {
        if self.state.status() == AgentStatus::Paused {
            self.state.set_status(AgentStatus::Running);
            self.handler.on_resume();
            self.state.log(LogLevel::Info, "Agent resumed", None);
        }
    }

    fn terminate(&self) -> Result<(), AgentError> {
        self.state.set_status(AgentStatus::Terminated);
        self.handler.on_terminate();
        *self.state.current_task.write() = None;
        self.state.log(LogLevel::Info, "Agent terminated", None);
        Ok(())
    }

    fn status(&self) -> AgentStatus {
        self.state.status()
    }

    fn progress(&self) -> u8 {
        self.state.progress()
    }

    fn logs(&self) -> Vec<LogEntry> {
        self.state.logs()
    }

    fn current_task(&self) -> Option<Task> {
        self.state.current_task()
    }
}

#[cfg(test)]
#[path = "base_agent_tests.rs"]
mod tests;
