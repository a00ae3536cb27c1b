//! Agent runtime for executing tasks.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde_json::{json, Value};
use tokio::time::{sleep, Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use agentflow_config::RuntimeConfig;
use agentflow_core::{AgentRegistry, BaseRegistry, EventBus, Subscription};
use agentflow_protocols::{
    Agent, AgentConfig, AgentError, AgentStatus, ErrorCode, LogEntry, LogFilter, LogLevel, Task,
    TaskContext, TaskError, TaskResult,
};

use crate::error::RuntimeError;
use crate::events::RuntimeEvent;
use crate::logs::LogBuffer;
use crate::retry::RetryConfig;

/// Bookkeeping for a task inside `execute_task`.
struct RunningTask {
    seq: u64,
    agent_id: String,
    task: Task,
    token: CancellationToken,
}

/// Removes the running entry when `execute_task` returns, however it returns.
struct RunningGuard<'a> {
    running: &'a DashMap<String, RunningTask>,
    task_id: String,
    seq: u64,
}

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.running.remove_if(&self.task_id, |_, r| r.seq == self.seq);
    }
}

enum Attempt {
    Finished(TaskResult),
    Errored(AgentError),
    TimedOut(u64),
    Cancelled,
}

async fn deadline(timeout_ms: Option<u64>) {
    match timeout_ms {
        Some(ms) => sleep(Duration::from_millis(ms)).await,
        None => std::future::pending::<()>().await,
    }
}

/// The agent runtime owns live agents and executes tasks against them.
pub struct AgentRuntime {
    config: RuntimeConfig,
    agents: BaseRegistry<dyn Agent>,
    running: DashMap<String, RunningTask>,
    next_seq: AtomicU64,
    logs: LogBuffer,
    events: EventBus<RuntimeEvent>,
}

impl AgentRuntime {
    /// Create a new agent runtime.
    pub fn new(config: RuntimeConfig) -> Self {
        let runtime = Self {
            logs: LogBuffer::new(config.max_log_entries),
            config,
            agents: BaseRegistry::new(),
            running: DashMap::new(),
            next_seq: AtomicU64::new(0),
            events: EventBus::new("agent-runtime"),
        };
        runtime.log(LogLevel::Info, "AgentRuntime initialized", None, None, None);
        runtime
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Subscribe to runtime events.
    pub fn subscribe<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&RuntimeEvent) + Send + Sync + 'static,
    {
        self.events.subscribe(handler)
    }

    fn log(
        &self,
        level: LogLevel,
        message: impl Into<String>,
        data: Option<Value>,
        agent_id: Option<&str>,
        task_id: Option<&str>,
    ) {
        let mut entry = LogEntry::new(level, message);
        if let Some(data) = data {
            entry = entry.with_data(data);
        }
        if let Some(agent_id) = agent_id {
            entry = entry.with_agent(agent_id);
        }
        if let Some(task_id) = task_id {
            entry = entry.with_task(task_id);
        }

        let agent = agent_id.unwrap_or("-");
        let task = task_id.unwrap_or("-");
        match level {
            LogLevel::Debug => debug!(agent, task, "{}", entry.message),
            LogLevel::Info => info!(agent, task, "{}", entry.message),
            LogLevel::Warn => warn!(agent, task, "{}", entry.message),
            LogLevel::Error => error!(agent, task, "{}", entry.message),
        }

        self.logs.push(entry.clone());
        self.events.emit(&RuntimeEvent::Log(entry));
    }

    /// Register an agent. An agent with the same id is replaced.
    pub fn register_agent(&self, agent: Arc<dyn Agent>) -> Result<(), RuntimeError> {
        let agent_id = agent.id().to_string();
        let data = {
            let capabilities: Vec<&str> =
                agent.capabilities().iter().map(|c| c.id.as_str()).collect();
            json!({ "capabilities": capabilities })
        };
        let name = agent.name().to_string();

        if self.agents.register_or_replace(agent)?.is_some() {
            self.log(
                LogLevel::Warn,
                format!("Agent {} already registered, replacing", agent_id),
                None,
                Some(&agent_id),
                None,
            );
        }
        self.log(
            LogLevel::Info,
            format!("Agent registered: {}", name),
            Some(data),
            Some(&agent_id),
            None,
        );
        self.events.emit(&RuntimeEvent::AgentRegistered { agent_id });
        Ok(())
    }

    /// Create an agent from a registered type and register it.
    pub fn instantiate(
        &self,
        registry: &AgentRegistry,
        type_id: &str,
        overrides: Option<&AgentConfig>,
    ) -> Result<Arc<dyn Agent>, RuntimeError> {
        let agent = registry.create(type_id, overrides)?;
        self.register_agent(agent.clone())?;
        Ok(agent)
    }

    /// Remove an agent, terminating it first unless idle or terminated.
    ///
    /// Returns false if no such agent is registered.
    pub fn unregister_agent(&self, agent_id: &str) -> bool {
        let Some(agent) = self.agents.get(agent_id) else {
            self.log(
                LogLevel::Warn,
                format!("Agent {} not found for unregistration", agent_id),
                None,
                None,
                None,
            );
            return false;
        };

        if !matches!(agent.status(), AgentStatus::Idle | AgentStatus::Terminated) {
            self.cancel_agent_tasks(agent_id);
            if let Err(e) = agent.terminate() {
                self.log(
                    LogLevel::Error,
                    format!("Error terminating agent: {}", e),
                    None,
                    Some(agent_id),
                    None,
                );
            }
        }

        let removed = self.agents.unregister(agent_id).is_ok();
        if removed {
            self.log(
                LogLevel::Info,
                format!("Agent unregistered: {}", agent.name()),
                None,
                Some(agent_id),
                None,
            );
            self.events.emit(&RuntimeEvent::AgentUnregistered {
                agent_id: agent_id.to_string(),
            });
        }
        removed
    }

    pub fn get_agent(&self, agent_id: &str) -> Option<Arc<dyn Agent>> {
        self.agents.get(agent_id)
    }

    /// All agents in registration order.
    pub fn all_agents(&self) -> Vec<Arc<dyn Agent>> {
        self.agents.list()
    }

    /// Run an agent's `initialize`. Failures are returned, not retried.
    pub async fn initialize_agent(&self, agent_id: &str) -> Result<(), RuntimeError> {
        let agent = self
            .agents
            .get(agent_id)
            .ok_or_else(|| RuntimeError::AgentNotFound(agent_id.to_string()))?;

        self.log(
            LogLevel::Info,
            format!("Initializing agent: {}", agent.name()),
            None,
            Some(agent_id),
            None,
        );

        match agent.initialize().await {
            Ok(()) => {
                self.log(
                    LogLevel::Info,
                    format!("Agent initialized: {}", agent.name()),
                    None,
                    Some(agent_id),
                    None,
                );
                self.events.emit(&RuntimeEvent::AgentInitialized {
                    agent_id: agent_id.to_string(),
                });
                Ok(())
            }
            Err(e) => {
                self.log(
                    LogLevel::Error,
                    format!("Failed to initialize agent: {}", agent.name()),
                    Some(json!({ "error": e.to_string() })),
                    Some(agent_id),
                    None,
                );
                Err(RuntimeError::Initialization {
                    agent_id: agent_id.to_string(),
                    source: e,
                })
            }
        }
    }

    fn track(
        &self,
        agent_id: &str,
        task: &Task,
        token: CancellationToken,
    ) -> Result<RunningGuard<'_>, RuntimeError> {
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        match self.running.entry(task.id.clone()) {
            Entry::Occupied(_) => Err(RuntimeError::TaskAlreadyRunning(task.id.clone())),
            Entry::Vacant(e) => {
                e.insert(RunningTask {
                    seq,
                    agent_id: agent_id.to_string(),
                    task: task.clone(),
                    token,
                });
                Ok(RunningGuard {
                    running: &self.running,
                    task_id: task.id.clone(),
                    seq,
                })
            }
        }
    }

    /// Execute a task on an agent, retrying failed attempts with backoff.
    ///
    /// Errors are returned only for caller mistakes. Execution failures,
    /// timeouts, and cancellation all produce a `TaskResult` with
    /// `success == false` and an error code.
    pub async fn execute_task(&self, agent_id: &str, task: Task) -> Result<TaskResult, RuntimeError> {
        let agent = self
            .agents
            .get(agent_id)
            .ok_or_else(|| RuntimeError::AgentNotFound(agent_id.to_string()))?;

        let token = CancellationToken::new();
        let _guard = self.track(agent_id, &task, token.clone())?;

        self.log(
            LogLevel::Info,
            format!("Starting task: {}", task.name),
            Some(json!({
                "type": task.task_type,
                "priority": task.priority,
                "retries": task.retries,
            })),
            Some(agent_id),
            Some(&task.id),
        );
        self.events.emit(&RuntimeEvent::TaskStarted {
            agent_id: agent_id.to_string(),
            task: task.clone(),
        });

        let retry = RetryConfig::for_agent(agent.config().retry_policy.as_ref(), &self.config);
        let mut task = task;

        loop {
            let started = Instant::now();
            let attempt = self.run_attempt(agent.as_ref(), agent_id, &task, &token).await;
            let duration_ms = started.elapsed().as_millis() as u64;

            let (failure, retryable) = match attempt {
                Attempt::Finished(result) if result.success => {
                    return Ok(self.finish_success(agent_id, &task, result, duration_ms));
                }
                Attempt::Finished(mut result) => {
                    let mut error = result
                        .error
                        .take()
                        .unwrap_or_else(|| TaskError::new("Agent reported failure"));
                    error.code.get_or_insert(ErrorCode::ExecutionError);
                    result.error = Some(error);
                    (result, true)
                }
                Attempt::Errored(e) => {
                    let error = TaskError::from_error(&e).with_code(ErrorCode::ExecutionError);
                    (TaskResult::failure(task.id.clone(), error), true)
                }
                Attempt::TimedOut(ms) => {
                    let error = TaskError::new(format!("Task timed out after {} ms", ms))
                        .with_code(ErrorCode::Timeout);
                    (
                        TaskResult::failure(task.id.clone(), error),
                        self.config.retry_on_timeout,
                    )
                }
                Attempt::Cancelled => (cancelled_result(&task), false),
            };

            let remaining = task.effective_retries_remaining();
            if !retryable || remaining == 0 {
                return Ok(self.finish_failure(agent_id, &task, failure, duration_ms));
            }

            let delay = retry.delay_for_attempt(task.retries_consumed());
            let delay_ms = delay.as_millis() as u64;
            self.log(
                LogLevel::Info,
                format!("Retrying task: {}", task.name),
                Some(json!({
                    "retriesRemaining": remaining,
                    "delayMs": delay_ms,
                    "error": failure.error_message(),
                })),
                Some(agent_id),
                Some(&task.id),
            );
            self.events.emit(&RuntimeEvent::TaskRetrying {
                agent_id: agent_id.to_string(),
                task: task.clone(),
                retries_remaining: remaining,
                delay_ms,
            });

            tokio::select! {
                biased;
                _ = token.cancelled() => {
                    return Ok(self.finish_failure(agent_id, &task, cancelled_result(&task), duration_ms));
                }
                _ = sleep(delay) => {}
            }

            task = task.next_attempt();
        }
    }

    async fn run_attempt(
        &self,
        agent: &dyn Agent,
        agent_id: &str,
        task: &Task,
        token: &CancellationToken,
    ) -> Attempt {
        let attempt_token = token.child_token();
        let ctx = TaskContext::new(attempt_token.clone(), task.retries_consumed());

        let attempt = tokio::select! {
            biased;
            _ = token.cancelled() => Attempt::Cancelled,
            _ = deadline(task.timeout_ms) => {
                let timeout_ms = task.timeout_ms.unwrap_or_default();
                self.log(
                    LogLevel::Warn,
                    format!("Task timed out: {}", task.name),
                    Some(json!({ "timeout": timeout_ms })),
                    Some(agent_id),
                    Some(&task.id),
                );
                Attempt::TimedOut(timeout_ms)
            }
            result = agent.execute(task, ctx) => match result {
                Ok(result) => Attempt::Finished(result),
                Err(e) => Attempt::Errored(e),
            },
        };

        // Release any agent work still watching this attempt.
        attempt_token.cancel();
        attempt
    }

    fn finish_success(
        &self,
        agent_id: &str,
        task: &Task,
        result: TaskResult,
        duration_ms: u64,
    ) -> TaskResult {
        let mut result = result.with_duration_ms(duration_ms);
        result.task_id = task.id.clone();

        self.log(
            LogLevel::Info,
            format!("Task completed: {}", task.name),
            Some(json!({ "duration": duration_ms })),
            Some(agent_id),
            Some(&task.id),
        );
        self.events.emit(&RuntimeEvent::TaskCompleted {
            agent_id: agent_id.to_string(),
            task: task.clone(),
            result: result.clone(),
        });
        result
    }

    fn finish_failure(
        &self,
        agent_id: &str,
        task: &Task,
        result: TaskResult,
        duration_ms: u64,
    ) -> TaskResult {
        let mut result = result.with_duration_ms(duration_ms);
        result.task_id = task.id.clone();

        self.log(
            LogLevel::Error,
            format!("Task failed: {}", task.name),
            Some(json!({
                "error": result.error_message(),
                "code": result.error_code(),
            })),
            Some(agent_id),
            Some(&task.id),
        );
        self.events.emit(&RuntimeEvent::TaskFailed {
            agent_id: agent_id.to_string(),
            task: task.clone(),
            result: result.clone(),
        });
        result
    }

    /// Fire a running task's cancellation token.
    ///
    /// Returns false if the task is not running. The agent is not forced to
    /// stop; the runtime stops waiting for it.
    pub fn cancel_task(&self, task_id: &str) -> bool {
        let Some(task) = self.running.get(task_id).map(|r| {
            r.token.cancel();
            r.task.clone()
        }) else {
            self.log(
                LogLevel::Warn,
                format!("Task {} not found or not running", task_id),
                None,
                None,
                None,
            );
            return false;
        };

        self.log(
            LogLevel::Info,
            format!("Task cancelled: {}", task.name),
            None,
            None,
            Some(task_id),
        );
        self.events.emit(&RuntimeEvent::TaskCancelled { task });
        true
    }

    fn cancel_agent_tasks(&self, agent_id: &str) -> usize {
        let mut cancelled = 0;
        for running in self.running.iter() {
            if running.agent_id == agent_id {
                running.token.cancel();
                cancelled += 1;
            }
        }
        cancelled
    }

    pub fn pause_agent(&self, agent_id: &str) -> bool {
        let Some(agent) = self.agents.get(agent_id) else {
            self.log(LogLevel::Warn, format!("Agent {} not found", agent_id), None, None, None);
            return false;
        };

        agent.pause();
        self.log(
            LogLevel::Info,
            format!("Agent paused: {}", agent.name()),
            None,
            Some(agent_id),
            None,
        );
        self.events.emit(&RuntimeEvent::AgentPaused {
            agent_id: agent_id.to_string(),
        });
        true
    }

    pub fn resume_agent(&self, agent_id: &str) -> bool {
        let Some(agent) = self.agents.get(agent_id) else {
            self.log(LogLevel::Warn, format!("Agent {} not found", agent_id), None, None, None);
            return false;
        };

        agent.resume();
        self.log(
            LogLevel::Info,
            format!("Agent resumed: {}", agent.name()),
            None,
            Some(agent_id),
            None,
        );
        self.events.emit(&RuntimeEvent::AgentResumed {
            agent_id: agent_id.to_string(),
        });
        true
    }

    /// Cancel every task running on the agent, then terminate it.
    ///
    /// Returns false if no such agent is registered.
    pub fn terminate_agent(&self, agent_id: &str) -> bool {
        let Some(agent) = self.agents.get(agent_id) else {
            self.log(LogLevel::Warn, format!("Agent {} not found", agent_id), None, None, None);
            return false;
        };

        let cancelled = self.cancel_agent_tasks(agent_id);
        if let Err(e) = agent.terminate() {
            self.log(
                LogLevel::Error,
                format!("Error terminating agent: {}", e),
                None,
                Some(agent_id),
                None,
            );
        }

        self.log(
            LogLevel::Info,
            format!("Agent terminated: {}", agent.name()),
            Some(json!({ "cancelledTasks": cancelled })),
            Some(agent_id),
            None,
        );
        self.events.emit(&RuntimeEvent::AgentTerminated {
            agent_id: agent_id.to_string(),
        });
        true
    }

    /// Log entries matching `filter`, oldest first.
    pub fn logs(&self, filter: &LogFilter) -> Vec<LogEntry> {
        self.logs.filtered(filter)
    }

    pub fn clear_logs(&self) {
        self.logs.clear();
        self.log(LogLevel::Info, "Logs cleared", None, None, None);
    }

    /// Tasks currently inside `execute_task`.
    pub fn running_tasks(&self) -> Vec<Task> {
        self.running.iter().map(|r| r.task.clone()).collect()
    }

    pub fn is_running(&self, task_id: &str) -> bool {
        self.running.contains_key(task_id)
    }

    /// Cancel all running tasks, terminate all agents, and clear state.
    pub fn shutdown(&self) {
        self.log(LogLevel::Info, "Shutting down AgentRuntime", None, None, None);

        for running in self.running.iter() {
            running.token.cancel();
        }
        self.running.clear();

        for agent in self.agents.list() {
            if let Err(e) = agent.terminate() {
                self.log(
                    LogLevel::Error,
                    format!("Error terminating agent: {}", agent.name()),
                    Some(json!({ "error": e.to_string() })),
                    Some(agent.id()),
                    None,
                );
            }
        }
        self.agents.clear();

        self.log(LogLevel::Info, "AgentRuntime shutdown complete", None, None, None);
    }
}

impl Default for AgentRuntime {
    fn default() -> Self {
        Self::new(RuntimeConfig::default())
    }
}

fn cancelled_result(task: &Task) -> TaskResult {
    TaskResult::failure(
        task.id.clone(),
        TaskError::new("Task was cancelled").with_code(ErrorCode::Cancelled),
    )
}

#[cfg(test)]
#[path = "runtime_tests.rs"]
mod tests;
