//! Agent protocol definitions.
//!
//! Agents are capability-bearing executors. The runtime owns live agent
//! instances and hands them one [`Task`] at a time through [`Agent::execute`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::error::AgentError;
use crate::log::LogEntry;
use crate::result::TaskResult;
use crate::task::Task;

/// Core trait for agents.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Static description of the agent.
    fn metadata(&self) -> &AgentMetadata;

    /// Returns the agent ID.
    fn id(&self) -> &str {
        &self.metadata().id
    }

    /// Returns the agent name.
    fn name(&self) -> &str {
        &self.metadata().name
    }

    /// Capabilities this agent advertises.
    fn capabilities(&self) -> &[AgentCapability] {
        &self.metadata().capabilities
    }

    /// Returns the agent configuration.
    fn config(&self) -> &AgentConfig {
        &self.metadata().config
    }

    /// Whether the agent advertises the given capability id.
    fn has_capability(&self, capability_id: &str) -> bool {
        self.capabilities().iter().any(|c| c.id == capability_id)
    }

    /// Prepare the agent for work.
    async fn initialize(&self) -> Result<(), AgentError>;

    /// Execute one task attempt.
    ///
    /// Implementations should convert their own failures into a result with
    /// `success == false`; returning `Err` is treated as a thrown error.
    /// `ctx.cancel` fires on timeout or external cancellation.
    async fn execute(&self, task: &Task, ctx: TaskContext) -> Result<TaskResult, AgentError>;

    fn pause(&self);

    fn resume(&self);

    fn terminate(&self) -> Result<(), AgentError>;

    fn status(&self) -> AgentStatus;

    /// Progress of the current task, 0..=100.
    fn progress(&self) -> u8;

    fn logs(&self) -> Vec<LogEntry>;

    fn current_task(&self) -> Option<Task>;
}

/// Per-attempt execution context handed to [`Agent::execute`].
#[derive(Debug, Clone)]
pub struct TaskContext {
    /// Fires when the attempt is aborted (timeout or cancellation).
    pub cancel: CancellationToken,
    /// Zero-based attempt number.
    pub attempt: u32,
}

impl TaskContext {
    pub fn new(cancel: CancellationToken, attempt: u32) -> Self {
        Self { cancel, attempt }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Default for TaskContext {
    fn default() -> Self {
        Self::new(CancellationToken::new(), 0)
    }
}

/// Agent status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    #[default]
    Idle,
    Initializing,
    Running,
    Paused,
    Completed,
    Failed,
    Terminated,
}

/// A named unit of functionality an agent advertises.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentCapability {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required_permissions: Vec<String>,
}

impl AgentCapability {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            required_permissions: Vec::new(),
        }
    }

    pub fn with_permissions(mut self, permissions: Vec<String>) -> Self {
        self.required_permissions = permissions;
        self
    }
}

/// Retry policy used to compute backoff between attempts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff_ms: u64,
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_ms: 1000,
            backoff_multiplier: 2.0,
        }
    }
}

/// Agent configuration. Unset fields fall back to runtime defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_concurrent_tasks: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_timeout_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_policy: Option<RetryPolicy>,
}

impl AgentConfig {
    /// Defaults applied to agents built on the shared base.
    pub fn base_defaults() -> Self {
        Self {
            max_concurrent_tasks: Some(1),
            default_timeout_ms: Some(30_000),
            retry_policy: Some(RetryPolicy::default()),
        }
    }

    /// Overlay the set fields of `overrides` on top of `self`.
    pub fn merged(&self, overrides: &AgentConfig) -> Self {
        Self {
            max_concurrent_tasks: overrides.max_concurrent_tasks.or(self.max_concurrent_tasks),
            default_timeout_ms: overrides.default_timeout_ms.or(self.default_timeout_ms),
            retry_policy: overrides
                .retry_policy
                .clone()
                .or_else(|| self.retry_policy.clone()),
        }
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = Some(policy);
        self
    }
}

/// Static description of an agent (or agent type).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentMetadata {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default)]
    pub capabilities: Vec<AgentCapability>,
    #[serde(default)]
    pub config: AgentConfig,
}

fn default_version() -> String {
    "1.0.0".to_string()
}

impl AgentMetadata {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            version: default_version(),
            author: None,
            capabilities: Vec::new(),
            config: AgentConfig::default(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_capability(mut self, capability: AgentCapability) -> Self {
        self.capabilities.push(capability);
        self
    }

    pub fn with_config(mut self, config: AgentConfig) -> Self {
        self.config = config;
        self
    }
}

#[cfg(test)]
#[path = "agent_tests.rs"]
mod tests;
