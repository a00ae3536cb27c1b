//! # AgentFlow Protocols
//!
//! Shared data model and contracts for the AgentFlow orchestration core.
//! Contains only definitions - no queueing or execution logic.
//!
//! - [`Task`] / [`TaskSpec`] - units of work and their partial form
//! - [`TaskResult`] - outcome of one execution attempt
//! - [`Agent`] - the executor contract implemented by concrete agents
//! - [`LogEntry`] - structured activity records

pub mod agent;
pub mod error;
pub mod log;
pub mod result;
pub mod task;

pub use agent::{
    Agent, AgentCapability, AgentConfig, AgentMetadata, AgentStatus, RetryPolicy, TaskContext,
};
pub use error::{AgentError, RegistryError};
pub use log::{LogEntry, LogFilter, LogLevel};
pub use result::{ErrorCode, TaskError, TaskResult};
pub use task::{Payload, Task, TaskPriority, TaskSpec, TaskStatus};

// Re-export so agent implementors share the runtime's token type.
pub use tokio_util::sync::CancellationToken;
