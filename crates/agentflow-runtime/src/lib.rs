//! # AgentFlow Runtime
//!
//! Owns live agent instances and executes tasks against them with a
//! per-attempt timeout, cooperative cancellation, and exponential-backoff
//! retry.

pub mod error;
pub mod events;
pub mod logs;
pub mod retry;
pub mod runtime;

pub use agentflow_config::RuntimeConfig;
pub use error::RuntimeError;
pub use events::RuntimeEvent;
pub use logs::LogBuffer;
pub use retry::RetryConfig;
pub use runtime::AgentRuntime;
