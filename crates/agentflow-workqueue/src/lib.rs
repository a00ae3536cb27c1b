//! # AgentFlow Queue
//!
//! In-memory priority task queue.
//!
//! ## Features
//!
//! - Priority-then-FIFO ordering
//! - Lifecycle transitions with bounded completed/failed history
//! - Parent/child gating
//! - Typed event stream

pub mod error;
pub mod events;
pub mod queue;

pub use agentflow_config::QueueConfig;
pub use error::QueueError;
pub use events::QueueEvent;
pub use queue::{QueueStats, TaskQueue};
