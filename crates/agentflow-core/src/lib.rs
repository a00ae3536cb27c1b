//! # AgentFlow Core
//!
//! Building blocks shared by the queue, runtime, and workflow engine:
//!
//! - [`EventBus`] - typed publish/subscribe with isolated handlers
//! - [`BaseRegistry`] - id-keyed registry preserving registration order
//! - [`AgentRegistry`] - agent type catalog with factories
//! - [`BaseAgent`] - status, progress, and log scaffolding for agents

pub mod base_agent;
pub mod events;
pub mod registry;

pub use base_agent::{AgentHandler, AgentState, BaseAgent, MAX_AGENT_LOGS};
pub use events::{EventBus, Subscription};
pub use registry::{AgentFactory, AgentRegistry, BaseRegistry, Registerable, RegistryEvent};
