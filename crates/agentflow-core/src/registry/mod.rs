//! Registries for agent types and other id-keyed items.

mod agent_types;
mod base;

pub use agent_types::{AgentFactory, AgentRegistry, RegistryEvent};
pub use base::{BaseRegistry, Registerable};
