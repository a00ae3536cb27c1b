//! Error types for the AgentFlow protocol layer.

mod agent;
mod registry;

pub use agent::*;
pub use registry::*;
