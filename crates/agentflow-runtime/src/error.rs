//! Runtime errors.

use agentflow_protocols::{AgentError, RegistryError};
use thiserror::Error;

/// Caller-facing runtime errors. Execution failures are reported through
/// `TaskResult`, not through this type.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Agent {0} not found")]
    AgentNotFound(String),

    #[error("Task {0} is already running")]
    TaskAlreadyRunning(String),

    #[error("Agent {agent_id} failed to initialize: {source}")]
    Initialization {
        agent_id: String,
        #[source]
        source: AgentError,
    },

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_not_found_display() {
        let err = RuntimeError::AgentNotFound("dom".to_string());
        assert_eq!(err.to_string(), "Agent dom not found");
    }

    #[test]
    fn test_initialization_keeps_source() {
        let err = RuntimeError::Initialization {
            agent_id: "dom".to_string(),
            source: AgentError::InitializationFailed("no page".to_string()),
        };
        assert!(err.to_string().contains("no page"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_registry_error_is_transparent() {
        let err = RuntimeError::from(RegistryError::InvalidId(String::new()));
        assert_eq!(err.to_string(), "Invalid id: \"\"");
    }
}
