//! Agent errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Agent not found: {0}")]
    NotFound(String),

    #[error("Agent initialization failed: {0}")]
    InitializationFailed(String),

    #[error("Agent execution failed: {0}")]
    ExecutionFailed(String),

    #[error("Timeout after {0} ms")]
    Timeout(u64),

    #[error("Agent was cancelled")]
    Cancelled,

    #[error("Agent termination failed: {0}")]
    TerminationFailed(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_error_not_found() {
        let err = AgentError::NotFound("dom".to_string());
        assert!(err.to_string().contains("Agent not found"));
        assert!(err.to_string().contains("dom"));
    }

    #[test]
    fn test_agent_error_timeout() {
        let err = AgentError::Timeout(1500);
        assert!(err.to_string().contains("1500"));
        assert!(err.to_string().contains("ms"));
    }

    #[test]
    fn test_agent_error_cancelled() {
        assert!(AgentError::Cancelled.to_string().contains("cancelled"));
    }
}
