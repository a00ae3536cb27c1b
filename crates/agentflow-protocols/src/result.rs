//! Outcome of one task execution attempt.

use serde::{Deserialize, Serialize};

use crate::log::LogEntry;

/// Machine-readable failure code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// The attempt outlived its timeout.
    Timeout,
    /// The attempt was cancelled from outside.
    Cancelled,
    /// The agent raised an error or reported failure.
    ExecutionError,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::Timeout => "TIMEOUT",
            ErrorCode::Cancelled => "CANCELLED",
            ErrorCode::ExecutionError => "EXECUTION_ERROR",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured error attached to a failed result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<ErrorCode>,
    /// Error source chain, outermost first.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

impl TaskError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
            stack: None,
        }
    }

    pub fn with_code(mut self, code: ErrorCode) -> Self {
        self.code = Some(code);
        self
    }

    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }

    /// Build from any error, rendering its source chain as the stack.
    pub fn from_error(err: &(dyn std::error::Error + 'static)) -> Self {
        let mut chain = Vec::new();
        let mut source = err.source();
        while let Some(cause) = source {
            chain.push(cause.to_string());
            source = cause.source();
        }
        let error = Self::new(err.to_string());
        if chain.is_empty() {
            error
        } else {
            error.with_stack(chain.join("\n"))
        }
    }
}

/// Result of a single execution attempt. Never mutated after it is produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    pub task_id: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<TaskError>,
    /// Wall-clock duration of the attempt in milliseconds.
    pub duration_ms: u64,
    /// Log entries produced during the attempt.
    #[serde(default)]
    pub logs: Vec<LogEntry>,
}

impl TaskResult {
    /// A successful result.
    pub fn success(task_id: impl Into<String>, data: Option<serde_json::Value>) -> Self {
        Self {
            task_id: task_id.into(),
            success: true,
            data,
            error: None,
            duration_ms: 0,
            logs: Vec::new(),
        }
    }

    /// A failed result.
    pub fn failure(task_id: impl Into<String>, error: TaskError) -> Self {
        Self {
            task_id: task_id.into(),
            success: false,
            data: None,
            error: Some(error),
            duration_ms: 0,
            logs: Vec::new(),
        }
    }

    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    pub fn with_logs(mut self, logs: Vec<LogEntry>) -> Self {
        self.logs = logs;
        self
    }

    /// Error code, if the result failed with one.
    pub fn error_code(&self) -> Option<ErrorCode> {
        self.error.as_ref().and_then(|e| e.code)
    }

    /// Error message, if the result failed.
    pub fn error_message(&self) -> Option<&str> {
        self.error.as_ref().map(|e| e.message.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("outer")]
    struct Outer(#[source] Inner);

    #[derive(Debug, thiserror::Error)]
    #[error("inner cause")]
    struct Inner;

    #[test]
    fn test_error_code_serialization() {
        let json = serde_json::to_string(&ErrorCode::ExecutionError).unwrap();
        assert_eq!(json, "\"EXECUTION_ERROR\"");
        assert_eq!(ErrorCode::Timeout.to_string(), "TIMEOUT");
    }

    #[test]
    fn test_from_error_collects_sources() {
        let err = Outer(Inner);
        let task_error = TaskError::from_error(&err);
        assert_eq!(task_error.message, "outer");
        assert_eq!(task_error.stack.as_deref(), Some("inner cause"));
        assert!(task_error.code.is_none());
    }

    #[test]
    fn test_failure_accessors() {
        let result = TaskResult::failure(
            "t1",
            TaskError::new("boom").with_code(ErrorCode::Timeout),
        )
        .with_duration_ms(12);
        assert!(!result.success);
        assert_eq!(result.error_code(), Some(ErrorCode::Timeout));
        assert_eq!(result.error_message(), Some("boom"));
        assert_eq!(result.duration_ms, 12);
    }

    #[test]
    fn test_success_has_no_error() {
        let result = TaskResult::success("t1", Some(serde_json::json!({"ok": true})));
        assert!(result.success);
        assert!(result.error_code().is_none());
        assert!(result.error_message().is_none());
    }
}
