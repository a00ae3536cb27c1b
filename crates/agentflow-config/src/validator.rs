//! Configuration validation.

use crate::error::ConfigError;
use crate::schema::Config;

const KNOWN_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Validation result.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }

    /// Convert the first error, if any, into a [`ConfigError`].
    pub fn into_result(self) -> Result<Vec<ValidationWarning>, ConfigError> {
        match self.errors.into_iter().next() {
            Some(error) => Err(ConfigError::InvalidValue {
                field: error.path,
                message: error.message,
            }),
            None => Ok(self.warnings),
        }
    }
}

/// A validation error.
#[derive(Debug)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// A validation warning.
#[derive(Debug)]
pub struct ValidationWarning {
    pub path: String,
    pub message: String,
}

impl ValidationWarning {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration.
    pub fn validate(config: &Config) -> ValidationResult {
        let mut result = ValidationResult::default();

        Self::validate_logging(config, &mut result);
        Self::validate_queue(config, &mut result);
        Self::validate_runtime(config, &mut result);
        Self::validate_workflow(config, &mut result);

        result
    }

    fn validate_logging(config: &Config, result: &mut ValidationResult) {
        let level = config.logging.level.trim();
        if level.is_empty() {
            result.add_error(ValidationError::new(
                "logging.level",
                "Log level cannot be empty",
            ));
        } else if !KNOWN_LEVELS.contains(&level.to_lowercase().as_str()) {
            // Could still be a full filter directive such as "agentflow=debug".
            result.add_warning(ValidationWarning::new(
                "logging.level",
                format!("'{}' is not a plain level, treating it as a filter directive", level),
            ));
        }

        if config.logging.file_dir.is_some() && config.logging.file_prefix.is_empty() {
            result.add_error(ValidationError::new(
                "logging.file_prefix",
                "file_prefix cannot be empty when file logging is enabled",
            ));
        }

        if let Some(dir) = &config.logging.file_dir {
            if !dir.exists() {
                result.add_warning(ValidationWarning::new(
                    "logging.file_dir",
                    format!("Log directory does not exist and will be created: {:?}", dir),
                ));
            }
        }
    }

    fn validate_queue(config: &Config, result: &mut ValidationResult) {
        if config.queue.max_history == 0 {
            result.add_error(ValidationError::new(
                "queue.max_history",
                "max_history must be greater than 0",
            ));
        }
    }

    fn validate_runtime(config: &Config, result: &mut ValidationResult) {
        let runtime = &config.runtime;

        if runtime.max_log_entries == 0 {
            result.add_warning(ValidationWarning::new(
                "runtime.max_log_entries",
                "max_log_entries is 0, runtime logs will not be retained",
            ));
        }

        if !runtime.default_backoff_multiplier.is_finite() || runtime.default_backoff_multiplier < 1.0 {
            result.add_error(ValidationError::new(
                "runtime.default_backoff_multiplier",
                "default_backoff_multiplier must be a finite number >= 1.0",
            ));
        }

        if runtime.max_backoff_ms < runtime.default_backoff_ms {
            result.add_warning(ValidationWarning::new(
                "runtime.max_backoff_ms",
                "max_backoff_ms is lower than default_backoff_ms, every delay will be capped",
            ));
        }
    }

    fn validate_workflow(config: &Config, result: &mut ValidationResult) {
        if config.workflow.step_timeout_ms == 0 {
            result.add_error(ValidationError::new(
                "workflow.step_timeout_ms",
                "step_timeout_ms must be greater than 0",
            ));
        }
    }
}

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;
