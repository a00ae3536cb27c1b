//! Retry backoff policy.

use std::time::Duration;

use agentflow_config::RuntimeConfig;
use agentflow_protocols::RetryPolicy;

/// Backoff configuration for one agent.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Maximum delay between retries.
    pub max_delay: Duration,
    /// Exponential backoff multiplier.
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::from_runtime(&RuntimeConfig::default())
    }
}

impl RetryConfig {
    /// Runtime-wide defaults.
    pub fn from_runtime(config: &RuntimeConfig) -> Self {
        Self {
            base_delay: Duration::from_millis(config.default_backoff_ms),
            max_delay: Duration::from_millis(config.max_backoff_ms),
            backoff_multiplier: config.default_backoff_multiplier,
        }
    }

    /// An agent's retry policy, falling back to runtime defaults.
    pub fn for_agent(policy: Option<&RetryPolicy>, config: &RuntimeConfig) -> Self {
        let defaults = Self::from_runtime(config);
        match policy {
            Some(policy) => Self {
                base_delay: Duration::from_millis(policy.backoff_ms),
                backoff_multiplier: policy.backoff_multiplier,
                ..defaults
            },
            None => defaults,
        }
    }

    /// Delay before retry number `attempt + 1`, i.e. `base * multiplier^attempt`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let delay = self.base_delay.as_millis() as f64 * self.backoff_multiplier.powi(exponent);
        let delay = delay.min(self.max_delay.as_millis() as f64).max(0.0);
        Duration::from_millis(delay as u64)
    }
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod tests;
