//! Retry limits and backoff delay calculation
//!
//! A [`RetryConfig`] describes the policy (how many attempts, which delay
//! curve). A [`Backoff`] is the per-operation state `{attempt, delay}` created
//! from it: local to one connect or reconnect operation and discarded once the
//! operation succeeds or gives up.

use std::time::Duration;

use thiserror::Error;
use tracing::debug;

/// Errors produced while building a retry configuration
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RetryConfigError {
    /// The configuration violates an invariant
    #[error("Invalid retry configuration: {message}")]
    InvalidConfiguration { message: String },
}

/// Backoff strategy for calculating retry delays
#[derive(Debug, Clone, PartialEq)]
pub enum BackoffStrategy {
    /// Exponential backoff: `initial_delay * base^attempt`, capped at `max_delay`
    Exponential { initial_delay: Duration, base: f64, max_delay: Duration },
}

impl BackoffStrategy {
    /// Doubling backoff starting at `initial_delay`
    #[must_use]
    pub fn doubling(initial_delay: Duration, max_delay: Duration) -> Self {
        Self::Exponential { initial_delay, base: 2.0, max_delay }
    }

    /// Calculate the delay that follows failed attempt number `attempt` (0-based)
    #[must_use]
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        match self {
            BackoffStrategy::Exponential { initial_delay, base, max_delay } => {
                let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
                let delay = initial_delay.as_secs_f64() * base.powi(exponent);
                if !delay.is_finite() || delay >= max_delay.as_secs_f64() {
                    return *max_delay;
                }
                Duration::from_secs_f64(delay)
            }
        }
    }

    /// Upper bound of any delay this strategy yields
    #[must_use]
    pub fn max_delay(&self) -> Duration {
        match self {
            BackoffStrategy::Exponential { max_delay, .. } => *max_delay,
        }
    }
}

/// Configuration for retry behavior
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first one
    pub max_attempts: u32,
    /// Backoff strategy for calculating delays
    pub backoff: BackoffStrategy,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 20,
            backoff: BackoffStrategy::doubling(Duration::from_secs(1), Duration::from_secs(300)),
        }
    }
}

impl RetryConfig {
    /// Create a configuration builder
    #[must_use]
    pub fn builder() -> RetryConfigBuilder {
        RetryConfigBuilder::new()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), RetryConfigError> {
        if self.max_attempts == 0 {
            return Err(RetryConfigError::InvalidConfiguration {
                message: "max_attempts must be greater than 0".to_string(),
            });
        }

        let BackoffStrategy::Exponential { initial_delay, base, max_delay } = &self.backoff;
        if *base < 1.0 {
            return Err(RetryConfigError::InvalidConfiguration {
                message: "exponential base must be at least 1".to_string(),
            });
        }
        if initial_delay > max_delay {
            return Err(RetryConfigError::InvalidConfiguration {
                message: "initial_delay must not exceed max_delay".to_string(),
            });
        }

        Ok(())
    }

    /// Start a fresh backoff sequence for one operation
    #[must_use]
    pub fn start(&self) -> Backoff {
        Backoff { attempt: 0, delay: Duration::ZERO, config: self.clone() }
    }
}

/// Builder for [`RetryConfig`]
#[derive(Debug, Clone, Default)]
pub struct RetryConfigBuilder {
    config: RetryConfig,
}

impl RetryConfigBuilder {
    /// Create a builder seeded with the defaults (20 attempts, 1s doubling to 300s)
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.config.max_attempts = max_attempts;
        self
    }

    #[must_use]
    pub fn backoff(mut self, backoff: BackoffStrategy) -> Self {
        self.config.backoff = backoff;
        self
    }

    /// Convenience for a doubling curve
    #[must_use]
    pub fn exponential(self, initial_delay: Duration, max_delay: Duration) -> Self {
        self.backoff(BackoffStrategy::doubling(initial_delay, max_delay))
    }

    /// Build and validate
    pub fn build(self) -> Result<RetryConfig, RetryConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Backoff state for a single retried operation
#[derive(Debug, Clone)]
pub struct Backoff {
    attempt: u32,
    delay: Duration,
    config: RetryConfig,
}

impl Backoff {
    /// Number of failed attempts recorded so far
    #[must_use]
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Configured attempt limit
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.config.max_attempts
    }

    /// Record a failed attempt and return how long to wait before the next one
    ///
    /// Returns `None` once the attempt budget is spent; the caller must then
    /// report a fatal failure instead of trying again. Delays never decrease
    /// and never exceed the strategy's maximum.
    pub fn next_delay(&mut self) -> Option<Duration> {
        let failed = self.attempt;
        self.attempt = self.attempt.saturating_add(1);
        if self.attempt >= self.config.max_attempts {
            debug!(attempts = self.attempt, "Retry budget exhausted");
            return None;
        }

        let next = self.config.backoff.calculate_delay(failed).max(self.delay);
        self.delay = next.min(self.config.backoff.max_delay());
        Some(self.delay)
    }
}
