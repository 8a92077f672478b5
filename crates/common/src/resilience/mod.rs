//! Resilience patterns for transient failures
//!
//! Provides the backoff bookkeeping used by the broker connection driver.
//! The module stays generic: it computes delays and counts attempts but never
//! sleeps or performs I/O itself, so callers decide how to wait (usually a
//! `tokio::time::sleep` raced against a cancellation token).

pub mod retry;

pub use retry::{Backoff, BackoffStrategy, RetryConfig, RetryConfigBuilder, RetryConfigError};
