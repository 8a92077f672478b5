//! Generic utilities shared across the polestar2mqtt crates.
//!
//! Nothing in here knows about vehicles, brokers or the identity provider:
//! - [`auth`]: PKCE verifier/challenge generation (RFC 7636)
//! - [`resilience`]: exponential backoff state and retry limits

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

pub mod auth;
pub mod resilience;

// Re-export commonly used types and functions
pub use auth::{generate_code_challenge, generate_code_verifier, generate_state, PkcePair};
pub use resilience::{Backoff, BackoffStrategy, RetryConfig, RetryConfigBuilder, RetryConfigError};
