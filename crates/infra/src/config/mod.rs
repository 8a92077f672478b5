//! Configuration loading
//!
//! This module builds the bridge configuration from environment variables.

pub mod loader;

// Re-export commonly used items
pub use loader::{load_from_env, load_from_lookup, validate_vin};
