//! # Polestar Domain
//!
//! Domain types and models for the polestar2mqtt bridge.
//!
//! This crate contains:
//! - Domain data types (Session, Credentials, LoginTransit, etc.)
//! - Domain error types and Result definitions
//! - Configuration structures
//! - Provider endpoints and topic constants
//!
//! ## Architecture
//! - No dependencies on other workspace crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod config;
pub mod constants;
pub mod errors;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
