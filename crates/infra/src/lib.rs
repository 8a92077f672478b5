//! # Polestar Infrastructure
//!
//! Infrastructure implementations of core domain ports.
//!
//! This crate contains:
//! - HTTP transport without redirect following
//! - Identity provider client (login dance and token refresh)
//! - Vehicle data API client
//! - MQTT bus client with reconnect backoff and last will
//! - Environment configuration loader
//! - Poll scheduler
//!
//! ## Architecture
//! - Implements traits defined in `polestar-core`
//! - Depends on `polestar-common`, `polestar-domain` and `polestar-core`
//! - Contains all "impure" code (network I/O, timers, environment)

pub mod config;
pub mod errors;
pub mod http;
pub mod identity;
pub mod mqtt;
pub mod scheduling;
pub mod vehicle;

// Re-export commonly used items
pub use config::{load_from_env, load_from_lookup};
pub use errors::InfraError;
pub use http::{HttpResponse, HttpTransport, HttpTransportBuilder};
pub use identity::IdentityClient;
pub use mqtt::MqttBus;
pub use scheduling::{BusLifecycle, PollScheduler, SchedulerConfig};
pub use vehicle::VehicleApiClient;
