//! # Polestar Core
//!
//! Pure business logic layer - no infrastructure dependencies.
//!
//! This crate contains:
//! - Port interfaces (traits) for the identity provider, the vehicle API and
//!   the message bus
//! - Session renewal policy
//! - Topic flattening and change-gated publishing
//! - One poll cycle, as driven by the scheduler in `polestar-infra`
//!
//! ## Architecture Principles
//! - Only depends on `polestar-domain`
//! - No HTTP or MQTT code
//! - All external dependencies via traits

pub mod auth;
pub mod polling;
pub mod publish;
pub mod vehicle;

// Re-export specific items to avoid ambiguity
pub use auth::ports::Authenticator;
pub use auth::SessionManager;
pub use polling::{CycleReport, Heartbeat, PollCycle, SideChannel};
pub use publish::ports::BusPublisher;
pub use publish::{flatten, GateOutcome, SnapshotSlot};
pub use vehicle::ports::VehicleDataSource;
