//! Poll scheduling
//!
//! Drives [`polestar_core::PollCycle`] at a fixed interval until shutdown.

pub mod poll_scheduler;

pub use poll_scheduler::{BusLifecycle, PollScheduler, SchedulerConfig};
