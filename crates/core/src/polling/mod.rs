//! Poll cycle

pub mod cycle;

pub use cycle::{CycleReport, Heartbeat, PollCycle, SideChannel};
