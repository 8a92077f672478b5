//! Change-gated publishing of response trees

pub mod change_gate;
pub mod flatten;
pub mod ports;

pub use change_gate::{GateOutcome, SnapshotSlot};
pub use flatten::flatten;
