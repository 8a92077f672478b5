//! Session lifecycle

pub mod ports;
pub mod session;

pub use session::SessionManager;
