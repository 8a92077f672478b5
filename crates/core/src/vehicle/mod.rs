//! Vehicle data access

pub mod ports;
