//! Vehicle data API adapter

mod client;
pub mod queries;

pub use client::VehicleApiClient;
