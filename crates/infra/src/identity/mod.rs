//! Identity provider adapter
//!
//! Emulates the browser login of a first-party client against the provider's
//! PingFederate endpoints: authorization redirect, credential form (plus the
//! optional consent form) and token exchange.

mod client;
pub mod redirect;

pub use client::IdentityClient;
