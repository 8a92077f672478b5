//! HTTP transport

mod client;

pub use client::{HttpResponse, HttpTransport, HttpTransportBuilder};
