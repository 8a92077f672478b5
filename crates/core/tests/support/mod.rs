//! Shared test helpers for `polestar-core` integration tests.
//!
//! Scripted mocks for the three ports so tests can focus on the cycle and
//! session policy instead of boilerplate.

#![allow(dead_code)]

pub mod mocks;

use chrono::{Duration, Utc};
use polestar_domain::{Credentials, Session};

pub fn credentials() -> Credentials {
    Credentials::new("driver@example.com", "correct horse")
}

/// Session that expires `secs` seconds from now
pub fn session_expiring_in(secs: i64, access: &str, refresh: Option<&str>) -> Session {
    Session {
        access_token: access.to_string(),
        refresh_token: refresh.map(str::to_string),
        expiry_time: Utc::now() + Duration::seconds(secs),
    }
}
