//! Core domain types

use std::fmt;

use chrono::{DateTime, Duration, Utc};

/// Untyped response tree returned by the vehicle API
///
/// Maps are ordered (`BTreeMap` backed), so equality is independent of the
/// key order the API happened to send and flattening is deterministic.
pub type Tree = serde_json::Value;

/// A string that must never be printed
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Access the wrapped value
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***")
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***")
    }
}

/// Account login
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: Secret,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self { email: email.into(), password: Secret::new(password) }
    }
}

/// Token set of an authenticated session
///
/// Replaced wholesale on refresh or re-login, never patched in place.
/// `expiry_time` is the wall-clock instant after which the access token must
/// not be used; the renewal margin is applied by [`Session::needs_renewal`].
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expiry_time: DateTime<Utc>,
}

impl Session {
    /// Build a session from a token response received at `now`
    ///
    /// `None` when `expires_in_secs` does not yield a representable instant.
    pub fn issued(
        access_token: String,
        refresh_token: Option<String>,
        expires_in_secs: i64,
        now: DateTime<Utc>,
    ) -> Option<Self> {
        let expiry_time = Duration::try_seconds(expires_in_secs)
            .and_then(|lifetime| now.checked_add_signed(lifetime))?;
        Some(Self { access_token, refresh_token, expiry_time })
    }

    /// Whether the token is within `margin` of its expiry (or past it)
    pub fn needs_renewal(&self, now: DateTime<Utc>, margin: Duration) -> bool {
        match self.expiry_time.checked_sub_signed(margin) {
            Some(deadline) => now >= deadline,
            None => true,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expiry_time
    }

    /// Short token prefix for log lines
    pub fn token_hint(&self) -> String {
        let prefix: String = self.access_token.chars().take(8).collect();
        format!("{prefix}...")
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("access_token", &self.token_hint())
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "***"))
            .field("expiry_time", &self.expiry_time)
            .finish()
    }
}

/// State carried between the authorization redirect and credential submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginTransit {
    /// `resumePath` of the authorization redirect
    pub path_token: String,
    /// First `Set-Cookie` directive (`name=value`)
    pub session_cookie: String,
}

/// Result of inspecting the redirect after credential submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodeOutcome {
    /// Authorization code issued
    Found(String),
    /// Provider wants the consent form submitted for this subject
    NeedsConsent(String),
    /// Neither code nor subject present
    Rejected,
}

/// Delivery guarantee of a bus message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Qos {
    AtMostOnce,
    #[default]
    AtLeastOnce,
}
