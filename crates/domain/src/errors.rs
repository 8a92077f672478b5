//! Error types used throughout the bridge

use thiserror::Error;

use crate::constants::BODY_PREVIEW_LIMIT;

/// Main error type for the bridge
///
/// Variants follow the failure taxonomy of the login dance, the vehicle API
/// and the broker connection. HTTP-derived variants carry the status code and
/// a truncated response body so a provider contract change can be diagnosed
/// from the logs alone.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BridgeError {
    /// The identity provider answered with an unexpected shape
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Credentials were rejected or a consent step could not be completed
    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Token exchange failed (status {status}): {body}")]
    TokenExchange { status: u16, body: String },

    #[error("Token refresh failed (status {status}): {body}")]
    Refresh { status: u16, body: String },

    #[error("Upstream error (status {status}): {body}")]
    Upstream { status: u16, body: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Broker unavailable after {attempts} attempts: {reason}")]
    BrokerUnavailable { attempts: u32, reason: String },

    #[error("Publish error: {0}")]
    Publish(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl BridgeError {
    /// Build an upstream error, truncating the body
    pub fn upstream(status: u16, body: &str) -> Self {
        Self::Upstream { status, body: truncate_body(body) }
    }

    pub fn token_exchange(status: u16, body: &str) -> Self {
        Self::TokenExchange { status, body: truncate_body(body) }
    }

    pub fn refresh(status: u16, body: &str) -> Self {
        Self::Refresh { status, body: truncate_body(body) }
    }

    /// Stable label for the `error_kind` log field
    pub fn label(&self) -> &'static str {
        match self {
            Self::Protocol(_) => "protocol",
            Self::Authentication(_) => "authentication",
            Self::TokenExchange { .. } => "token_exchange",
            Self::Refresh { .. } => "refresh",
            Self::Upstream { .. } => "upstream",
            Self::NotFound(_) => "not_found",
            Self::BrokerUnavailable { .. } => "broker_unavailable",
            Self::Publish(_) => "publish",
            Self::Network(_) => "network",
            Self::Config(_) => "config",
            Self::Internal(_) => "internal",
        }
    }

    /// Errors raised by the login dance itself
    ///
    /// These feed the consecutive-login-failure counter of the scheduler.
    pub fn is_login_failure(&self) -> bool {
        matches!(
            self,
            Self::Protocol(_)
                | Self::Authentication(_)
                | Self::TokenExchange { .. }
                | Self::Refresh { .. }
        )
    }

    /// The data API rejected the bearer token
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Upstream { status: 401 | 403, .. })
    }

    /// Errors after which the process must stop instead of waiting for the next cycle
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::BrokerUnavailable { .. } | Self::Config(_))
    }
}

/// Truncate a response body for embedding in an error or log line
///
/// Cuts at [`BODY_PREVIEW_LIMIT`] bytes on a char boundary and marks the cut.
pub fn truncate_body(body: &str) -> String {
    if body.len() <= BODY_PREVIEW_LIMIT {
        return body.to_string();
    }
    let mut end = BODY_PREVIEW_LIMIT;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}

/// Result type alias for bridge operations
pub type Result<T> = std::result::Result<T, BridgeError>;
