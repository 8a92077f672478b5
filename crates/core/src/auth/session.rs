//! Session renewal policy

use std::sync::Arc;

use chrono::{Duration, Utc};
use polestar_domain::constants::MAX_TOKEN_MARGIN_SECS;
use polestar_domain::{BridgeError, Credentials, Result, Session};
use tracing::{debug, info, warn};

use super::ports::Authenticator;

/// Keeps a session usable across poll cycles
///
/// Renewal is attempted once the session is within `margin` of its expiry:
/// refresh first when a refresh token exists, full login otherwise or when the
/// refresh fails.
pub struct SessionManager {
    authenticator: Arc<dyn Authenticator>,
    credentials: Credentials,
    margin: Duration,
}

impl SessionManager {
    pub fn new(
        authenticator: Arc<dyn Authenticator>,
        credentials: Credentials,
        margin: std::time::Duration,
    ) -> Self {
        let max = Duration::seconds(MAX_TOKEN_MARGIN_SECS as i64);
        let margin = match Duration::from_std(margin) {
            Ok(margin) if margin <= max => margin,
            _ => {
                warn!(margin_secs = margin.as_secs(), "Renewal margin out of range, clamped");
                max
            }
        };
        Self { authenticator, credentials, margin }
    }

    /// Return a session that is safe to use right now
    ///
    /// Expiry is never an error here; only a failed full login is.
    pub async fn ensure_valid(&self, current: Option<&Session>) -> Result<Session> {
        if let Some(session) = current {
            if !session.needs_renewal(Utc::now(), self.margin) {
                return Ok(session.clone());
            }

            debug!(expiry_time = %session.expiry_time, "Session approaching expiry");
            if session.refresh_token.is_some() {
                match self.try_refresh(session).await {
                    Ok(renewed) => return Ok(renewed),
                    Err(err) => {
                        warn!(
                            error = %err,
                            error_kind = err.label(),
                            "Token refresh failed, falling back to full login"
                        );
                    }
                }
            }
        }

        info!(email = %self.credentials.email, "Logging in");
        let session = self.authenticator.begin_login(&self.credentials).await?;
        Self::check_lifetime(&session)?;
        info!(token = %session.token_hint(), expiry_time = %session.expiry_time, "Login succeeded");
        Ok(session)
    }

    async fn try_refresh(&self, session: &Session) -> Result<Session> {
        let renewed = self.authenticator.refresh(session).await?;
        Self::check_lifetime(&renewed)?;
        info!(
            token = %renewed.token_hint(),
            expiry_time = %renewed.expiry_time,
            "Session refreshed"
        );
        Ok(renewed)
    }

    fn check_lifetime(session: &Session) -> Result<()> {
        if session.is_expired(Utc::now()) {
            return Err(BridgeError::Protocol(format!(
                "provider issued a token that is already expired ({})",
                session.expiry_time
            )));
        }
        Ok(())
    }
}
