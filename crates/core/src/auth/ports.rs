//! Identity provider port

use async_trait::async_trait;
use polestar_domain::{Credentials, Result, Session};

/// Operations of the identity provider
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Run the full login dance and return a fresh session
    ///
    /// Every call starts from the authorization redirect with a new PKCE pair.
    async fn begin_login(&self, credentials: &Credentials) -> Result<Session>;

    /// Exchange the session's refresh token for a new session
    ///
    /// Fails with `BridgeError::Refresh` when the provider rejects the token;
    /// callers fall back to [`Authenticator::begin_login`].
    async fn refresh(&self, session: &Session) -> Result<Session>;
}
