use async_trait::async_trait;
use chrono::Utc;
use polestar_common::auth::pkce::{generate_state, PkcePair};
use polestar_core::Authenticator;
use polestar_domain::constants::{
    AUTHORIZATION_PATH, FORM_PASSWORD, FORM_SUBJECT, FORM_SUBMIT, FORM_USERNAME, RESUME_SUFFIX,
    TOKEN_PATH,
};
use polestar_domain::{
    truncate_body, BridgeError, CodeOutcome, Credentials, IdentityConfig, LoginTransit, Result,
    Session,
};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use super::redirect::{classify_code, first_cookie, hsts_max_age, query_param};
use crate::http::{HttpResponse, HttpTransport};

/// Successful token endpoint answer
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    expires_in: i64,
}

/// Client for the identity provider's login and token endpoints
#[derive(Clone)]
pub struct IdentityClient {
    http: HttpTransport,
    config: IdentityConfig,
}

impl IdentityClient {
    /// Build a client with its own transport, honoring the configured timeout
    pub fn new(config: IdentityConfig) -> Result<Self> {
        let http = HttpTransport::builder().timeout(config.timeout).build()?;
        Ok(Self::with_transport(http, config))
    }

    pub fn with_transport(http: HttpTransport, config: IdentityConfig) -> Self {
        Self { http, config }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn resume_url(&self, transit: &LoginTransit) -> String {
        let path = format!("{}/{}", transit.path_token.trim_matches('/'), RESUME_SUFFIX);
        let mut url = self.endpoint(&path);
        url.push_str("?client_id=");
        url.extend(url::form_urlencoded::byte_serialize(self.config.client_id.as_bytes()));
        url
    }

    /// Step 1: unauthenticated authorization request
    ///
    /// Requires a redirect carrying a session cookie and a `resumePath`.
    async fn request_authorization(&self, pkce: &PkcePair) -> Result<LoginTransit> {
        let state = generate_state();
        let query = [
            ("response_type", "code"),
            ("client_id", self.config.client_id.as_str()),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("scope", self.config.scope.as_str()),
            ("state", state.as_str()),
            ("code_challenge", pkce.challenge.as_str()),
            ("code_challenge_method", pkce.method()),
        ];
        let response = self.http.get(&self.endpoint(AUTHORIZATION_PATH), &query).await?;

        if !response.is_redirect() {
            return Err(BridgeError::Protocol(format!(
                "authorization endpoint answered {} instead of a redirect: {}",
                response.status(),
                truncate_body(response.body())
            )));
        }

        let session_cookie = response
            .set_cookie()
            .and_then(first_cookie)
            .ok_or_else(|| {
                BridgeError::Protocol("authorization redirect carries no session cookie".into())
            })?;
        let location = response
            .location()
            .ok_or_else(|| {
                BridgeError::Protocol("authorization redirect carries no Location header".into())
            })?;
        let path_token = query_param(location, "resumePath").ok_or_else(|| {
            BridgeError::Protocol(format!("no resumePath in authorization redirect {location}"))
        })?;

        debug!(path_token = %path_token, "Authorization redirect received");
        Ok(LoginTransit { path_token, session_cookie })
    }

    /// Step 2: submit credentials, and the consent form if the provider asks for it
    async fn submit_credentials(
        &self,
        transit: &LoginTransit,
        credentials: &Credentials,
    ) -> Result<String> {
        let url = self.resume_url(transit);
        let form = [
            (FORM_USERNAME, credentials.email.as_str()),
            (FORM_PASSWORD, credentials.password.expose()),
        ];
        let response = self.http.post_form(&url, Some(&transit.session_cookie), &form).await?;
        let response = Self::require_redirect(response, "credential form")?;

        match response.header("strict-transport-security").and_then(hsts_max_age) {
            Some(max_age) => debug!(max_age, "HSTS policy of identity provider"),
            None => debug!("Identity provider sent no parseable HSTS max-age"),
        }

        match classify_code(response.location()) {
            CodeOutcome::Found(code) => Ok(code),
            CodeOutcome::NeedsConsent(uid) => {
                info!("Provider requests consent, submitting consent form");
                self.submit_consent(&url, transit, &uid).await
            }
            CodeOutcome::Rejected => Err(Self::rejection(&response, "credentials rejected")),
        }
    }

    async fn submit_consent(&self, url: &str, transit: &LoginTransit, uid: &str) -> Result<String> {
        let form = [(FORM_SUBMIT, "true"), (FORM_SUBJECT, uid)];
        let response = self.http.post_form(url, Some(&transit.session_cookie), &form).await?;
        let response = Self::require_redirect(response, "consent form")?;

        match classify_code(response.location()) {
            CodeOutcome::Found(code) => Ok(code),
            _ => {
                Err(Self::rejection(&response, "consent step did not yield an authorization code"))
            }
        }
    }

    fn require_redirect(response: HttpResponse, form: &str) -> Result<HttpResponse> {
        if response.is_redirect() {
            return Ok(response);
        }
        Err(BridgeError::Authentication(format!(
            "{form} answered {} instead of a redirect, check your credentials",
            response.status()
        )))
    }

    fn rejection(response: &HttpResponse, reason: &str) -> BridgeError {
        let detail = response.location().and_then(|location| query_param(location, "error"));
        match detail {
            Some(error) => BridgeError::Authentication(format!("{reason} ({error})")),
            None => BridgeError::Authentication(reason.to_string()),
        }
    }

    /// Step 3: trade the authorization code for tokens
    async fn exchange_code(&self, code: &str, pkce: PkcePair) -> Result<Session> {
        let form = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("code_verifier", pkce.verifier.as_str()),
            ("client_id", self.config.client_id.as_str()),
            ("redirect_uri", self.config.redirect_uri.as_str()),
        ];
        let response = self.http.post_form(&self.endpoint(TOKEN_PATH), None, &form).await?;

        Self::parse_tokens(&response)
            .and_then(|tokens| {
                Session::issued(
                    tokens.access_token,
                    tokens.refresh_token,
                    tokens.expires_in,
                    Utc::now(),
                )
            })
            .ok_or_else(|| BridgeError::token_exchange(response.status(), response.body()))
    }

    /// `None` unless the status is 200 and the body is a token set without `errors`
    fn parse_tokens(response: &HttpResponse) -> Option<TokenResponse> {
        if !response.is_success() {
            return None;
        }
        let body: Value = response.json().ok()?;
        if body.get("errors").is_some() {
            return None;
        }
        serde_json::from_value(body).ok()
    }
}

#[async_trait]
impl Authenticator for IdentityClient {
    #[instrument(skip_all)]
    async fn begin_login(&self, credentials: &Credentials) -> Result<Session> {
        let pkce = PkcePair::generate();
        let transit = self.request_authorization(&pkce).await?;
        let code = self.submit_credentials(&transit, credentials).await?;
        debug!("Authorization code received");
        self.exchange_code(&code, pkce).await
    }

    #[instrument(skip_all)]
    async fn refresh(&self, session: &Session) -> Result<Session> {
        let Some(refresh_token) = session.refresh_token.as_deref() else {
            return Err(BridgeError::refresh(0, "session has no refresh token"));
        };
        let form = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", self.config.client_id.as_str()),
        ];
        let response = self.http.post_form(&self.endpoint(TOKEN_PATH), None, &form).await?;

        let Some(tokens) = Self::parse_tokens(&response) else {
            warn!(status = response.status(), "Refresh token rejected");
            return Err(BridgeError::refresh(response.status(), response.body()));
        };
        let expires_in = tokens.expires_in;
        let refresh_token = tokens.refresh_token.or_else(|| session.refresh_token.clone());
        Session::issued(tokens.access_token, refresh_token, expires_in, Utc::now()).ok_or_else(|| {
            warn!(expires_in, "Refresh answered an unusable token lifetime");
            BridgeError::refresh(response.status(), response.body())
        })
    }
}
