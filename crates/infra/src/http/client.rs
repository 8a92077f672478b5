use std::time::Duration;

use polestar_domain::{BridgeError, Result};
use reqwest::header::{HeaderMap, AUTHORIZATION, COOKIE, LOCATION, SET_COOKIE};
use reqwest::redirect::Policy;
use reqwest::{Client as ReqwestClient, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::errors::InfraError;

const USER_AGENT: &str = concat!("polestar2mqtt/", env!("CARGO_PKG_VERSION"));

/// HTTP client that never follows redirects.
///
/// The login dance reads `Location` and `Set-Cookie` off each redirect, so
/// every 3xx is handed back to the caller untouched. All requests carry a
/// timeout.
#[derive(Clone)]
pub struct HttpTransport {
    client: ReqwestClient,
}

impl HttpTransport {
    /// Start building a new transport.
    pub fn builder() -> HttpTransportBuilder {
        HttpTransportBuilder::default()
    }

    /// Convenience constructor with default configuration.
    pub fn new() -> Result<Self> {
        Self::builder().build()
    }

    /// GET with query parameters.
    pub async fn get<Q>(&self, url: &str, query: &Q) -> Result<HttpResponse>
    where
        Q: Serialize + ?Sized,
    {
        self.execute(self.client.get(url).query(query)).await
    }

    /// POST an `application/x-www-form-urlencoded` body, optionally with a cookie.
    pub async fn post_form<F>(
        &self,
        url: &str,
        cookie: Option<&str>,
        form: &F,
    ) -> Result<HttpResponse>
    where
        F: Serialize + ?Sized,
    {
        let mut builder = self.client.post(url).form(form);
        if let Some(cookie) = cookie {
            builder = builder.header(COOKIE, cookie);
        }
        self.execute(builder).await
    }

    /// POST a JSON body with a bearer token.
    pub async fn post_json<B>(&self, url: &str, bearer: &str, body: &B) -> Result<HttpResponse>
    where
        B: Serialize + ?Sized,
    {
        let builder =
            self.client.post(url).header(AUTHORIZATION, format!("Bearer {bearer}")).json(body);
        self.execute(builder).await
    }

    async fn execute(&self, builder: RequestBuilder) -> Result<HttpResponse> {
        let request = builder.build().map_err(|err| BridgeError::from(InfraError::from(err)))?;
        let method = request.method().clone();
        let url = request.url().clone();
        debug!(%method, url = %redact_query(&url), "sending HTTP request");

        let response = self.client.execute(request).await.map_err(|err| {
            debug!(%method, url = %redact_query(&url), error = %err, "HTTP request failed");
            BridgeError::from(InfraError::from(err))
        })?;

        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response.text().await.map_err(|err| BridgeError::from(InfraError::from(err)))?;
        debug!(%method, url = %redact_query(&url), status, "received HTTP response");

        Ok(HttpResponse { status, headers, body })
    }
}

/// Query strings carry codes and challenges; keep them out of logs.
fn redact_query(url: &reqwest::Url) -> String {
    let mut shown = url.clone();
    if shown.query().is_some() {
        shown.set_query(Some("..."));
    }
    shown.to_string()
}

/// Fully buffered response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    status: u16,
    headers: HeaderMap,
    body: String,
}

impl HttpResponse {
    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn is_success(&self) -> bool {
        self.status == 200
    }

    /// Any 3xx answer carrying a `Location`-style hand-off.
    pub fn is_redirect(&self) -> bool {
        matches!(self.status, 301 | 302 | 303 | 307 | 308)
    }

    /// First value of `name`, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    pub fn location(&self) -> Option<&str> {
        self.headers.get(LOCATION).and_then(|value| value.to_str().ok())
    }

    /// The first `Set-Cookie` header, if any.
    pub fn set_cookie(&self) -> Option<&str> {
        self.headers.get(SET_COOKIE).and_then(|value| value.to_str().ok())
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    /// Decode the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_str(&self.body).map_err(|err| BridgeError::from(InfraError::from(err)))
    }
}

/// Builder for [`HttpTransport`].
#[derive(Debug)]
pub struct HttpTransportBuilder {
    timeout: Duration,
}

impl Default for HttpTransportBuilder {
    fn default() -> Self {
        Self { timeout: Duration::from_secs(30) }
    }
}

impl HttpTransportBuilder {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn build(self) -> Result<HttpTransport> {
        let client = ReqwestClient::builder()
            .timeout(self.timeout)
            .user_agent(USER_AGENT)
            .redirect(Policy::none())
            .build()
            .map_err(|err| BridgeError::from(InfraError::from(err)))?;

        Ok(HttpTransport { client })
    }
}
