//! Integration tests for the identity provider login dance
//!
//! **Purpose**: Drive `IdentityClient` through all three login steps and the
//! refresh grant against a mock provider.
//!
//! **Coverage:**
//! - Happy path: redirect → credentials → token exchange
//! - Consent step: `uid` without `code` triggers the consent form
//! - Provider shape changes: 200 instead of redirect, missing cookie
//! - Rejections: bad credentials, token endpoint errors, unusable lifetimes
//! - PKCE binding: challenge matches verifier, fresh pair per attempt
//! - Refresh: success, rejection, missing refresh token in the answer
//!
//! **Infrastructure:**
//! - WireMock HTTP server standing in for the PingFederate endpoints

use std::collections::HashMap;
use std::time::Duration;

use chrono::Utc;
use polestar_common::auth::pkce::generate_code_challenge;
use polestar_core::Authenticator;
use polestar_domain::{BridgeError, Credentials, IdentityConfig, Session};
use polestar_infra::IdentityClient;
use serde_json::json;
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

const RESUME: &str = "/as/Ab12C/resume/as/authorization.ping";
const CALLBACK: &str = "https://www.polestar.com/sign-in-callback";

fn client(server: &MockServer) -> IdentityClient {
    IdentityClient::new(IdentityConfig {
        base_url: format!("{}/as", server.uri()),
        client_id: "l3oopkc_10".into(),
        redirect_uri: CALLBACK.into(),
        scope: "openid profile email customer:attributes".into(),
        timeout: Duration::from_secs(5),
    })
    .expect("identity client")
}

fn credentials() -> Credentials {
    Credentials::new("driver@example.com", "s3cret&pass")
}

fn form_fields(request: &Request) -> HashMap<String, String> {
    url::form_urlencoded::parse(&request.body).into_owned().collect()
}

fn query_fields(request: &Request) -> HashMap<String, String> {
    request.url.query_pairs().into_owned().collect()
}

async fn mount_authorization(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/as/authorization.oauth2"))
        .and(query_param("response_type", "code"))
        .and(query_param("client_id", "l3oopkc_10"))
        .and(query_param("code_challenge_method", "S256"))
        .respond_with(
            ResponseTemplate::new(303)
                .insert_header(
                    "Location",
                    "/as/authorization?resumePath=Ab12C&allowInteraction=true",
                )
                .insert_header("Set-Cookie", "PF=cookie-value; Path=/; Secure; HttpOnly"),
        )
        .mount(server)
        .await;
}

async fn mount_credentials(server: &MockServer, location: &str) {
    Mock::given(method("POST"))
        .and(path(RESUME))
        .and(query_param("client_id", "l3oopkc_10"))
        .and(header("cookie", "PF=cookie-value"))
        .and(body_string_contains("pf.username=driver%40example.com"))
        .respond_with(
            ResponseTemplate::new(302)
                .insert_header("Location", location)
                .insert_header("Strict-Transport-Security", "max-age=31536000; includeSubDomains"),
        )
        .mount(server)
        .await;
}

async fn mount_token(server: &MockServer, grant: &str, response: ResponseTemplate) {
    Mock::given(method("POST"))
        .and(path("/as/token.oauth2"))
        .and(body_string_contains(&format!("grant_type={grant}")))
        .respond_with(response)
        .mount(server)
        .await;
}

fn tokens(access: &str, refresh: Option<&str>) -> ResponseTemplate {
    let mut body = json!({"access_token": access, "expires_in": 1799, "token_type": "Bearer"});
    if let Some(refresh) = refresh {
        body["refresh_token"] = json!(refresh);
    }
    ResponseTemplate::new(200).set_body_json(body)
}

fn session(refresh: Option<&str>) -> Session {
    Session::issued("old-access".into(), refresh.map(str::to_string), 1, Utc::now()).unwrap()
}

/// Full login without consent.
///
/// Assertions:
/// - Session carries the issued tokens
/// - Expiry is `expires_in` seconds ahead
/// - Token request contains the code from the callback redirect
/// - Verifier sent with the code hashes to the challenge of step 1
#[tokio::test]
async fn test_login_happy_path() {
    let server = MockServer::start().await;
    mount_authorization(&server).await;
    mount_credentials(&server, &format!("{CALLBACK}?code=AUTH-CODE-1&state=x")).await;
    mount_token(&server, "authorization_code", tokens("access-1", Some("refresh-1"))).await;

    let before = Utc::now();
    let session = client(&server).begin_login(&credentials()).await.expect("login");

    assert_eq!(session.access_token, "access-1");
    assert_eq!(session.refresh_token.as_deref(), Some("refresh-1"));
    assert!(session.expiry_time >= before + chrono::Duration::seconds(1799));
    assert!(session.expiry_time > Utc::now());

    let requests = server.received_requests().await.unwrap();
    let authorize = requests.iter().find(|r| r.url.path() == "/as/authorization.oauth2").unwrap();
    let token = requests.iter().find(|r| r.url.path() == "/as/token.oauth2").unwrap();
    let credentials_form = requests.iter().find(|r| r.url.path() == RESUME).unwrap();

    let query = query_fields(authorize);
    let token_form = form_fields(token);
    assert_eq!(token_form["code"], "AUTH-CODE-1");
    assert_eq!(token_form["redirect_uri"], CALLBACK);
    assert_eq!(query["code_challenge"], generate_code_challenge(&token_form["code_verifier"]));
    assert!(!query["state"].is_empty());

    let submitted = form_fields(credentials_form);
    assert_eq!(submitted["pf.username"], "driver@example.com");
    assert_eq!(submitted["pf.pass"], "s3cret&pass");
}

#[tokio::test]
async fn test_consent_step_is_submitted_when_code_missing() {
    let server = MockServer::start().await;
    mount_authorization(&server).await;
    mount_credentials(&server, &format!("{RESUME}?uid=user-42")).await;
    Mock::given(method("POST"))
        .and(path(RESUME))
        .and(body_string_contains("pf.submit=true"))
        .and(body_string_contains("subject=user-42"))
        .respond_with(
            ResponseTemplate::new(302)
                .insert_header("Location", format!("{CALLBACK}?code=AFTER-CONSENT")),
        )
        .expect(1)
        .mount(&server)
        .await;
    mount_token(&server, "authorization_code", tokens("access-2", Some("refresh-2"))).await;

    let session = client(&server).begin_login(&credentials()).await.expect("login");

    assert_eq!(session.access_token, "access-2");
    let requests = server.received_requests().await.unwrap();
    let token = requests.iter().find(|r| r.url.path() == "/as/token.oauth2").unwrap();
    assert_eq!(form_fields(token)["code"], "AFTER-CONSENT");
}

#[tokio::test]
async fn test_consent_without_code_is_authentication_error() {
    let server = MockServer::start().await;
    mount_authorization(&server).await;
    mount_credentials(&server, &format!("{RESUME}?uid=user-42")).await;
    Mock::given(method("POST"))
        .and(path(RESUME))
        .and(body_string_contains("pf.submit=true"))
        .respond_with(
            ResponseTemplate::new(302).insert_header("Location", format!("{RESUME}?uid=user-42")),
        )
        .mount(&server)
        .await;

    let err = client(&server).begin_login(&credentials()).await.unwrap_err();

    assert!(matches!(err, BridgeError::Authentication(_)), "{err:?}");
}

#[tokio::test]
async fn test_authorization_without_redirect_is_protocol_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/as/authorization.oauth2"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>login</html>"))
        .mount(&server)
        .await;

    let err = client(&server).begin_login(&credentials()).await.unwrap_err();

    assert!(matches!(err, BridgeError::Protocol(ref msg) if msg.contains("200")), "{err:?}");
    assert!(err.is_login_failure());
}

#[tokio::test]
async fn test_redirect_without_cookie_is_protocol_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/as/authorization.oauth2"))
        .respond_with(
            ResponseTemplate::new(302)
                .insert_header("Location", "/as/authorization?resumePath=Ab12C"),
        )
        .mount(&server)
        .await;

    let err = client(&server).begin_login(&credentials()).await.unwrap_err();

    assert!(matches!(err, BridgeError::Protocol(ref msg) if msg.contains("cookie")), "{err:?}");
}

#[tokio::test]
async fn test_redirect_without_resume_path_is_protocol_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/as/authorization.oauth2"))
        .respond_with(
            ResponseTemplate::new(302)
                .insert_header("Location", "/as/authorization?other=1")
                .insert_header("Set-Cookie", "PF=cookie-value; Path=/"),
        )
        .mount(&server)
        .await;

    let err = client(&server).begin_login(&credentials()).await.unwrap_err();

    assert!(matches!(err, BridgeError::Protocol(ref msg) if msg.contains("resumePath")), "{err:?}");
}

#[tokio::test]
async fn test_rejected_credentials_are_authentication_error() {
    let server = MockServer::start().await;
    mount_authorization(&server).await;
    Mock::given(method("POST"))
        .and(path(RESUME))
        .respond_with(ResponseTemplate::new(200).set_body_string("<form>Wrong password</form>"))
        .mount(&server)
        .await;
    mount_token(&server, "authorization_code", tokens("never", None)).await;

    let err = client(&server).begin_login(&credentials()).await.unwrap_err();

    assert!(matches!(err, BridgeError::Authentication(_)), "{err:?}");
    let requests = server.received_requests().await.unwrap();
    assert!(requests.iter().all(|r| r.url.path() != "/as/token.oauth2"));
}

#[tokio::test]
async fn test_redirect_without_code_or_uid_is_authentication_error() {
    let server = MockServer::start().await;
    mount_authorization(&server).await;
    mount_credentials(&server, &format!("{CALLBACK}?error=access_denied")).await;

    let err = client(&server).begin_login(&credentials()).await.unwrap_err();

    assert_eq!(err, BridgeError::Authentication("credentials rejected (access_denied)".into()));
}

#[tokio::test]
async fn test_token_endpoint_failure_is_token_exchange_error() {
    let server = MockServer::start().await;
    mount_authorization(&server).await;
    mount_credentials(&server, &format!("{CALLBACK}?code=C")).await;
    mount_token(
        &server,
        "authorization_code",
        ResponseTemplate::new(400).set_body_json(json!({"error": "invalid_grant"})),
    )
    .await;

    let err = client(&server).begin_login(&credentials()).await.unwrap_err();

    match err {
        BridgeError::TokenExchange { status, body } => {
            assert_eq!(status, 400);
            assert!(body.contains("invalid_grant"));
        }
        other => panic!("expected token exchange error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_errors_field_in_token_answer_is_token_exchange_error() {
    let server = MockServer::start().await;
    mount_authorization(&server).await;
    mount_credentials(&server, &format!("{CALLBACK}?code=C")).await;
    mount_token(
        &server,
        "authorization_code",
        ResponseTemplate::new(200).set_body_json(json!({"errors": [{"message": "denied"}]})),
    )
    .await;

    let err = client(&server).begin_login(&credentials()).await.unwrap_err();

    assert!(matches!(err, BridgeError::TokenExchange { status: 200, .. }), "{err:?}");
}

/// A token lifetime beyond the representable time range.
///
/// Assertions:
/// - Login fails with `TokenExchange` carrying the answer, instead of panicking
#[tokio::test]
async fn test_unrepresentable_expires_in_is_token_exchange_error() {
    let server = MockServer::start().await;
    mount_authorization(&server).await;
    mount_credentials(&server, &format!("{CALLBACK}?code=C")).await;
    mount_token(
        &server,
        "authorization_code",
        ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "a",
            "refresh_token": "r",
            "expires_in": 9_000_000_000_000_000_i64
        })),
    )
    .await;

    let err = client(&server).begin_login(&credentials()).await.unwrap_err();

    match err {
        BridgeError::TokenExchange { status, body } => {
            assert_eq!(status, 200);
            assert!(body.contains("9000000000000000"));
        }
        other => panic!("expected token exchange error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_each_login_uses_a_fresh_pkce_pair() {
    let server = MockServer::start().await;
    mount_authorization(&server).await;
    mount_credentials(&server, &format!("{CALLBACK}?code=C")).await;
    mount_token(&server, "authorization_code", tokens("a", Some("r"))).await;

    let identity = client(&server);
    identity.begin_login(&credentials()).await.expect("first login");
    identity.begin_login(&credentials()).await.expect("second login");

    let requests = server.received_requests().await.unwrap();
    let challenges: Vec<String> = requests
        .iter()
        .filter(|r| r.url.path() == "/as/authorization.oauth2")
        .map(|r| query_fields(r)["code_challenge"].clone())
        .collect();
    assert_eq!(challenges.len(), 2);
    assert_ne!(challenges[0], challenges[1]);
}

#[tokio::test]
async fn test_refresh_replaces_session() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/as/token.oauth2"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=refresh-old"))
        .respond_with(tokens("access-new", Some("refresh-new")))
        .expect(1)
        .mount(&server)
        .await;

    let renewed = client(&server).refresh(&session(Some("refresh-old"))).await.expect("refresh");

    assert_eq!(renewed.access_token, "access-new");
    assert_eq!(renewed.refresh_token.as_deref(), Some("refresh-new"));
    assert!(renewed.expiry_time > Utc::now());
}

#[tokio::test]
async fn test_refresh_without_new_refresh_token_keeps_old_one() {
    let server = MockServer::start().await;
    mount_token(&server, "refresh_token", tokens("access-new", None)).await;

    let renewed = client(&server).refresh(&session(Some("refresh-old"))).await.expect("refresh");

    assert_eq!(renewed.refresh_token.as_deref(), Some("refresh-old"));
}

#[tokio::test]
async fn test_rejected_refresh_is_refresh_error() {
    let server = MockServer::start().await;
    mount_token(
        &server,
        "refresh_token",
        ResponseTemplate::new(401).set_body_json(json!({"error": "invalid_grant"})),
    )
    .await;

    let err = client(&server).refresh(&session(Some("refresh-old"))).await.unwrap_err();

    assert!(matches!(err, BridgeError::Refresh { status: 401, .. }), "{err:?}");
}

#[tokio::test]
async fn test_refresh_with_unrepresentable_expires_in_is_refresh_error() {
    let server = MockServer::start().await;
    mount_token(
        &server,
        "refresh_token",
        ResponseTemplate::new(200)
            .set_body_json(json!({"access_token": "a", "expires_in": i64::MIN})),
    )
    .await;

    let err = client(&server).refresh(&session(Some("refresh-old"))).await.unwrap_err();

    assert!(matches!(err, BridgeError::Refresh { status: 200, .. }), "{err:?}");
}

#[tokio::test]
async fn test_refresh_without_token_fails_without_request() {
    let server = MockServer::start().await;

    let err = client(&server).refresh(&session(None)).await.unwrap_err();

    assert!(matches!(err, BridgeError::Refresh { .. }));
    assert!(server.received_requests().await.unwrap().is_empty());
}
