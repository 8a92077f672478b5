//! PKCE (Proof Key for Code Exchange) implementation for OAuth 2.0
//!
//! Implements RFC 7636 for authorization without a client secret. A pair is
//! bound to exactly one login attempt: the provider checks at token-exchange
//! time that the verifier hashes to the challenge sent with the authorization
//! request, so a stale verifier is always rejected.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::Rng;
use sha2::{Digest, Sha256};

/// Number of random bytes behind a verifier (43 base64url characters).
const VERIFIER_BYTES: usize = 32;

/// Generate a cryptographically secure code verifier
///
/// Returns 32 random bytes from the thread-local CSPRNG, base64url encoded
/// without padding. A failing system random source aborts the process inside
/// `rand`; there is no recoverable error path.
#[must_use]
pub fn generate_code_verifier() -> String {
    let random_bytes: [u8; VERIFIER_BYTES] = rand::thread_rng().gen();
    URL_SAFE_NO_PAD.encode(random_bytes)
}

/// Generate code challenge from verifier using SHA256
///
/// `challenge = BASE64URL(SHA256(ASCII(code_verifier)))`
#[must_use]
pub fn generate_code_challenge(verifier: &str) -> String {
    let hash = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hash)
}

/// Generate a random `state` value for the authorization request
#[must_use]
pub fn generate_state() -> String {
    let random_bytes: [u8; 16] = rand::thread_rng().gen();
    URL_SAFE_NO_PAD.encode(random_bytes)
}

/// Verifier/challenge pair for one authorization attempt
///
/// Deliberately not `Clone`: a pair is created, used for a single login
/// attempt and dropped.
#[derive(Debug)]
pub struct PkcePair {
    /// Secret half, sent only with the token exchange
    pub verifier: String,

    /// `S256` hash of the verifier, sent with the authorization request
    pub challenge: String,
}

impl PkcePair {
    /// Generate a fresh pair
    ///
    /// # Examples
    /// ```
    /// use polestar_common::auth::pkce::{generate_code_challenge, PkcePair};
    ///
    /// let pair = PkcePair::generate();
    /// assert_eq!(pair.challenge, generate_code_challenge(&pair.verifier));
    /// ```
    #[must_use]
    pub fn generate() -> Self {
        let verifier = generate_code_verifier();
        let challenge = generate_code_challenge(&verifier);
        Self { verifier, challenge }
    }

    /// Challenge method sent as `code_challenge_method`
    #[must_use]
    pub const fn method(&self) -> &'static str {
        "S256"
    }
}
