//! Authentication primitives
//!
//! Only the provider-agnostic pieces live here. The login dance against the
//! identity provider is implemented in `polestar-infra::identity`.

pub mod pkce;

pub use pkce::{generate_code_challenge, generate_code_verifier, generate_state, PkcePair};
