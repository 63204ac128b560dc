//! Identity provider adapter.
//!
//! All interaction with the hosted OIDC provider goes through
//! [`IdentityProvider`]. The adapter never touches the session; it only
//! builds URLs, exchanges codes and verifies ID tokens.

pub mod cognito;
pub mod jwt;

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngCore;
use rand::rngs::OsRng;
use serde_json::{Map, Value};
use std::future::Future;

use crate::error::AuthError;
use crate::users::AuthenticatedUser;

/// Scopes requested on every login.
pub const SCOPES: [&str; 3] = ["openid", "email", "phone"];

/// Random bytes behind each OAuth `state` value.
pub const STATE_BYTES: usize = 32;

/// Authorization redirect produced by [`IdentityProvider::begin_login`].
#[derive(Debug, Clone)]
pub struct LoginRequest {
    pub authorization_url: String,
    pub state: String,
}

/// Result of a successful code exchange. Consumed once by the lifecycle
/// manager, then dropped.
#[derive(Debug, Clone)]
pub struct OAuthExchangeResult {
    pub access_token: String,
    pub id_token: String,
    pub claims: Map<String, Value>,
    pub user: AuthenticatedUser,
}

/// Pluggable OIDC provider.
///
/// Uses RPITIT, so it is not object-safe; the lifecycle manager is generic
/// over it instead.
pub trait IdentityProvider: Send + Sync {
    /// Fresh state plus the provider's authorization-code URL.
    fn begin_login(&self) -> LoginRequest;

    /// Check `returned_state` against `expected_state`, then exchange `code`
    /// and verify the ID token. The state check happens before any I/O.
    fn complete_login(
        &self,
        code: &str,
        returned_state: &str,
        expected_state: &str,
    ) -> impl Future<Output = Result<OAuthExchangeResult, AuthError>> + Send;

    /// Federated logout URL. Pure string construction.
    fn logout_url(&self, post_logout_redirect: &str) -> String;
}

/// 32 bytes from the OS CSPRNG, URL-safe base64 without padding.
pub fn generate_state() -> String {
    let mut bytes = [0u8; STATE_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Constant-time comparison of the returned and stored state values.
pub fn states_match(returned: &str, expected: &str) -> bool {
    use subtle::ConstantTimeEq;
    !expected.is_empty() && bool::from(returned.as_bytes().ct_eq(expected.as_bytes()))
}
