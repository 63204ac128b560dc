//! Cookie-backed session store.
//!
//! `load` never fails: a missing, tampered, undecodable or expired cookie
//! yields an empty session. `save` and `clear` each replace any earlier
//! `Set-Cookie` for the session cookie, so a response carries at most one
//! session write.

use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use super::Session;
use super::cookie::{sign_payload, verify_payload};
use crate::config::Config;
use crate::error::AuthError;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("failed to encode session: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("session cookie is not a valid header value")]
    Header,

    #[error("session cookie is {0} bytes, over the {max} byte limit", max = MAX_COOKIE_BYTES)]
    TooLarge(usize),
}

/// Largest `name=value` pair browsers will keep.
pub const MAX_COOKIE_BYTES: usize = 4096;

/// Signed payload: the session plus the time it was written.
#[derive(Serialize, Deserialize)]
struct Envelope {
    iat: u64,
    session: Session,
}

/// Session store configuration, injected at construction.
#[derive(Debug, Clone)]
pub struct CookieSessionStore {
    secret: Vec<u8>,
    cookie_name: String,
    max_age: Duration,
    https_only: bool,
    cookie_domain: Option<String>,
}

impl CookieSessionStore {
    pub fn new(
        secret: impl Into<Vec<u8>>,
        cookie_name: impl Into<String>,
        max_age: Duration,
        https_only: bool,
        cookie_domain: Option<String>,
    ) -> Self {
        Self {
            secret: secret.into(),
            cookie_name: cookie_name.into(),
            max_age,
            https_only,
            cookie_domain,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.session_secret.as_bytes(),
            config.session_cookie_name.clone(),
            Duration::from_secs(config.session_max_age_secs),
            config.session_https_only,
            config.cookie_domain.clone(),
        )
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    /// Load the session carried by the request, or an empty one.
    pub fn load(&self, headers: &HeaderMap) -> Session {
        match self.inspect(headers) {
            Some(Ok(session)) => session,
            Some(Err(_)) | None => Session::default(),
        }
    }

    /// Decode the request's session cookie, distinguishing "no cookie" from
    /// "cookie present but unusable".
    pub fn inspect(&self, headers: &HeaderMap) -> Option<Result<Session, AuthError>> {
        let value = headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find_map(|h| parse_cookie(h, &self.cookie_name))?;
        Some(self.decode(value))
    }

    /// Verify and decode one cookie value.
    pub fn decode(&self, value: &str) -> Result<Session, AuthError> {
        let payload = verify_payload(&self.secret, value).ok_or(AuthError::SessionDecodeFailed)?;
        let envelope: Envelope =
            serde_json::from_slice(&payload).map_err(|_| AuthError::SessionDecodeFailed)?;

        let now = now_secs();
        if envelope.iat > now + 60 || now.saturating_sub(envelope.iat) > self.max_age.as_secs() {
            return Err(AuthError::SessionDecodeFailed);
        }
        Ok(envelope.session)
    }

    /// Sign and encode a session into a cookie value.
    pub fn encode(&self, session: &Session) -> Result<String, SessionError> {
        let envelope = Envelope {
            iat: now_secs(),
            session: session.clone(),
        };
        let payload = serde_json::to_vec(&envelope)?;
        Ok(sign_payload(&self.secret, &payload))
    }

    /// Write the session into the response. A session whose cookie would be
    /// dropped by the browser is refused instead of sent.
    pub fn save(&self, session: &Session, headers: &mut HeaderMap) -> Result<(), SessionError> {
        let encoded = self.encode(session)?;
        let pair_len = self.cookie_name.len() + 1 + encoded.len();
        if pair_len > MAX_COOKIE_BYTES {
            return Err(SessionError::TooLarge(pair_len));
        }
        let cookie = self.make_set_cookie(&encoded);
        let value = HeaderValue::from_str(&cookie).map_err(|_| SessionError::Header)?;
        self.replace_set_cookie(headers, value);
        Ok(())
    }

    /// Instruct the client to drop the session cookie.
    pub fn clear(&self, headers: &mut HeaderMap) {
        match HeaderValue::from_str(&self.make_delete_cookie()) {
            Ok(value) => self.replace_set_cookie(headers, value),
            Err(_) => tracing::error!(cookie = %self.cookie_name, "Invalid session cookie attributes"),
        }
    }

    fn replace_set_cookie(&self, headers: &mut HeaderMap, value: HeaderValue) {
        let prefix = format!("{}=", self.cookie_name);
        let kept: Vec<HeaderValue> = headers
            .get_all(SET_COOKIE)
            .iter()
            .filter(|v| !v.to_str().is_ok_and(|s| s.starts_with(&prefix)))
            .cloned()
            .collect();
        headers.remove(SET_COOKIE);
        for v in kept {
            headers.append(SET_COOKIE, v);
        }
        headers.append(SET_COOKIE, value);
    }

    fn make_set_cookie(&self, value: &str) -> String {
        let mut parts = vec![
            format!("{}={}", self.cookie_name, value),
            format!("Max-Age={}", self.max_age.as_secs()),
            "Path=/".into(),
            "HttpOnly".into(),
            "SameSite=Lax".into(),
        ];
        self.push_scope(&mut parts);
        parts.join("; ")
    }

    fn make_delete_cookie(&self) -> String {
        let mut parts = vec![
            format!("{}=", self.cookie_name),
            "Max-Age=0".into(),
            "Expires=Thu, 01 Jan 1970 00:00:00 GMT".into(),
            "Path=/".into(),
            "HttpOnly".into(),
            "SameSite=Lax".into(),
        ];
        self.push_scope(&mut parts);
        parts.join("; ")
    }

    fn push_scope(&self, parts: &mut Vec<String>) {
        if self.https_only {
            parts.push("Secure".into());
        }
        if let Some(domain) = &self.cookie_domain {
            parts.push(format!("Domain={domain}"));
        }
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Parse a specific cookie from a Cookie header value.
fn parse_cookie<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    for part in header.split(';') {
        let trimmed = part.trim();
        if let Some(value) = trimmed.strip_prefix(name)
            && let Some(value) = value.strip_prefix('=')
        {
            return Some(value);
        }
    }
    None
}
