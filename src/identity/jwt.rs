//! ID token verification and JWKS cache.
//!
//! Tokens returned by the token endpoint are verified for RS256 signature,
//! issuer, audience and expiry before any claim is trusted.

use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Claims read from a Cognito ID token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "cognito:username", default)]
    pub username: Option<String>,
    #[serde(rename = "custom:tier", default)]
    pub tier: Option<String>,
    #[serde(rename = "custom:company_id", default)]
    pub company_id: Option<String>,
    #[serde(rename = "cognito:groups", default)]
    pub cognito_groups: Vec<String>,
    pub exp: Option<u64>,
    pub token_use: Option<String>,
}

/// JWKS key entry from `/.well-known/jwks.json`.
#[derive(Debug, Clone, Deserialize)]
pub struct JwkKey {
    pub kid: String,
    pub kty: String,
    pub n: String,
    pub e: String,
    #[serde(default)]
    pub alg: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwksResponse {
    pub keys: Vec<JwkKey>,
}

struct CachedKeys {
    by_kid: HashMap<String, DecodingKey>,
    fetched: Instant,
}

/// The provider's signing keys, fetched lazily and kept for an hour.
///
/// An unknown `kid` forces a refetch so rotated keys are picked up before
/// the cache would otherwise expire, but at most once per `miss_cooldown`.
pub struct JwksCache {
    http_client: reqwest::Client,
    jwks_url: String,
    ttl: Duration,
    miss_cooldown: Duration,
    cached: RwLock<Option<CachedKeys>>,
}

impl JwksCache {
    pub fn new(http_client: reqwest::Client, jwks_url: impl Into<String>) -> Self {
        Self {
            http_client,
            jwks_url: jwks_url.into(),
            ttl: Duration::from_secs(3600),
            miss_cooldown: Duration::from_secs(30),
            cached: RwLock::new(None),
        }
    }

    pub fn with_miss_cooldown(mut self, miss_cooldown: Duration) -> Self {
        self.miss_cooldown = miss_cooldown;
        self
    }

    /// Decoding key for `kid`, refetching on a stale cache or on a miss once
    /// the cooldown since the last fetch has passed.
    pub async fn key_for(&self, kid: &str) -> Result<DecodingKey, JwtError> {
        {
            let cached = self.cached.read().await;
            if let Some(entry) = cached.as_ref()
                && entry.fetched.elapsed() < self.ttl
            {
                if let Some(key) = entry.by_kid.get(kid) {
                    return Ok(key.clone());
                }
                if entry.fetched.elapsed() < self.miss_cooldown {
                    tracing::debug!(kid, "Unknown kid within JWKS refetch cooldown");
                    return Err(JwtError::KeyNotFound(kid.to_string()));
                }
            }
        }

        let by_kid = self.fetch().await?;
        let key = by_kid.get(kid).cloned();
        *self.cached.write().await = Some(CachedKeys {
            by_kid,
            fetched: Instant::now(),
        });
        key.ok_or_else(|| JwtError::KeyNotFound(kid.to_string()))
    }

    async fn fetch(&self) -> Result<HashMap<String, DecodingKey>, JwtError> {
        let fetch_failed = |e: reqwest::Error| JwtError::JwksFetchFailed(e.to_string());
        let resp = self
            .http_client
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(fetch_failed)?;
        let status = resp.status();
        if !status.is_success() {
            return Err(JwtError::JwksFetchFailed(format!("HTTP {status}")));
        }
        let jwks: JwksResponse = resp.json().await.map_err(fetch_failed)?;

        let mut by_kid = HashMap::new();
        for key in jwks.keys.iter().filter(|k| k.kty == "RSA") {
            match DecodingKey::from_rsa_components(&key.n, &key.e) {
                Ok(decoding_key) => {
                    by_kid.insert(key.kid.clone(), decoding_key);
                }
                Err(e) => tracing::warn!(kid = %key.kid, error = %e, "Skipping unusable JWK"),
            }
        }
        tracing::debug!(keys = by_kid.len(), "Fetched JWKS");
        Ok(by_kid)
    }

    pub async fn clear(&self) {
        *self.cached.write().await = None;
    }
}

/// Who the ID token must have been issued by and for.
#[derive(Debug, Clone)]
pub struct TokenExpectations<'a> {
    pub issuer: &'a str,
    pub audience: &'a str,
}

/// Check signature (RS256), `iss`, `aud` and `exp`, then parse the claims.
///
/// Returns the typed claims plus the raw claim map.
pub async fn verify_id_token(
    token: &str,
    keys: &JwksCache,
    expected: &TokenExpectations<'_>,
) -> Result<(Claims, Map<String, Value>), JwtError> {
    let header = jsonwebtoken::decode_header(token).map_err(|_| JwtError::InvalidFormat)?;
    let kid = header.kid.ok_or(JwtError::MissingKid)?;
    let decoding_key = keys.key_for(&kid).await?;

    let mut validation = Validation::new(Algorithm::RS256);
    validation.set_issuer(&[expected.issuer]);
    validation.set_audience(&[expected.audience]);
    validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);

    let raw = decode::<Map<String, Value>>(token, &decoding_key, &validation)
        .map_err(|e| JwtError::Validation(e.to_string()))?
        .claims;
    let claims: Claims = serde_json::from_value(Value::Object(raw.clone()))
        .map_err(|e| JwtError::Validation(e.to_string()))?;

    if claims.token_use.as_deref().is_some_and(|u| u != "id") {
        return Err(JwtError::Validation("token_use is not id".into()));
    }

    Ok((claims, raw))
}

#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("Invalid JWT format")]
    InvalidFormat,

    #[error("Token missing kid header")]
    MissingKid,

    #[error("Signing key not found for kid: {0}")]
    KeyNotFound(String),

    #[error("JWKS fetch failed: {0}")]
    JwksFetchFailed(String),

    #[error("JWT validation failed: {0}")]
    Validation(String),
}
