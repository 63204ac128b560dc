//! Application configuration via environment variables.
//!
//! Everything the session store and the identity provider need (secrets,
//! cookie name, lifetime, endpoints) is read once here and injected at
//! construction time.

use std::env;
use std::time::Duration;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub cognito_client_id: String,
    pub cognito_client_secret: String,
    pub cognito_user_pool_id: String,
    pub cognito_domain: String,
    pub cognito_region: String,
    pub base_url: String,
    pub port: u16,
    pub environment: String,
    pub version: String,
    pub session_secret: String,
    pub session_cookie_name: String,
    pub session_max_age_secs: u64,
    pub session_https_only: bool,
    pub cookie_domain: Option<String>,
    pub http_timeout_secs: u64,
    pub default_tier: String,
    pub storage_backend: String,
    pub upload_dir: String,
    pub s3_bucket: String,
    pub max_upload_bytes: usize,
    /// JSON file of `UserRecord`s seeding the in-process user directory.
    pub users_file: Option<String>,
}

pub const DEFAULT_SESSION_SECRET: &str = "change-me-in-production";

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Required: `COGNITO_CLIENT_ID`, `COGNITO_USER_POOL_ID`, `COGNITO_DOMAIN`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_source(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_source<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());
        let required = |key: &str| get(key).ok_or_else(|| ConfigError::MissingEnv(key.into()));

        let base_url = get("BASE_URL").unwrap_or_else(|| "http://localhost:8080".into());
        let session_https_only = match get("SESSION_HTTPS_ONLY") {
            Some(v) => parse_bool("SESSION_HTTPS_ONLY", &v)?,
            None => base_url.starts_with("https://"),
        };

        Ok(Self {
            cognito_client_id: required("COGNITO_CLIENT_ID")?,
            cognito_client_secret: get("COGNITO_CLIENT_SECRET").unwrap_or_default(),
            cognito_user_pool_id: required("COGNITO_USER_POOL_ID")?,
            cognito_domain: required("COGNITO_DOMAIN")?,
            cognito_region: get("COGNITO_REGION").unwrap_or_else(|| "us-east-1".into()),
            base_url: base_url.trim_end_matches('/').to_string(),
            port: parse_or("PORT", get("PORT"), 8080)?,
            environment: get("ENVIRONMENT").unwrap_or_else(|| "development".into()),
            version: get("VERSION").unwrap_or_else(|| env!("CARGO_PKG_VERSION").into()),
            session_secret: get("SESSION_SECRET").unwrap_or_else(|| DEFAULT_SESSION_SECRET.into()),
            session_cookie_name: get("SESSION_COOKIE_NAME")
                .unwrap_or_else(|| "throtle_session".into()),
            session_max_age_secs: parse_or("SESSION_MAX_AGE_SECS", get("SESSION_MAX_AGE_SECS"), 24 * 3600)?,
            session_https_only,
            cookie_domain: get("COOKIE_DOMAIN"),
            http_timeout_secs: parse_or("HTTP_TIMEOUT_SECS", get("HTTP_TIMEOUT_SECS"), 10)?,
            default_tier: get("DEFAULT_TIER").unwrap_or_else(|| "basic".into()),
            storage_backend: get("STORAGE_BACKEND").unwrap_or_else(|| "local".into()),
            upload_dir: get("UPLOAD_DIR").unwrap_or_else(|| "./uploads".into()),
            s3_bucket: get("S3_BUCKET").unwrap_or_default(),
            max_upload_bytes: parse_or("MAX_UPLOAD_BYTES", get("MAX_UPLOAD_BYTES"), 10 * 1024 * 1024)?,
            users_file: get("USERS_FILE"),
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Cognito OIDC issuer URL.
    pub fn cognito_issuer(&self) -> String {
        format!(
            "https://cognito-idp.{}.amazonaws.com/{}",
            self.cognito_region, self.cognito_user_pool_id
        )
    }

    /// JWKS endpoint URL.
    pub fn jwks_url(&self) -> String {
        format!("{}/.well-known/jwks.json", self.cognito_issuer())
    }

    /// Hosted UI authorization endpoint.
    pub fn cognito_authorize_url(&self) -> String {
        format!("https://{}/oauth2/authorize", self.cognito_domain)
    }

    /// Cognito OAuth2 token endpoint.
    pub fn cognito_token_url(&self) -> String {
        format!("https://{}/oauth2/token", self.cognito_domain)
    }

    /// Hosted UI logout endpoint.
    pub fn cognito_logout_url(&self) -> String {
        format!("https://{}/logout", self.cognito_domain)
    }

    /// OAuth redirect URI registered with the app client.
    pub fn redirect_uri(&self) -> String {
        format!("{}/auth/callback", self.base_url)
    }

    /// Where the provider sends the browser after federated logout.
    pub fn post_logout_redirect(&self) -> String {
        format!("{}/", self.base_url)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// Outbound HTTP client with the provider timeout applied.
    pub fn http_client(&self) -> Result<reqwest::Client, reqwest::Error> {
        reqwest::Client::builder()
            .timeout(self.http_timeout())
            .connect_timeout(self.http_timeout())
            .build()
    }
}

/// Configuration for tests; every field can be set directly.
impl Config {
    pub fn test_default() -> Self {
        Self {
            cognito_client_id: "test-client-id".into(),
            cognito_client_secret: String::new(),
            cognito_user_pool_id: "us-east-1_test123".into(),
            cognito_domain: "test.auth.us-east-1.amazoncognito.com".into(),
            cognito_region: "us-east-1".into(),
            base_url: "http://localhost:8080".into(),
            port: 8080,
            environment: "test".into(),
            version: "0.0.0-test".into(),
            session_secret: "test-secret-key".into(),
            session_cookie_name: "throtle_session".into(),
            session_max_age_secs: 3600,
            session_https_only: false,
            cookie_domain: None,
            http_timeout_secs: 10,
            default_tier: "basic".into(),
            storage_backend: "local".into(),
            upload_dir: "./uploads".into(),
            s3_bucket: String::new(),
            max_upload_bytes: 1024 * 1024,
            users_file: None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnv(String),

    #[error("invalid value for {0}: {1}")]
    Invalid(String, String),
}

fn parse_or<T: std::str::FromStr>(key: &str, raw: Option<String>, default: T) -> Result<T, ConfigError> {
    match raw {
        Some(v) => v.parse().map_err(|_| ConfigError::Invalid(key.into(), v)),
        None => Ok(default),
    }
}

fn parse_bool(key: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw {
        "true" | "1" | "True" => Ok(true),
        "false" | "0" | "False" => Ok(false),
        other => Err(ConfigError::Invalid(key.into(), other.into())),
    }
}
