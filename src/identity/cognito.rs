//! Amazon Cognito hosted-UI provider: authorization URL, code exchange,
//! ID token verification and federated logout.

use serde::Deserialize;

use super::jwt::{Claims, JwksCache, TokenExpectations, verify_id_token};
use super::{IdentityProvider, LoginRequest, OAuthExchangeResult, SCOPES, generate_state, states_match};
use crate::config::Config;
use crate::error::AuthError;
use crate::users::AuthenticatedUser;

/// Provider endpoints. Derived from configuration in production and pointed
/// at a mock server in tests.
#[derive(Debug, Clone)]
pub struct ProviderEndpoints {
    pub issuer: String,
    pub authorize_url: String,
    pub token_url: String,
    pub jwks_url: String,
    pub logout_url: String,
}

impl ProviderEndpoints {
    pub fn cognito(config: &Config) -> Self {
        Self {
            issuer: config.cognito_issuer(),
            authorize_url: config.cognito_authorize_url(),
            token_url: config.cognito_token_url(),
            jwks_url: config.jwks_url(),
            logout_url: config.cognito_logout_url(),
        }
    }
}

/// Token endpoint response.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub id_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    #[error("Token endpoint returned {status}: {body}")]
    TokenEndpoint { status: u16, body: String },

    #[error("No id_token in token response")]
    MissingIdToken,
}

pub struct CognitoProvider {
    http_client: reqwest::Client,
    endpoints: ProviderEndpoints,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    jwks_cache: JwksCache,
}

impl CognitoProvider {
    pub fn new(
        http_client: reqwest::Client,
        endpoints: ProviderEndpoints,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            jwks_cache: JwksCache::new(http_client.clone(), endpoints.jwks_url.clone()),
            http_client,
            endpoints,
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_uri: redirect_uri.into(),
        }
    }

    pub fn from_config(config: &Config, http_client: reqwest::Client) -> Self {
        Self::new(
            http_client,
            ProviderEndpoints::cognito(config),
            config.cognito_client_id.clone(),
            config.cognito_client_secret.clone(),
            config.redirect_uri(),
        )
    }

    pub fn endpoints(&self) -> &ProviderEndpoints {
        &self.endpoints
    }

    /// Authorization-code URL for the given state.
    pub fn authorization_url(&self, state: &str) -> String {
        format!(
            "{}?response_type=code&client_id={}&redirect_uri={}&scope={}&state={}",
            self.endpoints.authorize_url,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.redirect_uri),
            urlencoding::encode(&SCOPES.join(" ")),
            urlencoding::encode(state),
        )
    }

    /// Exchange an OAuth authorization code for tokens.
    ///
    /// POST to the token endpoint with grant_type=authorization_code.
    pub async fn exchange_code_for_tokens(&self, code: &str) -> Result<TokenResponse, ProviderError> {
        let mut params = vec![
            ("grant_type", "authorization_code"),
            ("client_id", self.client_id.as_str()),
            ("code", code),
            ("redirect_uri", self.redirect_uri.as_str()),
        ];

        if !self.client_secret.is_empty() {
            params.push(("client_secret", self.client_secret.as_str()));
        }

        let resp = self
            .http_client
            .post(&self.endpoints.token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ProviderError::TokenEndpoint {
                status: status.as_u16(),
                body,
            });
        }

        resp.json()
            .await
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))
    }
}

fn user_from_claims(claims: &Claims) -> AuthenticatedUser {
    let email = claims.email.clone().unwrap_or_default();
    let display_name = claims
        .name
        .clone()
        .or_else(|| claims.username.clone())
        .unwrap_or_else(|| email.clone());
    AuthenticatedUser {
        id: claims.sub.clone(),
        email,
        display_name,
        tier: claims.tier.clone().unwrap_or_default(),
        company_id: claims.company_id.clone().unwrap_or_default(),
    }
}

impl IdentityProvider for CognitoProvider {
    fn begin_login(&self) -> LoginRequest {
        let state = generate_state();
        LoginRequest {
            authorization_url: self.authorization_url(&state),
            state,
        }
    }

    async fn complete_login(
        &self,
        code: &str,
        returned_state: &str,
        expected_state: &str,
    ) -> Result<OAuthExchangeResult, AuthError> {
        if !states_match(returned_state, expected_state) {
            return Err(AuthError::StateMismatch);
        }

        let tokens = self
            .exchange_code_for_tokens(code)
            .await
            .map_err(|e| AuthError::TokenExchangeFailed(e.to_string()))?;
        let id_token = tokens
            .id_token
            .ok_or_else(|| AuthError::TokenExchangeFailed(ProviderError::MissingIdToken.to_string()))?;

        let expected = TokenExpectations {
            issuer: &self.endpoints.issuer,
            audience: &self.client_id,
        };
        let (claims, raw) = verify_id_token(&id_token, &self.jwks_cache, &expected)
            .await
            .map_err(|e| AuthError::TokenVerificationFailed(e.to_string()))?;

        Ok(OAuthExchangeResult {
            access_token: tokens.access_token,
            user: user_from_claims(&claims),
            id_token,
            claims: raw,
        })
    }

    fn logout_url(&self, post_logout_redirect: &str) -> String {
        format!(
            "{}?client_id={}&logout_uri={}",
            self.endpoints.logout_url,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(post_logout_redirect),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider_for(server_uri: &str) -> CognitoProvider {
        provider_with_client(server_uri, reqwest::Client::new())
    }

    fn provider_with_client(server_uri: &str, http_client: reqwest::Client) -> CognitoProvider {
        CognitoProvider::new(
            http_client,
            ProviderEndpoints {
                issuer: server_uri.to_string(),
                authorize_url: format!("{server_uri}/oauth2/authorize"),
                token_url: format!("{server_uri}/oauth2/token"),
                jwks_url: format!("{server_uri}/.well-known/jwks.json"),
                logout_url: format!("{server_uri}/logout"),
            },
            "test-client-id",
            "",
            "http://localhost:8080/auth/callback",
        )
    }

    #[test]
    fn test_authorization_url_contents() {
        let provider = provider_for("https://idp.example.com");
        let login = provider.begin_login();
        assert!(login.authorization_url.starts_with("https://idp.example.com/oauth2/authorize?"));
        assert!(login.authorization_url.contains("response_type=code"));
        assert!(login.authorization_url.contains("client_id=test-client-id"));
        assert!(login.authorization_url.contains("scope=openid%20email%20phone"));
        assert!(login
            .authorization_url
            .contains("redirect_uri=http%3A%2F%2Flocalhost%3A8080%2Fauth%2Fcallback"));
        assert!(login.authorization_url.ends_with(&format!("state={}", login.state)));
    }

    #[test]
    fn test_each_login_has_fresh_state() {
        let provider = provider_for("https://idp.example.com");
        assert_ne!(provider.begin_login().state, provider.begin_login().state);
    }

    #[test]
    fn test_logout_url() {
        let provider = provider_for("https://idp.example.com");
        assert_eq!(
            provider.logout_url("http://localhost:8080/"),
            "https://idp.example.com/logout?client_id=test-client-id&logout_uri=http%3A%2F%2Flocalhost%3A8080%2F"
        );
    }

    #[test]
    fn test_user_from_claims_display_name_fallback() {
        let claims: Claims = serde_json::from_value(serde_json::json!({
            "sub": "u-1",
            "email": "a@example.com"
        }))
        .unwrap();
        let user = user_from_claims(&claims);
        assert_eq!(user.display_name, "a@example.com");
        assert!(user.tier.is_empty());
    }

    #[tokio::test]
    async fn test_state_mismatch_makes_no_network_call() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let provider = provider_for(&server.uri());
        let err = provider
            .complete_login("code-1", "forged", "expected")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::StateMismatch));
        server.verify().await;
    }

    #[tokio::test]
    async fn test_exchange_code_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth2/token"))
            .and(body_string_contains("grant_type=authorization_code"))
            .and(body_string_contains("code=auth-code-123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "at-new",
                "id_token": "it-new",
                "refresh_token": "rt-new",
                "expires_in": 3600,
                "token_type": "Bearer"
            })))
            .mount(&server)
            .await;

        let tokens = provider_for(&server.uri())
            .exchange_code_for_tokens("auth-code-123")
            .await
            .unwrap();
        assert_eq!(tokens.access_token, "at-new");
        assert_eq!(tokens.id_token.as_deref(), Some("it-new"));
    }

    #[tokio::test]
    async fn test_token_endpoint_error_is_exchange_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth2/token"))
            .respond_with(
                ResponseTemplate::new(400).set_body_json(serde_json::json!({"error": "invalid_grant"})),
            )
            .mount(&server)
            .await;

        let err = provider_for(&server.uri())
            .complete_login("bad-code", "s", "s")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::TokenExchangeFailed(ref m) if m.contains("invalid_grant")));
    }

    #[tokio::test]
    async fn test_missing_id_token_is_exchange_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth2/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "at-only"
            })))
            .mount(&server)
            .await;

        let err = provider_for(&server.uri())
            .complete_login("code", "s", "s")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::TokenExchangeFailed(_)));
    }

    #[tokio::test]
    async fn test_unsigned_id_token_fails_verification() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth2/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "at",
                "id_token": "not.a.jwt"
            })))
            .mount(&server)
            .await;

        let err = provider_for(&server.uri())
            .complete_login("code", "s", "s")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::TokenVerificationFailed(_)));
    }

    #[tokio::test]
    async fn test_slow_token_endpoint_times_out_as_exchange_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth2/token"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"access_token": "at", "id_token": "it"}))
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let mut config = Config::test_default();
        config.http_timeout_secs = 1;
        let provider = provider_with_client(&server.uri(), config.http_client().unwrap());

        let started = std::time::Instant::now();
        let err = provider
            .complete_login("code", "s", "s")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::TokenExchangeFailed(_)));
        assert!(started.elapsed() < Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_slow_jwks_endpoint_times_out_as_verification_failure() {
        use base64::Engine;
        use base64::engine::general_purpose::URL_SAFE_NO_PAD;

        let id_token = format!(
            "{}.{}.c2ln",
            URL_SAFE_NO_PAD.encode(r#"{"alg":"RS256","typ":"JWT","kid":"k-1"}"#),
            URL_SAFE_NO_PAD.encode(r#"{"sub":"u-1"}"#),
        );
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth2/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "at",
                "id_token": id_token
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/.well-known/jwks.json"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"keys": []}))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_millis(200))
            .build()
            .unwrap();
        let err = provider_with_client(&server.uri(), http_client)
            .complete_login("code", "s", "s")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::TokenVerificationFailed(ref m) if m.contains("JWKS")));
    }
}
