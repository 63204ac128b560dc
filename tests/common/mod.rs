//! Test utilities: RSA keypair, ID token factory, wiremock provider, app builder.

#![allow(dead_code)]

use axum::Router;
use axum::body::Body;
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{Request, Response};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rsa::RsaPrivateKey;
use rsa::pkcs1::{EncodeRsaPrivateKey, LineEnding};
use rsa::traits::PublicKeyParts;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tempfile::TempDir;
use throtle_console::config::Config;
use throtle_console::identity::cognito::{CognitoProvider, ProviderEndpoints};
use throtle_console::session::Session;
use throtle_console::storage::{LocalStorage, StorageBackend};
use throtle_console::users::{InMemoryUserRepository, UserRecord};
use throtle_console::{AppState, create_app};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const CLIENT_ID: &str = "test-client-id";

/// Test RSA keypair for signing ID tokens.
pub struct TestKeys {
    pub private_key: RsaPrivateKey,
    pub kid: String,
}

impl TestKeys {
    pub fn generate() -> Self {
        let mut rng = rsa::rand_core::OsRng;
        let private_key = RsaPrivateKey::new(&mut rng, 2048).expect("failed to generate key");
        Self {
            private_key,
            kid: "test-key-1".into(),
        }
    }

    /// RS256-sign the given claims.
    pub fn sign_jwt(&self, claims: &Value) -> String {
        let pem = self
            .private_key
            .to_pkcs1_pem(LineEnding::LF)
            .expect("failed to encode private key");
        let encoding_key =
            jsonwebtoken::EncodingKey::from_rsa_pem(pem.as_bytes()).expect("invalid PEM");

        let mut header = jsonwebtoken::Header::new(jsonwebtoken::Algorithm::RS256);
        header.kid = Some(self.kid.clone());

        jsonwebtoken::encode(&header, claims, &encoding_key).expect("failed to sign JWT")
    }

    pub fn jwks_json(&self) -> Value {
        let public_key = self.private_key.to_public_key();
        json!({
            "keys": [{
                "kid": self.kid,
                "kty": "RSA",
                "alg": "RS256",
                "use": "sig",
                "n": URL_SAFE_NO_PAD.encode(public_key.n().to_bytes_be()),
                "e": URL_SAFE_NO_PAD.encode(public_key.e().to_bytes_be())
            }]
        })
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs()
}

/// Valid ID token claims for the mock provider at `issuer`.
pub fn id_token_claims(issuer: &str, tier: Option<&str>) -> Value {
    let mut claims = json!({
        "sub": "user-123",
        "email": "test@example.com",
        "name": "Test User",
        "cognito:username": "testuser",
        "custom:company_id": "acme",
        "iss": issuer,
        "aud": CLIENT_ID,
        "token_use": "id",
        "iat": now_secs(),
        "exp": now_secs() + 3600
    });
    if let Some(tier) = tier {
        claims["custom:tier"] = json!(tier);
    }
    claims
}

/// A running mock identity provider plus the key that signs its tokens.
pub struct MockProvider {
    pub server: MockServer,
    pub keys: TestKeys,
}

impl MockProvider {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
            keys: TestKeys::generate(),
        }
    }

    pub fn uri(&self) -> String {
        self.server.uri()
    }

    pub fn endpoints(&self) -> ProviderEndpoints {
        let base = self.uri();
        ProviderEndpoints {
            issuer: base.clone(),
            authorize_url: format!("{base}/oauth2/authorize"),
            token_url: format!("{base}/oauth2/token"),
            jwks_url: format!("{base}/.well-known/jwks.json"),
            logout_url: format!("{base}/logout"),
        }
    }

    /// Serve the JWKS and a token response carrying `claims` signed by our key.
    pub async fn mount_successful_exchange(&self, claims: &Value) {
        Mock::given(method("GET"))
            .and(path("/.well-known/jwks.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(self.keys.jwks_json()))
            .mount(&self.server)
            .await;

        Mock::given(method("POST"))
            .and(path("/oauth2/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "access-token-1",
                "id_token": self.keys.sign_jwt(claims),
                "refresh_token": "refresh-token-1",
                "expires_in": 3600,
                "token_type": "Bearer"
            })))
            .mount(&self.server)
            .await;
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
    pub upload_dir: TempDir,
}

pub fn build_test_app(provider: &MockProvider) -> TestApp {
    build_test_app_with_users(provider, InMemoryUserRepository::new())
}

pub fn build_test_app_with_users(
    provider: &MockProvider,
    users: InMemoryUserRepository,
) -> TestApp {
    let upload_dir = tempfile::tempdir().expect("tempdir");
    let mut config = Config::test_default();
    config.upload_dir = upload_dir.path().display().to_string();

    let cognito = CognitoProvider::new(
        config.http_client().expect("http client"),
        provider.endpoints(),
        CLIENT_ID,
        "",
        config.redirect_uri(),
    );
    let storage = StorageBackend::Local(LocalStorage::new(upload_dir.path()));
    let state = Arc::new(
        AppState::new(config, cognito, Arc::new(users), storage).expect("app state"),
    );

    TestApp {
        router: create_app(state.clone()),
        state,
        upload_dir,
    }
}

pub fn user_record(id: &str, email: &str, tier: &str, company: &str) -> UserRecord {
    UserRecord {
        id: id.into(),
        email: email.into(),
        display_name: "Stored User".into(),
        tier: tier.into(),
        company_id: company.into(),
    }
}

/// `name=value` from the response's session Set-Cookie, if any.
pub fn session_cookie<B>(resp: &Response<B>) -> Option<String> {
    resp.headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with("throtle_session="))
        .and_then(|v| v.split(';').next())
        .map(str::to_string)
}

pub fn set_cookie_header<B>(resp: &Response<B>) -> Option<String> {
    resp.headers()
        .get(SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

pub fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    request("GET", uri, cookie, Body::empty())
}

pub fn request(method: &str, uri: &str, cookie: Option<&str>, body: Body) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(c) = cookie {
        builder = builder.header(COOKIE, c);
    }
    builder.body(body).unwrap()
}

pub fn form_post(uri: &str, cookie: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(COOKIE, cookie)
        .header("content-type", "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Encode a signed-in session cookie directly, skipping the login flow.
pub fn signed_in_cookie(state: &AppState, tier: &str, company: &str) -> String {
    let session: Session = serde_json::from_value(json!({
        "authenticated": true,
        "user_id": "user-123",
        "email": "test@example.com",
        "display_name": "Test User",
        "tier": tier,
        "company_id": company,
        "id_token": "id-token-1"
    }))
    .unwrap();
    format!(
        "throtle_session={}",
        state.session_store.encode(&session).unwrap()
    )
}

pub async fn body_json(resp: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
