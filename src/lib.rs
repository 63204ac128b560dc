//! Throtle console: the authenticated back office for Throtle customers.
//!
//! Users sign in through the hosted OIDC provider; the whole session lives
//! in one signed cookie. Routes behind the guards serve the dashboard, file
//! uploads and tier-gated ad destinations.

pub mod audit;
pub mod auth;
pub mod config;
pub mod destinations;
pub mod error;
pub mod identity;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod session;
pub mod storage;
pub mod types;
pub mod users;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::{get, post};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::auth::{SessionManager, Tier};
use crate::config::Config;
use crate::destinations::DestinationRepository;
use crate::identity::cognito::CognitoProvider;
use crate::metrics::{Metrics, track_requests};
use crate::middleware::{audit_requests, require_authenticated, require_tier};
use crate::session::middleware::session_middleware;
use crate::session::store::CookieSessionStore;
use crate::storage::StorageBackend;
use crate::users::UserRepository;

/// Room for multipart boundaries and part headers on top of the file itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Shared application state available to all route handlers.
pub struct AppState {
    pub config: Config,
    pub auth: SessionManager<CognitoProvider>,
    pub storage: StorageBackend,
    pub destinations: DestinationRepository,
    pub session_store: Arc<CookieSessionStore>,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(
        config: Config,
        provider: CognitoProvider,
        users: Arc<dyn UserRepository>,
        storage: StorageBackend,
    ) -> Result<Self, prometheus::Error> {
        let auth = SessionManager::new(
            provider,
            users,
            config.default_tier.clone(),
            config.post_logout_redirect(),
        );
        let session_store = Arc::new(CookieSessionStore::from_config(&config));
        Ok(Self {
            config,
            auth,
            storage,
            destinations: DestinationRepository::new(),
            session_store,
            metrics: Metrics::new()?,
        })
    }
}

/// Build the Axum router with all middleware and routes.
pub fn create_app(state: Arc<AppState>) -> Router {
    let store = state.session_store.clone();
    let body_limit = state.config.max_upload_bytes + MULTIPART_OVERHEAD;

    // Innermost: tier check runs after authentication has placed the user.
    let premium_routes = Router::new()
        .route("/destinations", get(routes::destinations::list))
        .route(
            "/destinations/meta/validate",
            post(routes::destinations::validate_meta),
        )
        .route("/destinations/meta", post(routes::destinations::create_meta))
        .route_layer(from_fn(|req, next| require_tier(Tier::Premium, req, next)));

    let protected_routes = Router::new()
        .route("/dashboard", get(routes::dashboard::dashboard))
        .route("/uploads", post(routes::upload::upload))
        .route(
            "/files/{*key}",
            get(routes::upload::download).delete(routes::upload::delete),
        )
        .route("/presign/{*key}", get(routes::upload::presigned_url))
        .merge(premium_routes)
        .route_layer(from_fn(audit_requests))
        .route_layer(from_fn(require_authenticated));

    Router::new()
        .route("/", get(routes::home::home))
        .route("/health", get(routes::health::health))
        .route("/metrics", get(metrics::metrics))
        .route("/auth/login", get(routes::login::login))
        .route("/auth/callback", get(routes::callback::oauth_callback))
        .route("/auth/logout", post(routes::logout::logout))
        .route("/auth/me", get(routes::me::me))
        .merge(protected_routes)
        .layer(from_fn_with_state(state.clone(), track_requests))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(from_fn(move |req, next| {
            let store = store.clone();
            session_middleware(store, req, next)
        }))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
