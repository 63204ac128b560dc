//! Route guards.
//!
//! `require_authenticated` sends anonymous requests to the login entry point
//! and exposes [`AuthenticatedUser`] to the handler. `require_tier` gates a
//! route on a minimum subscription tier and must sit inside
//! `require_authenticated`.

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::audit;
use crate::auth::{Tier, current_user};
use crate::error::AuthError;
use crate::session::middleware::SessionHandle;
use crate::users::AuthenticatedUser;

/// 302 to `/auth/login` unless the session holds a complete identity.
pub async fn require_authenticated(mut req: Request, next: Next) -> Response {
    let Some(handle) = req.extensions().get::<SessionHandle>().cloned() else {
        tracing::error!("require_authenticated mounted without session middleware");
        return AuthError::Unauthenticated.into_response();
    };

    let session = handle.snapshot().await;
    match current_user(&session) {
        Some(user) => {
            req.extensions_mut().insert(user);
            next.run(req).await
        }
        None => {
            tracing::debug!(path = %req.uri().path(), "Unauthenticated request redirected to login");
            AuthError::Unauthenticated.into_response()
        }
    }
}

/// 403 unless the user's tier ranks at or above `minimum`.
pub async fn require_tier(minimum: Tier, req: Request, next: Next) -> Response {
    let Some(user) = req.extensions().get::<AuthenticatedUser>() else {
        return AuthError::Unauthenticated.into_response();
    };

    if minimum.is_satisfied_by(&user.tier) {
        return next.run(req).await;
    }

    audit::authorization_event(
        req.uri().path(),
        minimum.as_str(),
        Some(&user.tier),
        false,
        Some(&user.email),
    );
    tracing::warn!(
        user_id = %user.id,
        tier = %user.tier,
        required = %minimum,
        "Tier check denied"
    );
    AuthError::InsufficientTier.into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Session;
    use crate::session::middleware::session_middleware;
    use crate::session::store::CookieSessionStore;
    use axum::Router;
    use axum::body::Body;
    use axum::http::header::{COOKIE, LOCATION};
    use axum::http::{Request as HttpRequest, StatusCode};
    use axum::middleware::from_fn;
    use axum::routing::get;
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    fn store() -> Arc<CookieSessionStore> {
        Arc::new(CookieSessionStore::new(
            b"guard-secret".as_slice(),
            "throtle_session",
            Duration::from_secs(600),
            false,
            None,
        ))
    }

    fn app(store: Arc<CookieSessionStore>) -> Router {
        let premium = Router::new()
            .route("/premium", get(|| async { "premium content" }))
            .route_layer(from_fn(|req, next| require_tier(Tier::Premium, req, next)));

        Router::new()
            .route(
                "/whoami",
                get(|user: AuthenticatedUser| async move { user.email }),
            )
            .merge(premium)
            .route_layer(from_fn(require_authenticated))
            .layer(from_fn(move |req, next| {
                let store = store.clone();
                session_middleware(store, req, next)
            }))
    }

    fn cookie_for(store: &CookieSessionStore, tier: &str) -> String {
        let session = Session {
            authenticated: true,
            user_id: "u-1".into(),
            email: "user@example.com".into(),
            display_name: "User".into(),
            tier: tier.into(),
            ..Session::default()
        };
        format!("throtle_session={}", store.encode(&session).unwrap())
    }

    fn request(uri: &str, cookie: Option<&str>) -> HttpRequest<Body> {
        let mut builder = HttpRequest::builder().uri(uri);
        if let Some(c) = cookie {
            builder = builder.header(COOKIE, c);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_anonymous_is_redirected_to_login() {
        let resp = app(store()).oneshot(request("/whoami", None)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(resp.headers()[LOCATION], "/auth/login");
    }

    #[tokio::test]
    async fn test_authenticated_user_reaches_handler() {
        let store = store();
        let cookie = cookie_for(&store, "basic");
        let resp = app(store)
            .oneshot(request("/whoami", Some(&cookie)))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"user@example.com");
    }

    #[tokio::test]
    async fn test_low_tier_is_forbidden() {
        let store = store();
        let cookie = cookie_for(&store, "basic");
        let resp = app(store)
            .oneshot(request("/premium", Some(&cookie)))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_higher_tier_passes() {
        let store = store();
        let cookie = cookie_for(&store, "enterprise");
        let resp = app(store)
            .oneshot(request("/premium", Some(&cookie)))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unknown_tier_is_forbidden() {
        let store = store();
        let cookie = cookie_for(&store, "gold");
        let resp = app(store)
            .oneshot(request("/premium", Some(&cookie)))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_anonymous_on_tiered_route_is_redirected() {
        let resp = app(store()).oneshot(request("/premium", None)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::FOUND);
    }
}
