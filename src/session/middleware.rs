//! Axum session middleware layer.
//!
//! Decodes the session cookie, makes the session available via request
//! extensions, and performs the single store write for the request after the
//! handler returns:
//! - destroyed, or left empty after a change → `clear`
//! - changed → `save`
//! - cookie present but undecodable and nothing changed → `clear`
//! - otherwise no `Set-Cookie` at all

use axum::extract::{FromRequestParts, Request};
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};

use super::Session;
use super::store::CookieSessionStore;
use crate::error::AppError;

/// Shared handle to session state, inserted into request extensions.
#[derive(Clone)]
pub struct SessionHandle {
    data: Arc<Mutex<Session>>,
    destroyed: Arc<Mutex<bool>>,
}

/// Extract SessionHandle from request extensions (put there by session middleware).
impl<S> FromRequestParts<S> for SessionHandle
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<SessionHandle>()
            .cloned()
            .ok_or(AppError::Internal(
                "Session middleware not configured".into(),
            ))
    }
}

impl SessionHandle {
    pub fn new(session: Session) -> Self {
        Self {
            data: Arc::new(Mutex::new(session)),
            destroyed: Arc::new(Mutex::new(false)),
        }
    }

    /// Exclusive access to the session for the lifecycle manager.
    pub async fn lock(&self) -> MutexGuard<'_, Session> {
        self.data.lock().await
    }

    pub async fn snapshot(&self) -> Session {
        self.data.lock().await.clone()
    }

    /// Mark the session for deletion; the middleware clears the cookie.
    pub async fn destroy(&self) {
        self.data.lock().await.reset();
        *self.destroyed.lock().await = true;
    }

    pub async fn is_destroyed(&self) -> bool {
        *self.destroyed.lock().await
    }
}

/// Axum middleware function for session handling.
pub async fn session_middleware(
    store: Arc<CookieSessionStore>,
    mut req: Request,
    next: Next,
) -> Response {
    let (initial, invalid_cookie) = match store.inspect(req.headers()) {
        Some(Ok(session)) => (session, false),
        Some(Err(e)) => {
            tracing::debug!(error = %e, "Discarding unusable session cookie");
            (Session::default(), true)
        }
        None => (Session::default(), false),
    };

    let handle = SessionHandle::new(initial.clone());
    req.extensions_mut().insert(handle.clone());

    let mut response = next.run(req).await;

    let destroyed = handle.is_destroyed().await;
    let current = handle.snapshot().await;
    let changed = current != initial;

    if destroyed || (changed && current.is_empty()) || (invalid_cookie && !changed) {
        store.clear(response.headers_mut());
    } else if changed
        && let Err(e) = store.save(&current, response.headers_mut())
    {
        return AppError::Internal(format!("session save failed: {e}")).into_response();
    }

    response
}
