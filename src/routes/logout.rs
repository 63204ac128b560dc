//! POST /auth/logout

use axum::extract::State;
use axum::response::Response;
use std::sync::Arc;

use super::found;
use crate::AppState;
use crate::audit::{self, Activity, Outcome, Severity};
use crate::session::middleware::SessionHandle;

/// End the session. The cookie is always cleared; the browser then goes to
/// the provider's logout endpoint when the session held an ID token.
pub async fn logout(State(state): State<Arc<AppState>>, session: SessionHandle) -> Response {
    let (email, logout_url) = {
        let mut data = session.lock().await;
        let email = data.email().to_string();
        (email, state.auth.logout(&mut data))
    };
    session.destroy().await;

    audit::authentication_event(
        Activity::Logoff,
        Outcome::Success,
        Severity::Informational,
        Some(&email),
        "User logged out",
    );

    found(logout_url.as_deref().unwrap_or("/"))
}
