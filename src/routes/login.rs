//! GET /auth/login

use axum::extract::State;
use axum::response::Response;
use std::sync::Arc;

use super::found;
use crate::AppState;
use crate::session::middleware::SessionHandle;

/// Start the authorization-code flow and send the browser to the provider.
pub async fn login(State(state): State<Arc<AppState>>, session: SessionHandle) -> Response {
    let authorization_url = {
        let mut data = session.lock().await;
        state.auth.start_login(&mut data)
    };
    tracing::debug!("Redirecting to identity provider");
    found(&authorization_url)
}
