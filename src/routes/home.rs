//! GET /

use axum::Json;
use axum::response::{IntoResponse, Response};

use super::{DASHBOARD_PATH, found};
use crate::auth::current_user;
use crate::error::LOGIN_PATH;
use crate::session::middleware::SessionHandle;
use crate::types::SplashResponse;

/// Signed-in users go straight to the dashboard.
pub async fn home(session: SessionHandle) -> Response {
    if current_user(&session.snapshot().await).is_some() {
        return found(DASHBOARD_PATH);
    }
    Json(SplashResponse {
        name: "Throtle".into(),
        login_url: LOGIN_PATH.into(),
    })
    .into_response()
}
