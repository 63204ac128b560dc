//! GET /auth/me

use axum::Json;

use crate::auth::current_user;
use crate::error::AppError;
use crate::session::middleware::SessionHandle;
use crate::users::AuthenticatedUser;

/// The signed-in user, or 401 for API callers.
pub async fn me(session: SessionHandle) -> Result<Json<AuthenticatedUser>, AppError> {
    current_user(&session.snapshot().await)
        .map(Json)
        .ok_or(AppError::NotAuthenticated)
}
