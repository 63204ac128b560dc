//! GET /auth/callback

use axum::extract::{Query, State};
use axum::response::Response;
use serde::Deserialize;
use std::sync::Arc;

use super::{DASHBOARD_PATH, found};
use crate::AppState;
use crate::audit::{self, Activity, Outcome, Severity};
use crate::error::{AppError, AuthError};
use crate::session::middleware::SessionHandle;

const AUTH_FAILED: &str = "Authentication failed";

/// Query parameters from the provider redirect.
#[derive(Debug, Default, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// Complete the login and land on the dashboard. Every failure leaves the
/// session anonymous and answers with the same generic body.
pub async fn oauth_callback(
    State(state): State<Arc<AppState>>,
    session: SessionHandle,
    Query(params): Query<CallbackParams>,
) -> Result<Response, AppError> {
    let mut data = session.lock().await;

    if let Some(ref error) = params.error {
        tracing::warn!(
            error = %error,
            description = params.error_description.as_deref().unwrap_or(""),
            "Identity provider returned an error"
        );
        audit::authentication_event(
            Activity::AuthTicket,
            Outcome::Failure,
            Severity::High,
            None,
            &format!("OAuth error: {error}"),
        );
        state.auth.abandon_login(&mut data);
        return Err(AppError::BadRequest(AUTH_FAILED.into()));
    }

    let Some(code) = params.code.as_deref().filter(|c| !c.is_empty()) else {
        tracing::warn!("Callback without authorization code");
        state.auth.abandon_login(&mut data);
        return Err(AppError::BadRequest(AUTH_FAILED.into()));
    };
    let returned_state = params.state.as_deref().unwrap_or_default();

    match state.auth.complete_login(&mut data, code, returned_state).await {
        Ok(user) => {
            audit::authentication_event(
                Activity::Logon,
                Outcome::Success,
                Severity::Informational,
                Some(&user.email),
                "User logged in via OAuth callback",
            );
            Ok(found(DASHBOARD_PATH))
        }
        Err(e) => {
            let severity = match e {
                AuthError::StateMismatch => Severity::High,
                _ => Severity::Medium,
            };
            tracing::warn!(error = %e, "OAuth callback failed");
            audit::authentication_event(
                Activity::AuthTicket,
                Outcome::Failure,
                severity,
                None,
                &format!("OAuth callback failed: {e}"),
            );
            Err(e.into())
        }
    }
}
