//! Application error types with Axum response mapping.
//!
//! `AuthError` is the authentication taxonomy shared by the identity adapter,
//! the session lifecycle manager and the guards. `AppError` is what handlers
//! return; every variant maps to a fixed status and JSON body so provider
//! error text never reaches the client.

use axum::http::StatusCode;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::destinations::ValidationErrors;
use crate::storage::StorageError;

/// Path of the login entry point that unauthenticated requests are sent to.
pub const LOGIN_PATH: &str = "/auth/login";

const AUTH_FAILED: &str = "Authentication failed";

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("OAuth state mismatch")]
    StateMismatch,

    #[error("No login in progress")]
    NoPendingLogin,

    #[error("Token exchange failed: {0}")]
    TokenExchangeFailed(String),

    #[error("Token verification failed: {0}")]
    TokenVerificationFailed(String),

    #[error("Session cookie could not be decoded")]
    SessionDecodeFailed,

    #[error("Not authenticated")]
    Unauthenticated,

    #[error("Insufficient tier")]
    InsufficientTier,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match self {
            AuthError::Unauthenticated => {
                (StatusCode::FOUND, [(header::LOCATION, LOGIN_PATH)]).into_response()
            }
            AuthError::InsufficientTier => (
                StatusCode::FORBIDDEN,
                axum::Json(json!({"error": "Insufficient privileges"})),
            )
                .into_response(),
            AuthError::StateMismatch | AuthError::NoPendingLogin => (
                StatusCode::BAD_REQUEST,
                axum::Json(json!({"error": AUTH_FAILED})),
            )
                .into_response(),
            AuthError::TokenExchangeFailed(_)
            | AuthError::TokenVerificationFailed(_)
            | AuthError::SessionDecodeFailed => (
                StatusCode::UNAUTHORIZED,
                axum::Json(json!({"error": AUTH_FAILED})),
            )
                .into_response(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found")]
    NotFound,

    #[error("Payload too large")]
    PayloadTooLarge,

    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::Auth(err) => return err.into_response(),
            AppError::NotAuthenticated => (
                StatusCode::UNAUTHORIZED,
                json!({"error": "Not authenticated"}),
            ),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, json!({"error": msg})),
            AppError::NotFound => (StatusCode::NOT_FOUND, json!({"error": "Not found"})),
            AppError::PayloadTooLarge => (
                StatusCode::PAYLOAD_TOO_LARGE,
                json!({"error": "File too large"}),
            ),
            AppError::Validation(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                json!({"error": "Validation failed", "errors": errors.messages()}),
            ),
            AppError::Storage(StorageError::NotFound) => {
                (StatusCode::NOT_FOUND, json!({"error": "File not found"}))
            }
            AppError::Storage(StorageError::InvalidKey(_)) => {
                (StatusCode::BAD_REQUEST, json!({"error": "Invalid filename"}))
            }
            AppError::Storage(err) => {
                tracing::error!(error = %err, "Storage operation failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({"error": "Storage operation failed"}),
                )
            }
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({"error": "Internal server error"}),
                )
            }
        };

        (status, axum::Json(body)).into_response()
    }
}
