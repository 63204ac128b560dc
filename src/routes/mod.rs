//! HTTP route handlers.

pub mod callback;
pub mod dashboard;
pub mod destinations;
pub mod health;
pub mod home;
pub mod login;
pub mod logout;
pub mod me;
pub mod upload;

use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};

pub const DASHBOARD_PATH: &str = "/dashboard";

/// Plain 302 redirect.
pub(crate) fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}
