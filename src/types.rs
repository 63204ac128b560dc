//! Shared response DTOs.

use serde::{Deserialize, Serialize};

use crate::users::AuthenticatedUser;

/// GET /health response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub environment: String,
    pub version: String,
}

/// GET / response for anonymous visitors.
#[derive(Debug, Serialize, Deserialize)]
pub struct SplashResponse {
    pub name: String,
    pub login_url: String,
}

/// GET /dashboard response.
#[derive(Debug, Serialize, Deserialize)]
pub struct DashboardResponse {
    pub user: AuthenticatedUser,
    pub destination_count: usize,
    pub storage_backend: String,
}

/// POST /uploads response.
#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub message: String,
    pub key: String,
    pub filename: String,
    pub size: usize,
}

/// GET /presign/{key} response.
#[derive(Debug, Serialize, Deserialize)]
pub struct PresignedUrlResponse {
    pub url: String,
    pub expires_in: u64,
}

/// POST /destinations/meta/validate response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ValidationResponse {
    pub valid: bool,
    pub errors: Vec<String>,
}
