//! File uploads, scoped to the caller's company prefix.
//!
//! POST /uploads, GET /files/{*key}, DELETE /files/{*key}, GET /presign/{*key}

use axum::Json;
use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, Path, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use std::sync::Arc;

use crate::AppState;
use crate::audit;
use crate::error::AppError;
use crate::storage::{PRESIGN_EXPIRY, sanitize_filename, validate_key};
use crate::types::{PresignedUrlResponse, UploadResponse};
use crate::users::AuthenticatedUser;

fn multipart_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge
    } else {
        AppError::BadRequest("Invalid multipart body".into())
    }
}

/// Keys outside the caller's prefix are reported as missing.
fn owned_key(user: &AuthenticatedUser, key: &str) -> Result<(), AppError> {
    validate_key(key)?;
    let owned = key
        .strip_prefix(user.owner_prefix())
        .is_some_and(|rest| rest.starts_with('/'));
    if !owned {
        tracing::warn!(user_id = %user.id, key, "Cross-tenant file access refused");
        return Err(AppError::NotFound);
    }
    Ok(())
}

pub async fn upload(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some("file") {
            continue;
        }

        let original = field.file_name().unwrap_or_default().to_string();
        let filename = sanitize_filename(&original)?;
        let data = field.bytes().await.map_err(multipart_error)?;
        if data.len() > state.config.max_upload_bytes {
            return Err(AppError::PayloadTooLarge);
        }

        let key = format!("{}/{}", user.owner_prefix(), filename);
        let size = data.len();
        state.storage.upload(&key, data).await?;

        audit::record(&state.metrics, "file_uploaded", &user.id, &key);
        tracing::info!(user_id = %user.id, key = %key, size, "File uploaded");

        return Ok(Json(UploadResponse {
            message: "File uploaded successfully".into(),
            key,
            filename,
            size,
        }));
    }

    Err(AppError::BadRequest("No file provided".into()))
}

pub async fn download(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Path(key): Path<String>,
) -> Result<Response, AppError> {
    owned_key(&user, &key)?;
    let data = state.storage.download(&key).await?;
    let filename = key.rsplit('/').next().unwrap_or_default();

    Ok((
        [
            (header::CONTENT_TYPE, "application/octet-stream".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        data,
    )
        .into_response())
}

pub async fn delete(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Path(key): Path<String>,
) -> Result<StatusCode, AppError> {
    owned_key(&user, &key)?;
    state.storage.delete(&key).await?;
    audit::record(&state.metrics, "file_deleted", &user.id, &key);
    Ok(StatusCode::NO_CONTENT)
}

pub async fn presigned_url(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Path(key): Path<String>,
) -> Result<Json<PresignedUrlResponse>, AppError> {
    owned_key(&user, &key)?;
    let url = state.storage.presigned_url(&key, PRESIGN_EXPIRY).await?;
    Ok(Json(PresignedUrlResponse {
        url,
        expires_in: PRESIGN_EXPIRY.as_secs(),
    }))
}
