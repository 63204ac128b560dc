//! Object storage for uploaded files.
//!
//! Keys are `<owner>/<filename>`; the owner prefix check lives in the upload
//! routes, key shape is enforced here for every backend.

pub mod local;
pub mod s3;

use bytes::Bytes;
use std::time::Duration;

pub use local::LocalStorage;
pub use s3::S3Storage;

/// Presigned URLs stay valid this long.
pub const PRESIGN_EXPIRY: Duration = Duration::from_secs(15 * 60);

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("object not found")]
    NotFound,

    #[error("invalid object key: {0}")]
    InvalidKey(String),

    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage backend failed: {0}")]
    Backend(String),
}

/// Storage backend dispatch.
///
/// Enum rather than trait object: the set of backends is closed and each
/// variant's methods are async.
pub enum StorageBackend {
    Local(LocalStorage),
    S3(S3Storage),
}

impl StorageBackend {
    pub fn kind(&self) -> &'static str {
        match self {
            StorageBackend::Local(_) => "local",
            StorageBackend::S3(_) => "s3",
        }
    }

    pub async fn upload(&self, key: &str, data: Bytes) -> Result<(), StorageError> {
        validate_key(key)?;
        match self {
            StorageBackend::Local(b) => b.upload(key, data).await,
            StorageBackend::S3(b) => b.upload(key, data).await,
        }
    }

    pub async fn download(&self, key: &str) -> Result<Bytes, StorageError> {
        validate_key(key)?;
        match self {
            StorageBackend::Local(b) => b.download(key).await,
            StorageBackend::S3(b) => b.download(key).await,
        }
    }

    pub async fn delete(&self, key: &str) -> Result<(), StorageError> {
        validate_key(key)?;
        match self {
            StorageBackend::Local(b) => b.delete(key).await,
            StorageBackend::S3(b) => b.delete(key).await,
        }
    }

    pub async fn presigned_url(&self, key: &str, expiry: Duration) -> Result<String, StorageError> {
        validate_key(key)?;
        match self {
            StorageBackend::Local(b) => Ok(b.presigned_url(key)),
            StorageBackend::S3(b) => b.presigned_url(key, expiry).await,
        }
    }
}

/// Relative, `/`-separated, no empty, `.` or `..` segments.
pub fn validate_key(key: &str) -> Result<(), StorageError> {
    let invalid = key.is_empty()
        || key.starts_with('/')
        || key.contains('\\')
        || key.contains('\0')
        || key
            .split('/')
            .any(|segment| segment.is_empty() || segment == "." || segment == "..");
    if invalid {
        return Err(StorageError::InvalidKey(key.to_string()));
    }
    Ok(())
}

/// Reduce a client-supplied filename to a safe single path segment.
pub fn sanitize_filename(filename: &str) -> Result<String, StorageError> {
    let base = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        return Err(StorageError::InvalidKey(filename.to_string()));
    }
    Ok(cleaned.to_string())
}
