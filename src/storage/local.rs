//! Filesystem storage for local development.

use bytes::Bytes;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::StorageError;

pub struct LocalStorage {
    base_dir: PathBuf,
}

fn map_io(e: std::io::Error) -> StorageError {
    if e.kind() == ErrorKind::NotFound {
        StorageError::NotFound
    } else {
        StorageError::Io(e)
    }
}

impl LocalStorage {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.base_dir.join(key)
    }

    pub async fn upload(&self, key: &str, data: Bytes) -> Result<(), StorageError> {
        let path = self.path_for(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, &data).await?;
        tracing::debug!(key, bytes = data.len(), "Stored file locally");
        Ok(())
    }

    pub async fn download(&self, key: &str) -> Result<Bytes, StorageError> {
        tokio::fs::read(self.path_for(key))
            .await
            .map(Bytes::from)
            .map_err(map_io)
    }

    pub async fn delete(&self, key: &str) -> Result<(), StorageError> {
        tokio::fs::remove_file(self.path_for(key))
            .await
            .map_err(map_io)
    }

    /// Local files are served by the app itself; there is nothing to sign.
    pub fn presigned_url(&self, key: &str) -> String {
        format!("/files/{key}")
    }
}
