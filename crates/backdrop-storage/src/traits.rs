//! Storage abstraction trait

use async_trait::async_trait;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Object storage abstraction.
///
/// All backends must implement this trait. The pipeline downloads the
/// uploaded object and writes exactly one public-read artifact per
/// successful invocation.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Download an object by its key.
    async fn download(&self, key: &str) -> StorageResult<Vec<u8>>;

    /// Persist `data` at `key`, mark it publicly readable, and return its
    /// stable public URL.
    async fn upload_public(
        &self,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> StorageResult<String>;

    /// Check if an object exists.
    async fn exists(&self, key: &str) -> StorageResult<bool>;
}
