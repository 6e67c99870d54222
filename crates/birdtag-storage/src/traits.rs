//! Storage abstraction trait
//!
//! All object-store backends must implement `ObjectStore`. This keeps the
//! pipeline decoupled from any specific backend.

use async_trait::async_trait;
use thiserror::Error;

use birdtag_core::PipelineError;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<StorageError> for PipelineError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(key) => {
                PipelineError::Lookup(format!("object not found: {}", key))
            }
            other => PipelineError::Storage(other.to_string()),
        }
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Object store abstraction.
///
/// Keys are opaque, caller-provided strings; backends must not interpret
/// them beyond mapping to their own addressing scheme.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store an object under `key` and return its public URL.
    async fn upload(&self, key: &str, content_type: &str, data: Vec<u8>) -> StorageResult<String>;

    /// Fetch an object's bytes by key.
    async fn download(&self, key: &str) -> StorageResult<Vec<u8>>;

    /// Remove an object by key.
    async fn delete(&self, key: &str) -> StorageResult<()>;

    /// Public URL for a key, without touching the backend.
    fn url_for(&self, key: &str) -> String;
}
