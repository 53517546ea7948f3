//! Uploaded file storage

pub mod local;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

pub use local::LocalFileRepository;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Invalid object path: {0}")]
    InvalidPath(String),

    #[error("Object not managed by this store: {0}")]
    ForeignUrl(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Object store for course attachments
#[async_trait]
pub trait FileRepository: Send + Sync {
    /// Store `data` under `path` and return the public URL
    async fn upload_file(&self, data: Bytes, path: &str, content_type: &str) -> Result<String, StorageError>;

    async fn delete_file(&self, url: &str) -> Result<(), StorageError>;
}
