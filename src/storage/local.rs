use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

use super::{FileRepository, StorageError};
use crate::config::StorageConfig;

/// Writes objects below `base_path`; URLs are `base_url/<path>`
#[derive(Debug, Clone)]
pub struct LocalFileRepository {
    base_path: PathBuf,
    base_url: String,
}

impl LocalFileRepository {
    pub fn new(base_path: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        Self {
            base_path: base_path.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(&config.base_path, &config.base_url)
    }

    /// Resolve a relative object path, refusing anything that escapes `base_path`
    fn resolve(&self, path: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(path.trim_start_matches('/'));
        let mut resolved = self.base_path.clone();
        let mut depth = 0;
        for component in relative.components() {
            match component {
                Component::Normal(part) => {
                    resolved.push(part);
                    depth += 1;
                }
                Component::CurDir => {}
                _ => return Err(StorageError::InvalidPath(path.to_string())),
            }
        }
        if depth == 0 {
            return Err(StorageError::InvalidPath(path.to_string()));
        }
        Ok(resolved)
    }

    fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

#[async_trait]
impl FileRepository for LocalFileRepository {
    async fn upload_file(&self, data: Bytes, path: &str, content_type: &str) -> Result<String, StorageError> {
        let target = self.resolve(path)?;
        if let Some(dir) = target.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        tokio::fs::write(&target, &data).await?;
        debug!("Stored {} ({} bytes, {})", target.display(), data.len(), content_type);
        Ok(self.url_for(path))
    }

    async fn delete_file(&self, url: &str) -> Result<(), StorageError> {
        let relative = url
            .strip_prefix(&self.base_url)
            .and_then(|rest| rest.strip_prefix('/'))
            .ok_or_else(|| StorageError::ForeignUrl(url.to_string()))?;
        let target = self.resolve(relative)?;
        tokio::fs::remove_file(&target).await?;
        debug!("Removed {}", target.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn uploads_and_deletes_below_base_path() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFileRepository::new(dir.path(), "/images/");

        let url = store
            .upload_file(Bytes::from_static(b"png"), "courses/20240101_000000_a.png", "image/png")
            .await
            .unwrap();
        assert_eq!(url, "/images/courses/20240101_000000_a.png");
        let on_disk = dir.path().join("courses/20240101_000000_a.png");
        assert_eq!(std::fs::read(&on_disk).unwrap(), b"png");

        store.delete_file(&url).await.unwrap();
        assert!(!on_disk.exists());
    }

    #[tokio::test]
    async fn refuses_paths_outside_base() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFileRepository::new(dir.path(), "/images");
        let escaped = store.upload_file(Bytes::new(), "../secret.txt", "text/plain").await;
        assert!(matches!(escaped, Err(StorageError::InvalidPath(_))));

        let foreign = store.delete_file("https://elsewhere.example/a.png").await;
        assert!(matches!(foreign, Err(StorageError::ForeignUrl(_))));
    }
}
