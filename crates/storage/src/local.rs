//! Disk storage under a root directory, served by the API at a URL prefix.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::{validate_key, StorageBackend, StorageError, StorageProvider, StoredObject};

#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
    url_prefix: String,
}

impl LocalStorage {
    /// `url_prefix` is the path the API serves `root` at, e.g. `/uploads`.
    pub fn new(root: impl Into<PathBuf>, url_prefix: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            url_prefix: url_prefix.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        validate_key(key)?;
        Ok(self.root.join(key))
    }
}

#[async_trait]
impl StorageProvider for LocalStorage {
    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        _content_type: &str,
    ) -> Result<StoredObject, StorageError> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;
        tracing::debug!(key, path = %path.display(), "Stored object locally");

        Ok(StoredObject {
            backend: StorageBackend::Local,
            key: key.to_string(),
            url: format!("{}/{key}", self.url_prefix),
        })
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn backend(&self) -> StorageBackend {
        StorageBackend::Local
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[tokio::test]
    async fn put_writes_file_and_builds_url() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path(), "/uploads/");

        let stored = storage
            .put("job/4/a.png", b"png-bytes".to_vec(), "image/png")
            .await
            .unwrap();

        assert_eq!(stored.backend, StorageBackend::Local);
        assert_eq!(stored.url, "/uploads/job/4/a.png");
        let on_disk = tokio::fs::read(dir.path().join("job/4/a.png")).await.unwrap();
        assert_eq!(on_disk, b"png-bytes");
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path(), "/uploads");
        storage.put("x/y.pdf", vec![1, 2, 3], "application/pdf").await.unwrap();

        storage.delete("x/y.pdf").await.unwrap();
        assert!(!dir.path().join("x/y.pdf").exists());
        storage.delete("x/y.pdf").await.unwrap();
    }

    #[tokio::test]
    async fn traversal_never_touches_disk() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path().join("root"), "/uploads");

        let result = storage.put("../escape.txt", vec![0], "text/plain").await;
        assert_matches!(result, Err(StorageError::InvalidKey(_)));
        assert!(!dir.path().join("escape.txt").exists());
    }
}
