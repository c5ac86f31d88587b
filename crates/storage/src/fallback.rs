//! Cloud-first storage that degrades to local disk.

use std::sync::Arc;

use crate::{LocalStorage, StorageBackend, StorageError, StorageProvider, StoredObject};

#[derive(Clone)]
pub struct FallbackStorage {
    cloud: Option<Arc<dyn StorageProvider>>,
    local: LocalStorage,
}

impl FallbackStorage {
    pub fn new(cloud: Option<Arc<dyn StorageProvider>>, local: LocalStorage) -> Self {
        Self { cloud, local }
    }

    pub fn local_only(local: LocalStorage) -> Self {
        Self::new(None, local)
    }

    pub fn local(&self) -> &LocalStorage {
        &self.local
    }

    pub fn has_cloud(&self) -> bool {
        self.cloud.is_some()
    }

    /// Store via the cloud provider if there is one; on any cloud failure
    /// log a warning and store locally instead.
    pub async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<StoredObject, StorageError> {
        if let Some(cloud) = &self.cloud {
            // Only the cloud path needs its own copy of the bytes.
            match cloud.put(key, bytes.clone(), content_type).await {
                Ok(stored) => return Ok(stored),
                Err(StorageError::InvalidKey(k)) => return Err(StorageError::InvalidKey(k)),
                Err(e) => {
                    tracing::warn!(key, error = %e, "Cloud upload failed, storing locally");
                }
            }
        }
        self.local.put(key, bytes, content_type).await
    }

    /// Delete from the backend the object was written to.
    pub async fn delete(&self, backend: StorageBackend, key: &str) -> Result<(), StorageError> {
        match backend {
            StorageBackend::Local => self.local.delete(key).await,
            StorageBackend::Cloud => match &self.cloud {
                Some(cloud) => cloud.delete(key).await,
                None => Err(StorageError::NotConfigured("cloud")),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use assert_matches::assert_matches;
    use async_trait::async_trait;

    use super::*;

    /// In-memory stand-in for the cloud provider.
    #[derive(Default)]
    struct FakeCloud {
        fail: bool,
        keys: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl StorageProvider for FakeCloud {
        async fn put(
            &self,
            key: &str,
            _bytes: Vec<u8>,
            _content_type: &str,
        ) -> Result<StoredObject, StorageError> {
            if self.fail {
                return Err(StorageError::Cloud("unreachable".into()));
            }
            self.keys.lock().unwrap().push(key.to_string());
            Ok(StoredObject {
                backend: StorageBackend::Cloud,
                key: key.to_string(),
                url: format!("https://cdn.test/{key}"),
            })
        }

        async fn delete(&self, key: &str) -> Result<(), StorageError> {
            if self.fail {
                return Err(StorageError::Cloud("unreachable".into()));
            }
            self.keys.lock().unwrap().retain(|k| k != key);
            Ok(())
        }

        fn backend(&self) -> StorageBackend {
            StorageBackend::Cloud
        }
    }

    #[tokio::test]
    async fn healthy_cloud_takes_the_write() {
        let dir = tempfile::tempdir().unwrap();
        let cloud = Arc::new(FakeCloud::default());
        let storage = FallbackStorage::new(
            Some(cloud.clone()),
            LocalStorage::new(dir.path(), "/uploads"),
        );

        let stored = storage.put("a/b.png", vec![1], "image/png").await.unwrap();
        assert_eq!(stored.backend, StorageBackend::Cloud);
        assert_eq!(cloud.keys.lock().unwrap().len(), 1);
        assert!(!dir.path().join("a/b.png").exists());

        storage.delete(StorageBackend::Cloud, "a/b.png").await.unwrap();
        assert!(cloud.keys.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn failing_cloud_falls_back_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let cloud = Arc::new(FakeCloud {
            fail: true,
            ..Default::default()
        });
        let storage = FallbackStorage::new(Some(cloud), LocalStorage::new(dir.path(), "/uploads"));

        let stored = storage.put("a/b.png", vec![1], "image/png").await.unwrap();
        assert_eq!(stored.backend, StorageBackend::Local);
        assert!(dir.path().join("a/b.png").exists());
    }

    #[tokio::test]
    async fn cloud_delete_surfaces_errors() {
        let dir = tempfile::tempdir().unwrap();
        let cloud = Arc::new(FakeCloud {
            fail: true,
            ..Default::default()
        });
        let storage = FallbackStorage::new(Some(cloud), LocalStorage::new(dir.path(), "/uploads"));

        assert_matches!(
            storage.delete(StorageBackend::Cloud, "a/b.png").await,
            Err(StorageError::Cloud(_))
        );
    }

    #[tokio::test]
    async fn cloud_delete_without_cloud_is_not_configured() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FallbackStorage::local_only(LocalStorage::new(dir.path(), "/uploads"));
        assert!(!storage.has_cloud());
        assert_matches!(
            storage.delete(StorageBackend::Cloud, "k").await,
            Err(StorageError::NotConfigured("cloud"))
        );
    }
}
