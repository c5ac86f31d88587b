//! File storage for uploads.
//!
//! [`StorageProvider`] is implemented by [`S3Storage`] (cloud) and
//! [`LocalStorage`] (disk). [`FallbackStorage`] combines the two: writes go
//! to the cloud when it is configured and reachable, otherwise to disk.

use async_trait::async_trait;

pub mod fallback;
pub mod local;
pub mod s3;

pub use fallback::FallbackStorage;
pub use local::LocalStorage;
pub use s3::S3Storage;

/// Where an object physically lives. Persisted on the upload row so deletes
/// go to the right place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Cloud,
    Local,
}

impl StorageBackend {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cloud => "cloud",
            Self::Local => "local",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "cloud" => Some(Self::Cloud),
            "local" => Some(Self::Local),
            _ => None,
        }
    }
}

/// Result of a successful write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub backend: StorageBackend,
    pub key: String,
    /// URL clients use to fetch the object.
    pub url: String,
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Filesystem error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cloud storage error: {0}")]
    Cloud(String),

    #[error("Storage backend '{0}' is not configured")]
    NotConfigured(&'static str),
}

#[async_trait]
pub trait StorageProvider: Send + Sync {
    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<StoredObject, StorageError>;

    /// Remove an object. A key that does not exist is not an error.
    async fn delete(&self, key: &str) -> Result<(), StorageError>;

    fn backend(&self) -> StorageBackend;
}

/// Reject keys that could escape the storage root.
pub fn validate_key(key: &str) -> Result<(), StorageError> {
    let bad = key.is_empty()
        || key.starts_with('/')
        || key.contains('\\')
        || key.contains('\0')
        || key.split('/').any(|part| part.is_empty() || part == "." || part == "..");
    if bad {
        return Err(StorageError::InvalidKey(key.to_string()));
    }
    Ok(())
}
