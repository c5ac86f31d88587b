//! S3-compatible object storage.

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;

use crate::{validate_key, StorageBackend, StorageError, StorageProvider, StoredObject};

#[derive(Debug, Clone)]
pub struct S3Storage {
    client: aws_sdk_s3::Client,
    bucket: String,
    public_base_url: String,
}

impl S3Storage {
    pub fn new(
        client: aws_sdk_s3::Client,
        bucket: impl Into<String>,
        public_base_url: Option<String>,
    ) -> Self {
        let bucket = bucket.into();
        let public_base_url = public_base_url
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_else(|| format!("https://{bucket}.s3.amazonaws.com"));
        Self {
            client,
            bucket,
            public_base_url,
        }
    }

    /// Build a client from the default AWS credential chain. `endpoint`
    /// targets an S3-compatible service (MinIO, R2) with path-style
    /// addressing.
    pub async fn connect(
        bucket: impl Into<String>,
        endpoint: Option<String>,
        public_base_url: Option<String>,
    ) -> Self {
        let shared = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .load()
            .await;
        let mut builder = aws_sdk_s3::config::Builder::from(&shared);
        if let Some(endpoint) = endpoint {
            tracing::info!(endpoint = %endpoint, "Using custom S3 endpoint");
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }
        let client = aws_sdk_s3::Client::from_conf(builder.build());
        Self::new(client, bucket, public_base_url)
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

#[async_trait]
impl StorageProvider for S3Storage {
    #[tracing::instrument(skip(self, bytes), fields(bucket = %self.bucket, size = bytes.len()))]
    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<StoredObject, StorageError> {
        validate_key(key)?;
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| StorageError::Cloud(format!("put {key}: {e}")))?;

        Ok(StoredObject {
            backend: StorageBackend::Cloud,
            key: key.to_string(),
            url: format!("{}/{key}", self.public_base_url),
        })
    }

    /// S3 reports success for keys that do not exist.
    #[tracing::instrument(skip(self), fields(bucket = %self.bucket))]
    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        validate_key(key)?;
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| StorageError::Cloud(format!("delete {key}: {e}")))?;
        Ok(())
    }

    fn backend(&self) -> StorageBackend {
        StorageBackend::Cloud
    }
}
