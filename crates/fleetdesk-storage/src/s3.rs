use crate::traits::{Storage, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::path::Path;
use object_store::ObjectStoreExt;

/// S3 (or S3-compatible) storage backed by `object_store`.
#[derive(Clone)]
pub struct S3Storage {
    store: AmazonS3,
    bucket: String,
    public_base_url: String,
}

impl S3Storage {
    /// Credentials are taken from the standard `AWS_*` environment variables.
    pub async fn new(
        bucket: String,
        region: String,
        endpoint: Option<String>,
        public_base_url: Option<String>,
    ) -> StorageResult<Self> {
        let mut builder = AmazonS3Builder::from_env()
            .with_bucket_name(bucket.clone())
            .with_region(region.clone());

        if let Some(ref endpoint) = endpoint {
            builder = builder
                .with_endpoint(endpoint.clone())
                .with_allow_http(endpoint.starts_with("http://"));
        }

        let store = builder.build().map_err(|e| {
            StorageError::ConfigError(format!("Failed to build S3 object store: {}", e))
        })?;

        let public_base_url = public_base_url
            .or_else(|| {
                endpoint
                    .as_ref()
                    .map(|e| format!("{}/{}", e.trim_end_matches('/'), bucket))
            })
            .unwrap_or_else(|| format!("https://{}.s3.{}.amazonaws.com", bucket, region));

        tracing::info!(bucket = %bucket, region = %region, "S3 storage initialized");

        Ok(S3Storage {
            store,
            bucket,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        })
    }

    fn location(storage_key: &str) -> StorageResult<Path> {
        if storage_key.is_empty() || storage_key.contains("..") || storage_key.starts_with('/') {
            return Err(StorageError::InvalidKey(storage_key.to_string()));
        }
        Ok(Path::from(storage_key.to_string()))
    }
}

#[async_trait]
impl Storage for S3Storage {
    #[tracing::instrument(skip(self, data), fields(s3.bucket = %self.bucket, s3.key = %storage_key, s3.size = data.len()))]
    async fn upload_with_key(
        &self,
        storage_key: &str,
        data: Vec<u8>,
        _content_type: &str,
    ) -> StorageResult<String> {
        let location = Self::location(storage_key)?;
        let start = std::time::Instant::now();

        match self.store.put(&location, Bytes::from(data).into()).await {
            Ok(_) => {
                tracing::info!(
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 upload successful"
                );
                Ok(self.public_url(storage_key))
            }
            Err(e) => {
                tracing::error!(error = %e, "S3 upload failed");
                Err(StorageError::UploadFailed(e.to_string()))
            }
        }
    }

    #[tracing::instrument(skip(self), fields(s3.bucket = %self.bucket, s3.key = %storage_key))]
    async fn delete(&self, storage_key: &str) -> StorageResult<()> {
        let location = Self::location(storage_key)?;
        match self.store.delete(&location).await {
            Ok(()) | Err(object_store::Error::NotFound { .. }) => Ok(()),
            Err(e) => {
                tracing::error!(error = %e, "S3 delete failed");
                Err(StorageError::DeleteFailed(e.to_string()))
            }
        }
    }

    async fn exists(&self, storage_key: &str) -> StorageResult<bool> {
        let location = Self::location(storage_key)?;
        match self.store.get(&location).await {
            Ok(_) => Ok(true),
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(e) => Err(StorageError::LookupFailed(e.to_string())),
        }
    }

    fn public_url(&self, storage_key: &str) -> String {
        format!("{}/{}", self.public_base_url, storage_key)
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::S3
    }
}
