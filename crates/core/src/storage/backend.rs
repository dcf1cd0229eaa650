//! Storage backends built on Apache OpenDAL.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use opendal::{Builder, Operator, services};
use qrcloud_shared::config::StorageProvider;

use super::config::{BackendConfig, StorageOptions};
use super::error::StorageError;
use crate::artifact::Artifact;

/// Where a `put` placed an artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    /// Object key inside the bucket/container.
    pub key: String,
    /// Caller-usable retrieval URL.
    pub url: String,
}

/// One object-storage destination.
///
/// Implementations must be safe to call concurrently and must not mutate the
/// artifact. Timeouts are applied by the caller.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Stable backend name, unique within a registry.
    fn name(&self) -> &str;

    /// Provider tag (`s3`, `azure_blob`, ...).
    fn kind(&self) -> &'static str;

    /// Store the artifact under a key derived from its id.
    async fn put(&self, artifact: &Artifact) -> Result<StoredObject, StorageError>;

    /// Read an object back.
    async fn get(&self, key: &str) -> Result<Bytes, StorageError>;

    /// Remove an object.
    async fn delete(&self, key: &str) -> Result<(), StorageError>;

    /// Lightweight existence/permission probe.
    async fn health_check(&self) -> Result<(), StorageError>;
}

/// Backend for every provider OpenDAL speaks.
///
/// ```text
/// ┌──────────────────────────────────────────────────────────┐
/// │                 ObjectStoreBackend                       │
/// ├──────────────────────────────────────────────────────────┤
/// │ put    -> op.write_with(key, bytes) + op.presign_read    │
/// │ get    -> op.read(key)                                   │
/// │ delete -> op.delete(key)                                 │
/// │ health -> op.check()                                     │
/// └──────────────────────────────────────────────────────────┘
/// ```
pub struct ObjectStoreBackend {
    name: String,
    kind: &'static str,
    bucket: String,
    operator: Operator,
    key_prefix: String,
    url_ttl: Duration,
}

impl std::fmt::Debug for ObjectStoreBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectStoreBackend")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("bucket", &self.bucket)
            .finish_non_exhaustive()
    }
}

impl ObjectStoreBackend {
    /// Create a backend from configuration.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if credentials are missing or the
    /// provider cannot be initialized.
    pub fn from_config(
        config: &BackendConfig,
        options: &StorageOptions,
    ) -> Result<Self, StorageError> {
        let operator = Self::create_operator(&config.provider)?;
        Ok(Self {
            name: config.name.clone(),
            kind: config.provider.kind(),
            bucket: config.provider.bucket().to_string(),
            operator,
            key_prefix: options.key_prefix.clone(),
            url_ttl: options.url_ttl,
        })
    }

    /// Create OpenDAL operator from provider config.
    fn create_operator(provider: &StorageProvider) -> Result<Operator, StorageError> {
        match provider {
            StorageProvider::S3 {
                endpoint,
                bucket,
                access_key_id,
                secret_access_key,
                region,
            } => {
                require("bucket", bucket)?;
                require("access_key_id", access_key_id)?;
                require("secret_access_key", secret_access_key)?;

                let mut builder = services::S3::default()
                    .bucket(bucket)
                    .access_key_id(access_key_id)
                    .secret_access_key(secret_access_key)
                    .region(region);
                if !endpoint.is_empty() {
                    builder = builder.endpoint(endpoint);
                }

                build_operator(builder)
            }
            StorageProvider::AzureBlob {
                account,
                access_key,
                container,
            } => {
                require("account", account)?;
                require("access_key", access_key)?;
                require("container", container)?;

                let builder = services::Azblob::default()
                    .endpoint(&format!("https://{account}.blob.core.windows.net"))
                    .account_name(account)
                    .account_key(access_key)
                    .container(container);

                build_operator(builder)
            }
            StorageProvider::LocalFs { root } => {
                let builder = services::Fs::default().root(
                    root.to_str()
                        .ok_or_else(|| StorageError::configuration("invalid path"))?,
                );

                build_operator(builder)
            }
            StorageProvider::Memory => build_operator(services::Memory::default()),
        }
    }

    /// Retrieval URL for a stored key.
    ///
    /// Presigned where the provider can sign, otherwise a stable
    /// `{kind}://{bucket}/{key}` locator.
    async fn retrieval_url(&self, key: &str) -> Result<String, StorageError> {
        if self.operator.info().full_capability().presign_read {
            let presigned = self.operator.presign_read(key, self.url_ttl).await?;
            return Ok(presigned.uri().to_string());
        }

        Ok(format!(
            "{}://{}/{}",
            self.kind,
            self.bucket.trim_matches('/'),
            key
        ))
    }

    /// Bucket or container name.
    #[must_use]
    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

#[async_trait]
impl StorageBackend for ObjectStoreBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &'static str {
        self.kind
    }

    async fn put(&self, artifact: &Artifact) -> Result<StoredObject, StorageError> {
        let key = artifact.storage_key(&self.key_prefix);

        let write = self.operator.write_with(&key, artifact.bytes().clone());
        let result = if self
            .operator
            .info()
            .full_capability()
            .write_with_content_type
        {
            write.content_type(artifact.content_type()).await
        } else {
            write.await
        };
        // A missing bucket surfaces as NotFound on write.
        result.map_err(|e| match StorageError::from(e) {
            StorageError::NotFound { key } => StorageError::PermanentRejection(key),
            other => other,
        })?;

        let url = self.retrieval_url(&key).await?;
        Ok(StoredObject { key, url })
    }

    async fn get(&self, key: &str) -> Result<Bytes, StorageError> {
        match self.operator.read(key).await {
            Ok(buffer) => Ok(buffer.to_bytes()),
            Err(e) if e.kind() == opendal::ErrorKind::NotFound => Err(StorageError::not_found(key)),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.operator.delete(key).await.map_err(StorageError::from)
    }

    async fn health_check(&self) -> Result<(), StorageError> {
        self.operator.check().await.map_err(StorageError::from)
    }
}

fn require(field: &str, value: &str) -> Result<(), StorageError> {
    if value.trim().is_empty() {
        return Err(StorageError::configuration(format!("missing {field}")));
    }
    Ok(())
}

fn build_operator(builder: impl Builder) -> Result<Operator, StorageError> {
    Ok(Operator::new(builder)
        .map_err(|e| StorageError::configuration(e.to_string()))?
        .finish())
}
