//! Download with fallback, and purge across backends.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures::future::join_all;
use qrcloud_shared::types::ArtifactId;
use serde::Serialize;
use tracing::{info, warn};

use super::error::RetrievalError;
use super::store::ResultStore;
use crate::storage::{BackendRegistry, StorageError};
use crate::upload::UploadResult;

/// Default per-backend timeout for reads and deletes.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(5);

/// Artifact bytes fetched from one backend.
#[derive(Debug, Clone)]
pub struct Download {
    /// Artifact fetched.
    pub artifact_id: ArtifactId,
    /// Backend that served the bytes.
    pub backend: String,
    /// Object key on that backend.
    pub key: String,
    /// Whether an earlier backend failed first.
    pub fallback: bool,
    /// Content type recorded at upload.
    pub content_type: String,
    /// Object contents.
    pub bytes: Bytes,
}

/// Per-backend outcome of a purge.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PurgeReport {
    /// Backends whose copy was deleted.
    pub deleted: Vec<String>,
    /// Backends whose delete failed, with the reason.
    pub failed: BTreeMap<String, String>,
    /// Backends named in the result that are no longer registered.
    pub skipped: Vec<String>,
}

impl PurgeReport {
    /// Whether every registered copy was deleted.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Serves stored artifacts back using recorded upload results.
pub struct ArtifactRetriever<S> {
    registry: Arc<BackendRegistry>,
    store: Arc<S>,
    timeout: Duration,
}

impl<S> Clone for ArtifactRetriever<S> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
            store: Arc::clone(&self.store),
            timeout: self.timeout,
        }
    }
}

impl<S: ResultStore> ArtifactRetriever<S> {
    /// Create a retriever over `registry` and `store`.
    pub fn new(registry: Arc<BackendRegistry>, store: Arc<S>) -> Self {
        Self {
            registry,
            store,
            timeout: DEFAULT_READ_TIMEOUT,
        }
    }

    /// Set the per-backend timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Record an upload result for later downloads.
    pub async fn remember(&self, result: &UploadResult) -> Result<(), RetrievalError> {
        self.store.save(result.clone()).await
    }

    /// Recorded upload result for an artifact.
    pub async fn result(&self, artifact_id: ArtifactId) -> Result<UploadResult, RetrievalError> {
        self.store
            .find(artifact_id)
            .await?
            .ok_or(RetrievalError::NotFound(artifact_id))
    }

    /// Fetch an artifact from the first backend that can serve it.
    ///
    /// Backends are tried in registry order among those that stored the
    /// artifact. A backend that errors or exceeds the timeout is skipped in
    /// favour of the next one.
    pub async fn download(&self, artifact_id: ArtifactId) -> Result<Download, RetrievalError> {
        let result = self.result(artifact_id).await?;
        if result.is_unstored() {
            return Err(RetrievalError::NotStored(artifact_id));
        }

        let mut attempts: Vec<(String, StorageError)> = Vec::new();
        for (name, outcome) in result.successes() {
            let Some(backend) = self.registry.get(name) else {
                warn!(%artifact_id, backend = %name, "Backend no longer registered, skipping");
                continue;
            };
            let Some(key) = outcome.key() else {
                continue;
            };

            let fetched = match tokio::time::timeout(self.timeout, backend.get(key)).await {
                Ok(r) => r,
                Err(_) => Err(StorageError::Timeout(self.timeout)),
            };
            match fetched {
                Ok(bytes) => {
                    info!(
                        %artifact_id,
                        backend = %name,
                        size = bytes.len(),
                        fallback = !attempts.is_empty(),
                        "Artifact downloaded"
                    );
                    return Ok(Download {
                        artifact_id,
                        backend: name.to_string(),
                        key: key.to_string(),
                        fallback: !attempts.is_empty(),
                        content_type: result.content_type().to_string(),
                        bytes,
                    });
                }
                Err(e) => {
                    warn!(
                        %artifact_id,
                        backend = %name,
                        error_kind = %e.kind(),
                        error = %e,
                        "Download failed, trying next backend"
                    );
                    attempts.push((name.to_string(), e));
                }
            }
        }

        Err(RetrievalError::Unavailable {
            artifact_id,
            attempts,
        })
    }

    /// Delete every stored copy of an artifact.
    ///
    /// Deletes run concurrently. The recorded result is forgotten only when
    /// all registered copies are gone, so a partial purge can be retried.
    pub async fn purge(&self, artifact_id: ArtifactId) -> Result<PurgeReport, RetrievalError> {
        let result = self.result(artifact_id).await?;
        let mut report = PurgeReport::default();

        let mut targets = Vec::new();
        for (name, outcome) in result.successes() {
            match (self.registry.get(name), outcome.key()) {
                (Some(backend), Some(key)) => {
                    targets.push((name.to_string(), Arc::clone(backend), key.to_string()));
                }
                _ => report.skipped.push(name.to_string()),
            }
        }

        let timeout = self.timeout;
        let deletes = targets.into_iter().map(|(name, backend, key)| async move {
            let r = match tokio::time::timeout(timeout, backend.delete(&key)).await {
                Ok(r) => r,
                Err(_) => Err(StorageError::Timeout(timeout)),
            };
            (name, r)
        });

        for (name, r) in join_all(deletes).await {
            match r {
                Ok(()) => report.deleted.push(name),
                Err(e) => {
                    warn!(%artifact_id, backend = %name, error = %e, "Delete failed");
                    report.failed.insert(name, e.to_string());
                }
            }
        }

        if report.is_complete() {
            self.store.remove(artifact_id).await?;
        }
        info!(
            %artifact_id,
            deleted = report.deleted.len(),
            failed = report.failed.len(),
            "Artifact purged"
        );
        Ok(report)
    }
}
