//! Persistence of upload results keyed by artifact id.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use qrcloud_shared::types::ArtifactId;

use super::error::RetrievalError;
use crate::upload::UploadResult;

/// Store for upload results.
///
/// Downloads need the outcome map of the original upload to know which
/// backends hold a copy. A database-backed implementation can live outside
/// this crate.
pub trait ResultStore: Send + Sync {
    /// Record a result, replacing any earlier one for the same artifact.
    fn save(
        &self,
        result: UploadResult,
    ) -> impl std::future::Future<Output = Result<(), RetrievalError>> + Send;

    /// Find the result for an artifact.
    fn find(
        &self,
        artifact_id: ArtifactId,
    ) -> impl std::future::Future<Output = Result<Option<UploadResult>, RetrievalError>> + Send;

    /// Forget the result for an artifact.
    fn remove(
        &self,
        artifact_id: ArtifactId,
    ) -> impl std::future::Future<Output = Result<bool, RetrievalError>> + Send;
}

/// Bounded in-process result store with time-based eviction.
#[derive(Clone)]
pub struct InMemoryResultStore {
    cache: Cache<ArtifactId, Arc<UploadResult>>,
}

impl InMemoryResultStore {
    /// Default capacity.
    pub const DEFAULT_CAPACITY: u64 = 10_000;
    /// Default TTL: 1 day.
    pub const DEFAULT_TTL: Duration = Duration::from_secs(86_400);

    /// Create a store holding at most `capacity` results for `ttl` each.
    #[must_use]
    pub fn new(capacity: u64, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(capacity)
            .time_to_live(ttl)
            .build();
        Self { cache }
    }
}

impl Default for InMemoryResultStore {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY, Self::DEFAULT_TTL)
    }
}

impl ResultStore for InMemoryResultStore {
    async fn save(&self, result: UploadResult) -> Result<(), RetrievalError> {
        self.cache
            .insert(result.artifact_id(), Arc::new(result))
            .await;
        Ok(())
    }

    async fn find(&self, artifact_id: ArtifactId) -> Result<Option<UploadResult>, RetrievalError> {
        Ok(self
            .cache
            .get(&artifact_id)
            .await
            .map(|r| r.as_ref().clone()))
    }

    async fn remove(&self, artifact_id: ArtifactId) -> Result<bool, RetrievalError> {
        Ok(self.cache.remove(&artifact_id).await.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[tokio::test]
    async fn test_save_find_remove() {
        let store = InMemoryResultStore::default();
        let result = UploadResult::degraded(ArtifactId::new(), "image/png", Utc::now());
        let id = result.artifact_id();

        store.save(result.clone()).await.unwrap();
        assert_eq!(store.find(id).await.unwrap(), Some(result));

        assert!(store.remove(id).await.unwrap());
        assert!(store.find(id).await.unwrap().is_none());
        assert!(!store.remove(id).await.unwrap());
    }

    #[tokio::test]
    async fn test_expired_results_are_gone() {
        let store = InMemoryResultStore::new(10, Duration::from_millis(50));
        let result = UploadResult::degraded(ArtifactId::new(), "image/png", Utc::now());
        let id = result.artifact_id();

        store.save(result).await.unwrap();
        tokio::time::sleep(Duration::from_millis(120)).await;
        assert!(store.find(id).await.unwrap().is_none());
    }
}
