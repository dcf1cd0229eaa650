//! Process-wide set of healthy storage backends.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde::Serialize;
use tracing::{info, warn};

use super::backend::{ObjectStoreBackend, StorageBackend};
use super::config::{BackendConfig, StorageOptions};
use super::error::StorageError;

/// A configured backend that did not make it into the registry.
#[derive(Debug, Clone, Serialize)]
pub struct ExcludedBackend {
    /// Backend name.
    pub name: String,
    /// Provider tag.
    pub kind: &'static str,
    /// Why it was excluded.
    pub reason: String,
}

/// Status line for one configured backend.
#[derive(Debug, Clone, Serialize)]
pub struct BackendStatus {
    /// Backend name.
    pub name: String,
    /// Provider tag.
    pub kind: &'static str,
    /// Whether the backend is in the registry.
    pub available: bool,
    /// Exclusion reason for unavailable backends.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Ordered, immutable set of healthy backends.
///
/// Built once at startup. Backends that fail construction or their health
/// check are left out and stay out until the process restarts.
#[derive(Clone, Default)]
pub struct BackendRegistry {
    backends: Vec<Arc<dyn StorageBackend>>,
    excluded: Vec<ExcludedBackend>,
}

impl std::fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendRegistry")
            .field("backends", &self.names())
            .field("excluded", &self.excluded)
            .finish()
    }
}

impl BackendRegistry {
    /// A registry with no backends (degraded mode).
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Construct and health-check every enabled backend in `configs`.
    ///
    /// Never fails: backends that cannot be built or are unhealthy are
    /// excluded and logged.
    pub async fn build(configs: Vec<BackendConfig>, options: &StorageOptions) -> Self {
        let mut candidates: Vec<Arc<dyn StorageBackend>> = Vec::new();
        let mut excluded = Vec::new();

        for config in configs {
            if !config.enabled {
                info!(backend = %config.name, "Storage backend disabled");
                continue;
            }

            match ObjectStoreBackend::from_config(&config, options) {
                Ok(backend) => candidates.push(Arc::new(backend)),
                Err(e) => {
                    warn!(
                        backend = %config.name,
                        kind = config.provider.kind(),
                        error = %e,
                        "Storage backend could not be initialized"
                    );
                    excluded.push(ExcludedBackend {
                        name: config.name,
                        kind: config.provider.kind(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        let mut registry = Self::admit(candidates, options.health_check_timeout).await;
        excluded.append(&mut registry.excluded);
        registry.excluded = excluded;
        registry
    }

    /// Health-check `candidates` concurrently and keep the healthy ones.
    ///
    /// Order is preserved. A duplicate name loses to the first occurrence, and
    /// a health check that does not answer within `timeout` counts as failed.
    pub async fn admit(candidates: Vec<Arc<dyn StorageBackend>>, timeout: Duration) -> Self {
        let mut seen = HashSet::new();
        let mut unique = Vec::new();
        let mut excluded = Vec::new();

        for backend in candidates {
            if seen.insert(backend.name().to_string()) {
                unique.push(backend);
            } else {
                warn!(backend = %backend.name(), "Duplicate storage backend name ignored");
                excluded.push(ExcludedBackend {
                    name: backend.name().to_string(),
                    kind: backend.kind(),
                    reason: "duplicate backend name".to_string(),
                });
            }
        }

        let checks = unique.iter().map(|backend| {
            let backend = Arc::clone(backend);
            async move {
                match tokio::time::timeout(timeout, backend.health_check()).await {
                    Ok(result) => result,
                    Err(_) => Err(StorageError::Timeout(timeout)),
                }
            }
        });
        let results = join_all(checks).await;

        let mut backends = Vec::new();
        for (backend, result) in unique.into_iter().zip(results) {
            match result {
                Ok(()) => {
                    info!(
                        backend = %backend.name(),
                        kind = backend.kind(),
                        "Storage backend initialized successfully"
                    );
                    backends.push(backend);
                }
                Err(e) => {
                    warn!(
                        backend = %backend.name(),
                        kind = backend.kind(),
                        error_kind = %e.kind(),
                        error = %e,
                        "Storage backend failed health check"
                    );
                    excluded.push(ExcludedBackend {
                        name: backend.name().to_string(),
                        kind: backend.kind(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        if backends.is_empty() {
            warn!("No storage backends available - running without durable backup");
        }

        Self { backends, excluded }
    }

    /// Backends in registry order.
    ///
    /// The registry never changes after construction, so the returned
    /// vector is a complete snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Arc<dyn StorageBackend>> {
        self.backends.clone()
    }

    /// Look up a backend by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<dyn StorageBackend>> {
        self.backends.iter().find(|b| b.name() == name)
    }

    /// Backend names in registry order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.backends.iter().map(|b| b.name()).collect()
    }

    /// Number of healthy backends.
    #[must_use]
    pub fn len(&self) -> usize {
        self.backends.len()
    }

    /// Whether no backend is available.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    /// Backends left out at startup.
    #[must_use]
    pub fn excluded(&self) -> &[ExcludedBackend] {
        &self.excluded
    }

    /// Status of every configured backend, available ones first.
    #[must_use]
    pub fn status(&self) -> Vec<BackendStatus> {
        self.backends
            .iter()
            .map(|b| BackendStatus {
                name: b.name().to_string(),
                kind: b.kind(),
                available: true,
                reason: None,
            })
            .chain(self.excluded.iter().map(|e| BackendStatus {
                name: e.name.clone(),
                kind: e.kind,
                available: false,
                reason: Some(e.reason.clone()),
            }))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::fake::FakeBackend;
    use qrcloud_shared::config::StorageProvider;

    #[tokio::test]
    async fn test_admit_excludes_unhealthy_backends() {
        let registry = BackendRegistry::admit(
            vec![
                FakeBackend::healthy("s3").into_dyn(),
                FakeBackend::unhealthy("azure").into_dyn(),
            ],
            Duration::from_millis(200),
        )
        .await;

        assert_eq!(registry.names(), vec!["s3"]);
        assert_eq!(registry.excluded().len(), 1);
        assert_eq!(registry.excluded()[0].name, "azure");
    }

    #[tokio::test]
    async fn test_admit_excludes_health_check_timeout() {
        let registry = BackendRegistry::admit(
            vec![
                FakeBackend::healthy("s3").into_dyn(),
                FakeBackend::healthy("slow")
                    .with_health_delay(Duration::from_secs(5))
                    .into_dyn(),
            ],
            Duration::from_millis(50),
        )
        .await;

        assert_eq!(registry.names(), vec!["s3"]);
        assert!(registry.excluded()[0].reason.contains("timed out"));
    }

    #[tokio::test]
    async fn test_admit_rejects_duplicate_names() {
        let registry = BackendRegistry::admit(
            vec![
                FakeBackend::healthy("s3").into_dyn(),
                FakeBackend::healthy("s3").into_dyn(),
            ],
            Duration::from_millis(200),
        )
        .await;

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.excluded()[0].reason, "duplicate backend name");
    }

    #[tokio::test]
    async fn test_admit_preserves_order() {
        let registry = BackendRegistry::admit(
            vec![
                FakeBackend::healthy("b")
                    .with_health_delay(Duration::from_millis(30))
                    .into_dyn(),
                FakeBackend::healthy("a").into_dyn(),
                FakeBackend::healthy("c").into_dyn(),
            ],
            Duration::from_secs(1),
        )
        .await;

        assert_eq!(registry.names(), vec!["b", "a", "c"]);
    }

    #[tokio::test]
    async fn test_build_with_no_healthy_backends_is_valid() {
        let configs = vec![
            BackendConfig::new("aws", StorageProvider::s3("", "bucket", "", "", "us-east-1")),
            BackendConfig::new("azure", StorageProvider::azure_blob("", "", "")),
        ];
        let registry = BackendRegistry::build(configs, &StorageOptions::default()).await;

        assert!(registry.is_empty());
        assert_eq!(registry.excluded().len(), 2);
        let status = registry.status();
        assert!(status.iter().all(|s| !s.available));
    }

    #[tokio::test]
    async fn test_build_skips_disabled_and_keeps_memory() {
        let configs = vec![
            BackendConfig::new("scratch", StorageProvider::Memory),
            BackendConfig::new("off", StorageProvider::Memory).with_enabled(false),
        ];
        let registry = BackendRegistry::build(configs, &StorageOptions::default()).await;

        assert_eq!(registry.names(), vec!["scratch"]);
        assert!(registry.excluded().is_empty());
        assert!(registry.get("scratch").is_some());
        assert!(registry.get("off").is_none());
    }

    #[tokio::test]
    async fn test_status_lists_available_then_excluded() {
        let registry = BackendRegistry::admit(
            vec![
                FakeBackend::unhealthy("azure").into_dyn(),
                FakeBackend::healthy("s3").into_dyn(),
            ],
            Duration::from_millis(200),
        )
        .await;

        let status = registry.status();
        assert_eq!(status[0].name, "s3");
        assert!(status[0].available);
        assert_eq!(status[1].name, "azure");
        assert!(status[1].reason.is_some());
    }
}
