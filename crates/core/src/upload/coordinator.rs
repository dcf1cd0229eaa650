//! Concurrent fan-out of one artifact to every registered backend.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use futures::future::join_all;
use qrcloud_shared::config::UploadSettings;
use tracing::{debug, info, warn};

use super::error::UploadError;
use super::result::{BackendOutcome, UploadResult};
use crate::artifact::Artifact;
use crate::storage::{BackendRegistry, StorageError};

/// Lifecycle of a single upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadState {
    /// Validated, not yet dispatched.
    Pending,
    /// Backend calls dispatched, waiting for all to settle.
    InFlight,
    /// Every backend settled.
    Completed,
}

impl fmt::Display for UploadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pending => "pending",
            Self::InFlight => "in_flight",
            Self::Completed => "completed",
        })
    }
}

/// Coordinator configuration.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Per-backend put timeout.
    pub put_timeout: Duration,
    /// Maximum artifact size in bytes.
    pub max_artifact_size: u64,
    /// Allowed content types.
    pub allowed_content_types: Vec<String>,
}

impl CoordinatorConfig {
    /// Default put timeout: 5 seconds.
    pub const DEFAULT_PUT_TIMEOUT: Duration = Duration::from_secs(5);
    /// Default max artifact size: 10MB.
    pub const DEFAULT_MAX_ARTIFACT_SIZE: u64 = 10 * 1024 * 1024;

    /// Build from loaded settings.
    #[must_use]
    pub fn from_settings(settings: &UploadSettings) -> Self {
        Self {
            put_timeout: Duration::from_secs(settings.timeout_secs),
            max_artifact_size: settings.max_artifact_size,
            allowed_content_types: settings.allowed_content_types.clone(),
        }
    }

    /// Set per-backend put timeout.
    #[must_use]
    pub fn with_put_timeout(mut self, timeout: Duration) -> Self {
        self.put_timeout = timeout;
        self
    }

    /// Set maximum artifact size.
    #[must_use]
    pub fn with_max_artifact_size(mut self, size: u64) -> Self {
        self.max_artifact_size = size;
        self
    }

    /// Set allowed content types.
    #[must_use]
    pub fn with_allowed_content_types(mut self, types: Vec<String>) -> Self {
        self.allowed_content_types = types;
        self
    }

    /// Check if a content type is allowed.
    #[must_use]
    pub fn is_content_type_allowed(&self, content_type: &str) -> bool {
        self.allowed_content_types.iter().any(|t| t == content_type)
    }

    /// Validate an artifact against size and content type constraints.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArtifact` if the artifact is empty, too large, or of a
    /// disallowed content type.
    pub fn validate(&self, artifact: &Artifact) -> Result<(), UploadError> {
        if artifact.is_empty() {
            return Err(UploadError::empty());
        }

        let size = artifact.len() as u64;
        if size > self.max_artifact_size {
            return Err(UploadError::too_large(size, self.max_artifact_size));
        }

        if !self.is_content_type_allowed(artifact.content_type()) {
            return Err(UploadError::content_type_not_allowed(
                artifact.content_type(),
            ));
        }

        Ok(())
    }
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self::from_settings(&UploadSettings::default())
    }
}

/// Places one artifact in every registered backend.
///
/// Backends are called concurrently, each under its own timeout, and the
/// coordinator waits for all of them before returning. Backend failures are
/// reported in the result and never fail the call.
#[derive(Debug, Clone)]
pub struct UploadCoordinator {
    registry: Arc<BackendRegistry>,
    config: CoordinatorConfig,
}

impl UploadCoordinator {
    /// Create a coordinator over a registry.
    #[must_use]
    pub fn new(registry: Arc<BackendRegistry>, config: CoordinatorConfig) -> Self {
        Self { registry, config }
    }

    /// The registry uploads fan out to.
    #[must_use]
    pub fn registry(&self) -> &Arc<BackendRegistry> {
        &self.registry
    }

    /// Coordinator configuration.
    #[must_use]
    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Upload an artifact to every registered backend.
    ///
    /// Returns once every backend has settled or timed out, so latency is
    /// bounded by `put_timeout` rather than the sum of backend latencies.
    /// Dropping the returned future detaches in-flight puts; they finish in
    /// the background.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArtifact` before any backend is contacted if the
    /// artifact fails validation.
    pub async fn upload(
        &self,
        artifact: impl Into<Arc<Artifact>>,
    ) -> Result<UploadResult, UploadError> {
        let artifact: Arc<Artifact> = artifact.into();
        let artifact_id = artifact.id();

        if let Err(e) = self.config.validate(&artifact) {
            warn!(artifact_id = %artifact_id, error = %e, "Artifact rejected");
            return Err(e);
        }

        let snapshot = self.registry.snapshot();
        let started_at = Utc::now();
        debug!(
            artifact_id = %artifact_id,
            state = %UploadState::Pending,
            backends = snapshot.len(),
            "Upload accepted"
        );

        if snapshot.is_empty() {
            warn!(
                artifact_id = %artifact_id,
                "No storage backends registered - upload degraded"
            );
            return Ok(UploadResult::degraded(
                artifact_id,
                artifact.content_type(),
                started_at,
            ));
        }

        let put_timeout = self.config.put_timeout;
        let dispatched_at = Instant::now();
        let handles: Vec<_> = snapshot
            .iter()
            .map(|backend| {
                let backend = Arc::clone(backend);
                let artifact = Arc::clone(&artifact);
                tokio::spawn(async move {
                    let start = Instant::now();
                    let result = tokio::time::timeout(put_timeout, backend.put(&artifact))
                        .await
                        .unwrap_or(Err(StorageError::Timeout(put_timeout)));
                    (result, start.elapsed())
                })
            })
            .collect();
        debug!(
            artifact_id = %artifact_id,
            state = %UploadState::InFlight,
            "Upload dispatched"
        );

        let settled = join_all(handles).await;

        let mut ordered = Vec::with_capacity(snapshot.len());
        for (backend, joined) in snapshot.iter().zip(settled) {
            let (result, latency) = joined.unwrap_or_else(|e| {
                (
                    Err(StorageError::Internal(e.to_string())),
                    dispatched_at.elapsed(),
                )
            });
            let outcome = BackendOutcome::from_result(result, latency);
            observe(backend.name(), &outcome, &artifact);
            ordered.push((backend.name().to_string(), outcome));
        }

        let result = UploadResult::completed(
            artifact_id,
            artifact.content_type(),
            ordered,
            started_at,
        );
        info!(
            artifact_id = %artifact_id,
            state = %UploadState::Completed,
            succeeded = result.success_count(),
            backends = result.outcomes().len(),
            canonical_url = result.canonical_url().unwrap_or("none"),
            "Upload completed"
        );

        Ok(result)
    }
}

/// Per-backend count/latency observation.
fn observe(backend: &str, outcome: &BackendOutcome, artifact: &Artifact) {
    if outcome.is_success() {
        info!(
            artifact_id = %artifact.id(),
            backend,
            outcome = outcome.label(),
            latency_ms = outcome.latency_ms,
            bytes = artifact.len(),
            "Storage upload observed"
        );
    } else {
        warn!(
            artifact_id = %artifact.id(),
            backend,
            outcome = outcome.label(),
            latency_ms = outcome.latency_ms,
            "Storage upload failed"
        );
    }
}
