//! Aggregate upload results.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use qrcloud_shared::types::ArtifactId;
use serde::{Deserialize, Serialize};

use crate::storage::{ErrorKind, StorageError, StoredObject};

/// Whether one backend stored the artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OutcomeStatus {
    /// Stored; `url` is caller-usable, `key` locates the object.
    Success {
        /// Retrieval URL.
        url: String,
        /// Object key.
        key: String,
    },
    /// Not stored.
    Failure {
        /// Failure classification.
        error: ErrorKind,
        /// Human-readable detail, free of credentials.
        message: String,
    },
}

/// Outcome of one backend's `put`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendOutcome {
    /// Success or failure.
    #[serde(flatten)]
    pub status: OutcomeStatus,
    /// Time from dispatch to settlement.
    pub latency_ms: u64,
}

impl BackendOutcome {
    /// Build an outcome from a settled `put`.
    #[must_use]
    pub fn from_result(result: Result<StoredObject, StorageError>, latency: Duration) -> Self {
        let status = match result {
            Ok(stored) => OutcomeStatus::Success {
                url: stored.url,
                key: stored.key,
            },
            Err(e) => OutcomeStatus::Failure {
                error: e.kind(),
                message: e.to_string(),
            },
        };
        Self {
            status,
            latency_ms: u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
        }
    }

    /// Whether the backend stored the artifact.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self.status, OutcomeStatus::Success { .. })
    }

    /// Retrieval URL on success.
    #[must_use]
    pub fn url(&self) -> Option<&str> {
        match &self.status {
            OutcomeStatus::Success { url, .. } => Some(url),
            OutcomeStatus::Failure { .. } => None,
        }
    }

    /// Object key on success.
    #[must_use]
    pub fn key(&self) -> Option<&str> {
        match &self.status {
            OutcomeStatus::Success { key, .. } => Some(key),
            OutcomeStatus::Failure { .. } => None,
        }
    }

    /// Failure classification on failure.
    #[must_use]
    pub fn error_kind(&self) -> Option<ErrorKind> {
        match &self.status {
            OutcomeStatus::Success { .. } => None,
            OutcomeStatus::Failure { error, .. } => Some(*error),
        }
    }

    /// Label for logs: `success` or the error kind.
    #[must_use]
    pub fn label(&self) -> &'static str {
        self.error_kind().map_or("success", |k| k.as_str())
    }
}

/// Complete picture of one fan-out.
///
/// Holds exactly one outcome per backend that was registered when the upload
/// started. Serializable so a metadata store can persist it for later
/// downloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResult {
    artifact_id: ArtifactId,
    content_type: String,
    backend_order: Vec<String>,
    outcomes: BTreeMap<String, BackendOutcome>,
    degraded: bool,
    started_at: DateTime<Utc>,
    completed_at: DateTime<Utc>,
}

impl UploadResult {
    /// Result for an upload that found no backends.
    #[must_use]
    pub fn degraded(
        artifact_id: ArtifactId,
        content_type: impl Into<String>,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            artifact_id,
            content_type: content_type.into(),
            backend_order: Vec::new(),
            outcomes: BTreeMap::new(),
            degraded: true,
            started_at,
            completed_at: Utc::now(),
        }
    }

    /// Result from settled outcomes in registry order.
    #[must_use]
    pub fn completed(
        artifact_id: ArtifactId,
        content_type: impl Into<String>,
        ordered: Vec<(String, BackendOutcome)>,
        started_at: DateTime<Utc>,
    ) -> Self {
        let backend_order = ordered.iter().map(|(name, _)| name.clone()).collect();
        let outcomes: BTreeMap<_, _> = ordered.into_iter().collect();
        Self {
            artifact_id,
            content_type: content_type.into(),
            backend_order,
            degraded: outcomes.is_empty(),
            outcomes,
            started_at,
            completed_at: Utc::now(),
        }
    }

    /// Originating artifact.
    #[must_use]
    pub fn artifact_id(&self) -> ArtifactId {
        self.artifact_id
    }

    /// Content type of the stored artifact.
    #[must_use]
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Outcomes keyed by backend name.
    #[must_use]
    pub fn outcomes(&self) -> &BTreeMap<String, BackendOutcome> {
        &self.outcomes
    }

    /// Outcome for one backend.
    #[must_use]
    pub fn outcome(&self, backend: &str) -> Option<&BackendOutcome> {
        self.outcomes.get(backend)
    }

    /// Backend names in registry order at snapshot time.
    #[must_use]
    pub fn backend_order(&self) -> &[String] {
        &self.backend_order
    }

    /// True when no backend was registered.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    /// Fan-out start time.
    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Fan-out completion time.
    #[must_use]
    pub fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }

    /// Successful backends in registry order, as `(name, outcome)`.
    pub fn successes(&self) -> impl Iterator<Item = (&str, &BackendOutcome)> {
        self.backend_order.iter().filter_map(|name| {
            self.outcomes
                .get(name)
                .filter(|o| o.is_success())
                .map(|o| (name.as_str(), o))
        })
    }

    /// First successful backend in registry order.
    ///
    /// Depends only on registry order and outcomes, never on which backend
    /// finished first.
    #[must_use]
    pub fn canonical_backend(&self) -> Option<&str> {
        self.successes().next().map(|(name, _)| name)
    }

    /// URL of the canonical backend.
    #[must_use]
    pub fn canonical_url(&self) -> Option<&str> {
        self.successes().next().and_then(|(_, o)| o.url())
    }

    /// URL stored by `backend`, if it succeeded.
    #[must_use]
    pub fn url_for(&self, backend: &str) -> Option<&str> {
        self.outcomes.get(backend).and_then(BackendOutcome::url)
    }

    /// Number of backends that stored the artifact.
    #[must_use]
    pub fn success_count(&self) -> usize {
        self.outcomes.values().filter(|o| o.is_success()).count()
    }

    /// Whether the artifact is stored nowhere.
    #[must_use]
    pub fn is_unstored(&self) -> bool {
        self.success_count() == 0
    }
}
