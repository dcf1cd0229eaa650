//! Retrieval error types.

use qrcloud_shared::types::ArtifactId;
use thiserror::Error;

use crate::storage::StorageError;

/// Retrieval and purge errors.
#[derive(Debug, Error)]
pub enum RetrievalError {
    /// No upload result is recorded for the artifact.
    #[error("no upload recorded for artifact {0}")]
    NotFound(ArtifactId),

    /// The upload succeeded on no backend.
    #[error("artifact {0} has no stored copies")]
    NotStored(ArtifactId),

    /// Every backend holding a copy failed to serve it.
    #[error("no backend could serve artifact {artifact_id}")]
    Unavailable {
        /// The artifact requested.
        artifact_id: ArtifactId,
        /// Backends tried, in order, with their errors.
        attempts: Vec<(String, StorageError)>,
    },

    /// Result store operation failed.
    #[error("result store error: {0}")]
    Store(String),
}

impl RetrievalError {
    /// Create a result store error.
    #[must_use]
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }
}
