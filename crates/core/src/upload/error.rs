//! Upload error types.

use thiserror::Error;

/// Call-level upload failures.
///
/// Per-backend failures are never reported here; they are values inside
/// [`UploadResult`](super::UploadResult).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UploadError {
    /// Artifact rejected before any backend was contacted.
    #[error("invalid artifact: {reason}")]
    InvalidArtifact {
        /// Why the artifact was rejected.
        reason: String,
    },
}

impl UploadError {
    /// Artifact has no bytes.
    #[must_use]
    pub fn empty() -> Self {
        Self::InvalidArtifact {
            reason: "artifact has no bytes".to_string(),
        }
    }

    /// Artifact exceeds the size limit.
    #[must_use]
    pub fn too_large(size: u64, max: u64) -> Self {
        Self::InvalidArtifact {
            reason: format!("size {size} bytes exceeds maximum allowed {max} bytes"),
        }
    }

    /// Content type is not accepted.
    #[must_use]
    pub fn content_type_not_allowed(content_type: &str) -> Self {
        Self::InvalidArtifact {
            reason: format!("content type '{content_type}' is not allowed"),
        }
    }
}
