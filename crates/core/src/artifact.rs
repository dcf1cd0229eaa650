//! Generated artifacts handed to the upload coordinator.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use qrcloud_shared::types::ArtifactId;

/// An immutable generated payload.
///
/// Once built, nothing about an artifact changes; it is shared with every
/// in-flight backend call behind an `Arc`.
#[derive(Debug, Clone)]
pub struct Artifact {
    id: ArtifactId,
    bytes: Bytes,
    content_type: String,
    extension: String,
    created_at: DateTime<Utc>,
}

impl Artifact {
    /// Create an artifact with a fresh id.
    #[must_use]
    pub fn new(
        bytes: impl Into<Bytes>,
        content_type: impl Into<String>,
        extension: impl Into<String>,
    ) -> Self {
        Self::with_id(ArtifactId::new(), bytes, content_type, extension)
    }

    /// Create an artifact with a caller-chosen id.
    #[must_use]
    pub fn with_id(
        id: ArtifactId,
        bytes: impl Into<Bytes>,
        content_type: impl Into<String>,
        extension: impl Into<String>,
    ) -> Self {
        Self {
            id,
            bytes: bytes.into(),
            content_type: content_type.into(),
            extension: extension.into().to_ascii_lowercase(),
            created_at: Utc::now(),
        }
    }

    /// Artifact id.
    #[must_use]
    pub fn id(&self) -> ArtifactId {
        self.id
    }

    /// Payload bytes. Cloning is a reference count bump.
    #[must_use]
    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    /// MIME type of the payload.
    #[must_use]
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// File extension without the dot, lowercase.
    #[must_use]
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Creation timestamp.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Payload size in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the payload is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Object key for this artifact under `prefix`.
    ///
    /// Format: `{prefix}/{artifact_id}.{extension}`
    #[must_use]
    pub fn storage_key(&self, prefix: &str) -> String {
        storage_key(prefix, self.id, &self.extension)
    }
}

/// Object key for an artifact id and extension.
#[must_use]
pub fn storage_key(prefix: &str, id: ArtifactId, extension: &str) -> String {
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        format!("{id}.{extension}")
    } else {
        format!("{prefix}/{id}.{extension}")
    }
}
