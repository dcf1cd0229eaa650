//! Storage error types.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Per-backend failure classification reported in upload outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Credentials rejected or missing permissions.
    AuthFailure,
    /// Provider throttled the request or a quota is exhausted.
    QuotaExceeded,
    /// The call did not settle within its timeout.
    Timeout,
    /// Network or server-side failure that may succeed later.
    TransientNetwork,
    /// The request can never succeed as configured (bad bucket, bad config).
    PermanentRejection,
    /// Object does not exist.
    NotFound,
    /// The backend task itself failed.
    Internal,
}

impl ErrorKind {
    /// Stable snake_case label for logs and responses.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::AuthFailure => "auth_failure",
            Self::QuotaExceeded => "quota_exceeded",
            Self::Timeout => "timeout",
            Self::TransientNetwork => "transient_network",
            Self::PermanentRejection => "permanent_rejection",
            Self::NotFound => "not_found",
            Self::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Storage operation errors.
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    /// Credentials rejected.
    #[error("authentication failed: {0}")]
    AuthFailure(String),

    /// Provider throttled or quota exhausted.
    #[error("quota exceeded: {0}")]
    QuotaExceeded(String),

    /// Call exceeded its time budget.
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    /// Retryable network or server failure.
    #[error("transient network error: {0}")]
    TransientNetwork(String),

    /// Request rejected for good.
    #[error("request rejected: {0}")]
    PermanentRejection(String),

    /// Object not found in storage.
    #[error("object not found: {key}")]
    NotFound {
        /// Storage key that was not found.
        key: String,
    },

    /// Storage provider configuration error.
    #[error("storage configuration error: {0}")]
    Configuration(String),

    /// Backend task panicked or was aborted.
    #[error("backend task failed: {0}")]
    Internal(String),
}

impl StorageError {
    /// Create a not found error.
    #[must_use]
    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound { key: key.into() }
    }

    /// Create a configuration error.
    #[must_use]
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Classification used in upload outcomes.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::AuthFailure(_) => ErrorKind::AuthFailure,
            Self::QuotaExceeded(_) => ErrorKind::QuotaExceeded,
            Self::Timeout(_) => ErrorKind::Timeout,
            Self::TransientNetwork(_) => ErrorKind::TransientNetwork,
            Self::PermanentRejection(_) | Self::Configuration(_) => ErrorKind::PermanentRejection,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }
}

impl From<opendal::Error> for StorageError {
    fn from(err: opendal::Error) -> Self {
        match err.kind() {
            opendal::ErrorKind::NotFound => Self::NotFound {
                key: err.to_string(),
            },
            opendal::ErrorKind::PermissionDenied => Self::AuthFailure(err.to_string()),
            opendal::ErrorKind::RateLimited => Self::QuotaExceeded(err.to_string()),
            opendal::ErrorKind::ConfigInvalid => Self::Configuration(err.to_string()),
            opendal::ErrorKind::Unsupported
            | opendal::ErrorKind::IsADirectory
            | opendal::ErrorKind::NotADirectory
            | opendal::ErrorKind::AlreadyExists
            | opendal::ErrorKind::ConditionNotMatch
            | opendal::ErrorKind::RangeNotSatisfied => Self::PermanentRejection(err.to_string()),
            _ => Self::TransientNetwork(err.to_string()),
        }
    }
}
