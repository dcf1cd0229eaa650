//! Storage configuration types.

use std::time::Duration;

use qrcloud_shared::config::{StorageProvider, StorageSettings};

/// One backend as the registry sees it.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Stable backend name used in results.
    pub name: String,
    /// Provider and credentials.
    pub provider: StorageProvider,
    /// Disabled backends are never constructed.
    pub enabled: bool,
}

impl BackendConfig {
    /// Create an enabled backend config.
    #[must_use]
    pub fn new(name: impl Into<String>, provider: StorageProvider) -> Self {
        Self {
            name: name.into(),
            provider,
            enabled: true,
        }
    }

    /// Set whether the backend is enabled.
    #[must_use]
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Backend configs in registry order: priority, then name.
    #[must_use]
    pub fn from_settings(settings: &StorageSettings) -> Vec<Self> {
        let mut entries: Vec<_> = settings.backends.iter().collect();
        entries.sort_by(|(a_name, a), (b_name, b)| {
            a.priority.cmp(&b.priority).then_with(|| a_name.cmp(b_name))
        });

        entries
            .into_iter()
            .map(|(name, backend)| Self {
                name: name.clone(),
                provider: backend.provider.clone(),
                enabled: backend.enabled,
            })
            .collect()
    }
}

/// Settings shared by every backend.
#[derive(Debug, Clone)]
pub struct StorageOptions {
    /// Key prefix for stored artifacts.
    pub key_prefix: String,
    /// Presigned retrieval URL TTL.
    pub url_ttl: Duration,
    /// Startup health check timeout.
    pub health_check_timeout: Duration,
}

impl StorageOptions {
    /// Default key prefix.
    pub const DEFAULT_KEY_PREFIX: &'static str = "qr-codes";
    /// Default URL TTL: 1 hour.
    pub const DEFAULT_URL_TTL: Duration = Duration::from_secs(3600);
    /// Default health check timeout: 3 seconds.
    pub const DEFAULT_HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(3);

    /// Build from loaded settings.
    #[must_use]
    pub fn from_settings(settings: &StorageSettings) -> Self {
        Self {
            key_prefix: settings.key_prefix.clone(),
            url_ttl: Duration::from_secs(settings.url_ttl_secs),
            health_check_timeout: Duration::from_secs(settings.health_check_timeout_secs),
        }
    }

    /// Set the key prefix.
    #[must_use]
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    /// Set the health check timeout.
    #[must_use]
    pub fn with_health_check_timeout(mut self, timeout: Duration) -> Self {
        self.health_check_timeout = timeout;
        self
    }
}

impl Default for StorageOptions {
    fn default() -> Self {
        Self {
            key_prefix: Self::DEFAULT_KEY_PREFIX.to_string(),
            url_ttl: Self::DEFAULT_URL_TTL,
            health_check_timeout: Self::DEFAULT_HEALTH_CHECK_TIMEOUT,
        }
    }
}
