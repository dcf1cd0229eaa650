//! Application configuration management.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Upload coordinator configuration.
    #[serde(default)]
    pub upload: UploadSettings,
    /// Storage backend configuration.
    #[serde(default)]
    pub storage: StorageSettings,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

/// Upload coordinator configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadSettings {
    /// Per-backend put timeout in seconds.
    #[serde(default = "default_upload_timeout")]
    pub timeout_secs: u64,
    /// Maximum artifact size in bytes.
    #[serde(default = "default_max_artifact_size")]
    pub max_artifact_size: u64,
    /// Content types accepted for upload.
    #[serde(default = "default_allowed_content_types")]
    pub allowed_content_types: Vec<String>,
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self {
            timeout_secs: default_upload_timeout(),
            max_artifact_size: default_max_artifact_size(),
            allowed_content_types: default_allowed_content_types(),
        }
    }
}

fn default_upload_timeout() -> u64 {
    5
}

fn default_max_artifact_size() -> u64 {
    10 * 1024 * 1024 // 10MB
}

fn default_allowed_content_types() -> Vec<String> {
    vec![
        "image/png".to_string(),
        "image/svg+xml".to_string(),
    ]
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageSettings {
    /// Key prefix for stored artifacts.
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
    /// Presigned retrieval URL TTL in seconds.
    #[serde(default = "default_url_ttl")]
    pub url_ttl_secs: u64,
    /// Startup health check timeout in seconds.
    #[serde(default = "default_health_check_timeout")]
    pub health_check_timeout_secs: u64,
    /// How long upload results stay retrievable, in seconds.
    #[serde(default = "default_result_ttl")]
    pub result_ttl_secs: u64,
    /// Maximum number of upload results kept.
    #[serde(default = "default_result_capacity")]
    pub result_capacity: u64,
    /// Configured backends keyed by name.
    #[serde(default)]
    pub backends: BTreeMap<String, BackendSettings>,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            key_prefix: default_key_prefix(),
            url_ttl_secs: default_url_ttl(),
            health_check_timeout_secs: default_health_check_timeout(),
            result_ttl_secs: default_result_ttl(),
            result_capacity: default_result_capacity(),
            backends: BTreeMap::new(),
        }
    }
}

fn default_key_prefix() -> String {
    "qr-codes".to_string()
}

fn default_url_ttl() -> u64 {
    3600 // 1 hour
}

fn default_health_check_timeout() -> u64 {
    3
}

fn default_result_ttl() -> u64 {
    86400 // 1 day
}

fn default_result_capacity() -> u64 {
    10_000
}

/// One configured storage backend.
#[derive(Debug, Clone, Deserialize)]
pub struct BackendSettings {
    /// Whether the backend should be registered at all.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Registry position; lower comes first, ties break on name.
    #[serde(default)]
    pub priority: u32,
    /// Provider and credentials.
    pub provider: StorageProvider,
}

fn default_enabled() -> bool {
    true
}

impl BackendSettings {
    /// Create enabled settings with priority 0.
    #[must_use]
    pub fn new(provider: StorageProvider) -> Self {
        Self {
            enabled: true,
            priority: 0,
            provider,
        }
    }

    /// Set the registry priority.
    #[must_use]
    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }

    /// Set whether the backend is enabled.
    #[must_use]
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

/// Storage provider configuration.
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StorageProvider {
    /// AWS S3 or an S3-compatible store.
    S3 {
        /// Custom endpoint URL; empty means the AWS default for the region.
        #[serde(default)]
        endpoint: String,
        /// S3 bucket name.
        bucket: String,
        /// AWS access key ID.
        access_key_id: String,
        /// AWS secret access key.
        secret_access_key: String,
        /// AWS region.
        region: String,
    },
    /// Azure Blob Storage
    AzureBlob {
        /// Azure storage account name.
        account: String,
        /// Azure storage access key.
        access_key: String,
        /// Azure container name.
        container: String,
    },
    /// Local filesystem (development only)
    LocalFs {
        /// Root directory path.
        root: PathBuf,
    },
    /// In-process memory store (tests and demos)
    Memory,
}

impl StorageProvider {
    /// Create an S3 provider.
    #[must_use]
    pub fn s3(
        endpoint: impl Into<String>,
        bucket: impl Into<String>,
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        region: impl Into<String>,
    ) -> Self {
        Self::S3 {
            endpoint: endpoint.into(),
            bucket: bucket.into(),
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            region: region.into(),
        }
    }

    /// Create Azure Blob Storage provider.
    #[must_use]
    pub fn azure_blob(
        account: impl Into<String>,
        access_key: impl Into<String>,
        container: impl Into<String>,
    ) -> Self {
        Self::AzureBlob {
            account: account.into(),
            access_key: access_key.into(),
            container: container.into(),
        }
    }

    /// Create local filesystem provider (development only).
    #[must_use]
    pub fn local_fs(root: impl Into<PathBuf>) -> Self {
        Self::LocalFs { root: root.into() }
    }

    /// Provider tag.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::S3 { .. } => "s3",
            Self::AzureBlob { .. } => "azure_blob",
            Self::LocalFs { .. } => "local_fs",
            Self::Memory => "memory",
        }
    }

    /// Get the bucket/container name.
    #[must_use]
    pub fn bucket(&self) -> &str {
        match self {
            Self::S3 { bucket, .. } => bucket,
            Self::AzureBlob { container, .. } => container,
            Self::LocalFs { root } => root.to_str().unwrap_or("local"),
            Self::Memory => "memory",
        }
    }
}

// Credentials never reach log output.
impl fmt::Debug for StorageProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::S3 {
                endpoint,
                bucket,
                region,
                ..
            } => f
                .debug_struct("S3")
                .field("endpoint", endpoint)
                .field("bucket", bucket)
                .field("region", region)
                .field("access_key_id", &"<redacted>")
                .field("secret_access_key", &"<redacted>")
                .finish(),
            Self::AzureBlob {
                account, container, ..
            } => f
                .debug_struct("AzureBlob")
                .field("account", account)
                .field("container", container)
                .field("access_key", &"<redacted>")
                .finish(),
            Self::LocalFs { root } => f.debug_struct("LocalFs").field("root", root).finish(),
            Self::Memory => f.write_str("Memory"),
        }
    }
}

/// Backend name used for the AWS fallback variables.
pub const AWS_BACKEND: &str = "aws";
/// Backend name used for the Azure fallback variables.
pub const AZURE_BACKEND: &str = "azure";

impl StorageSettings {
    /// Fill in backends from the cloud SDK environment variables.
    ///
    /// Only applies when no backend with the same name is configured and the
    /// credentials are present; otherwise nothing is added.
    pub fn apply_cloud_env(&mut self) {
        if !self.backends.contains_key(AWS_BACKEND)
            && let Some(provider) = aws_provider_from_env()
        {
            self.backends
                .insert(AWS_BACKEND.to_string(), BackendSettings::new(provider));
        }

        if !self.backends.contains_key(AZURE_BACKEND)
            && let Some(provider) = azure_provider_from_env()
        {
            self.backends.insert(
                AZURE_BACKEND.to_string(),
                BackendSettings::new(provider).with_priority(1),
            );
        }
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn aws_provider_from_env() -> Option<StorageProvider> {
    let access_key_id = non_empty_env("AWS_ACCESS_KEY_ID")?;
    let secret_access_key = non_empty_env("AWS_SECRET_ACCESS_KEY")?;

    Some(StorageProvider::s3(
        non_empty_env("AWS_ENDPOINT_URL").unwrap_or_default(),
        non_empty_env("AWS_S3_BUCKET").unwrap_or_else(|| "qr-codes-bucket".to_string()),
        access_key_id,
        secret_access_key,
        non_empty_env("AWS_REGION").unwrap_or_else(|| "us-east-1".to_string()),
    ))
}

fn azure_provider_from_env() -> Option<StorageProvider> {
    let container = non_empty_env("AZURE_CONTAINER").unwrap_or_else(|| "qr-codes".to_string());

    if let (Some(account), Some(key)) = (
        non_empty_env("AZURE_STORAGE_ACCOUNT"),
        non_empty_env("AZURE_STORAGE_KEY"),
    ) {
        return Some(StorageProvider::azure_blob(account, key, container));
    }

    let conn = non_empty_env("AZURE_STORAGE_CONNECTION_STRING")?;
    let (account, key) = parse_azure_connection_string(&conn)?;
    Some(StorageProvider::azure_blob(account, key, container))
}

/// Extract `AccountName` and `AccountKey` from an Azure connection string.
fn parse_azure_connection_string(conn: &str) -> Option<(String, String)> {
    let mut account = None;
    let mut key = None;

    for part in conn.split(';') {
        // Keys are base64 and may contain '='.
        let Some((name, value)) = part.split_once('=') else {
            continue;
        };
        match name.trim() {
            "AccountName" => account = Some(value.trim().to_string()),
            "AccountKey" => key = Some(value.trim().to_string()),
            _ => {}
        }
    }

    Some((account?, key?))
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("QRCLOUD").separator("__"))
            .build()?;

        let mut app: Self = config.try_deserialize()?;
        app.storage.apply_cloud_env();
        Ok(app)
    }
}
