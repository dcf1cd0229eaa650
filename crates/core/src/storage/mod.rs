//! Object storage backends using Apache OpenDAL.
//!
//! This module provides vendor-agnostic object storage with support for:
//! - AWS S3 and S3-compatible stores
//! - Azure Blob Storage
//! - Local filesystem (development only)
//! - In-process memory (tests and demos)
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                       BackendRegistry                           │
//! │        (built once, health-checked, immutable afterwards)       │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  Arc<dyn StorageBackend>  │  Arc<dyn StorageBackend>  │  ...     │
//! │  ObjectStoreBackend (s3)  │  ObjectStoreBackend (az)  │          │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

mod backend;
mod config;
mod error;
#[cfg(test)]
pub(crate) mod fake;
mod registry;

pub use backend::{ObjectStoreBackend, StorageBackend, StoredObject};
pub use config::{BackendConfig, StorageOptions};
pub use error::{ErrorKind, StorageError};
pub use registry::{BackendRegistry, BackendStatus, ExcludedBackend};
