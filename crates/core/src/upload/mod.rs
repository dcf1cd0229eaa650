//! Multi-backend upload fan-out.
//!
//! The coordinator takes one artifact, dispatches a `put` to every backend in
//! the registry at the same time, waits for all of them, and returns an
//! [`UploadResult`] with one outcome per backend.

mod coordinator;
mod error;
mod result;

pub use coordinator::{CoordinatorConfig, UploadCoordinator, UploadState};
pub use error::UploadError;
pub use result::{BackendOutcome, OutcomeStatus, UploadResult};
