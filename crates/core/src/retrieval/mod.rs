//! Retrieval of stored artifacts.
//!
//! Upload results are recorded in a [`ResultStore`]; [`ArtifactRetriever`]
//! reads them back to download an artifact from whichever backend still
//! serves it, or to delete every copy.

mod error;
mod service;
mod store;

pub use error::RetrievalError;
pub use service::{ArtifactRetriever, DEFAULT_READ_TIMEOUT, Download, PurgeReport};
pub use store::{InMemoryResultStore, ResultStore};
