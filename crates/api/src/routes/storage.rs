//! Storage status route.

use axum::{Json, Router, extract::State, routing::get};
use qrcloud_core::storage::BackendStatus;
use serde::Serialize;

use crate::AppState;

/// Registry status response.
#[derive(Debug, Serialize)]
pub struct StorageStatusResponse {
    /// Number of backends receiving uploads.
    pub available: usize,
    /// True when no backend is available.
    pub degraded: bool,
    /// Every configured backend, available ones first.
    pub backends: Vec<BackendStatus>,
}

/// GET `/storage/status`
async fn storage_status(State(state): State<AppState>) -> Json<StorageStatusResponse> {
    Json(StorageStatusResponse {
        available: state.registry.len(),
        degraded: state.registry.is_empty(),
        backends: state.registry.status(),
    })
}

/// Creates storage routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/storage/status", get(storage_status))
}
