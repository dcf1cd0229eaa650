//! Health check endpoints.

use std::collections::BTreeMap;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;

use crate::AppState;

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    /// `healthy` with at least one backend, `degraded` without.
    pub status: &'static str,
    /// Time of the check.
    pub timestamp: DateTime<Utc>,
    /// Service version.
    pub version: &'static str,
    /// Availability of each configured backend.
    pub services: BTreeMap<String, &'static str>,
}

/// GET `/` - service banner.
pub async fn banner() -> impl IntoResponse {
    Json(json!({
        "message": "qrcloud QR code service",
        "version": env!("CARGO_PKG_VERSION"),
        "health": "/api/v1/health",
    }))
}

/// Health check handler.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let services = state
        .registry
        .status()
        .into_iter()
        .map(|s| {
            let label = if s.available { "available" } else { "unavailable" };
            (s.name, label)
        })
        .collect();

    Json(HealthResponse {
        status: if state.registry.is_empty() {
            "degraded"
        } else {
            "healthy"
        },
        timestamp: Utc::now(),
        version: env!("CARGO_PKG_VERSION"),
        services,
    })
}

/// Readiness probe: ready once at least one backend can store artifacts.
async fn readiness(State(state): State<AppState>) -> Response {
    if state.registry.is_empty() {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "not_ready",
                "reason": "no storage backend available",
            })),
        )
            .into_response()
    } else {
        Json(json!({ "status": "ready", "backends": state.registry.len() })).into_response()
    }
}

/// Liveness probe.
async fn liveness() -> impl IntoResponse {
    Json(json!({ "status": "alive", "timestamp": Utc::now() }))
}

/// Creates health check routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/health/ready", get(readiness))
        .route("/health/live", get(liveness))
}
