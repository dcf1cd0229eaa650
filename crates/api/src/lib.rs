//! HTTP API layer with Axum routes.
//!
//! This crate provides:
//! - REST API routes for QR generation, download and storage inspection
//! - Health and readiness probes
//! - Error-to-response mapping

pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::{Router, routing::get};
use qrcloud_core::encoder::QrEncoder;
use qrcloud_core::retrieval::{ArtifactRetriever, InMemoryResultStore};
use qrcloud_core::storage::BackendRegistry;
use qrcloud_core::upload::{CoordinatorConfig, UploadCoordinator};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// QR renderer.
    pub encoder: QrEncoder,
    /// Healthy storage backends, fixed at startup.
    pub registry: Arc<BackendRegistry>,
    /// Multi-backend upload fan-out.
    pub coordinator: Arc<UploadCoordinator>,
    /// Download and purge over recorded upload results.
    pub retriever: Arc<ArtifactRetriever<InMemoryResultStore>>,
}

impl AppState {
    /// Wire the services around one registry.
    pub fn new(
        registry: Arc<BackendRegistry>,
        config: CoordinatorConfig,
        store: InMemoryResultStore,
    ) -> Self {
        let read_timeout = config.put_timeout;
        let coordinator = UploadCoordinator::new(Arc::clone(&registry), config);
        let retriever = ArtifactRetriever::new(Arc::clone(&registry), Arc::new(store))
            .with_timeout(read_timeout);
        Self {
            encoder: QrEncoder::new(),
            registry,
            coordinator: Arc::new(coordinator),
            retriever: Arc::new(retriever),
        }
    }
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(routes::health::banner))
        .nest("/api/v1", routes::api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use axum::body::{Body, Bytes};
    use axum::http::Request;
    use http_body_util::BodyExt;
    use qrcloud_core::Artifact;
    use qrcloud_core::storage::{
        BackendConfig, ObjectStoreBackend, StorageBackend, StorageError, StorageOptions,
        StoredObject,
    };
    use qrcloud_shared::config::StorageProvider;
    use tower::ServiceExt;

    /// Router over in-memory backends with the given names.
    pub(crate) async fn app(backends: &[&str]) -> (Router, AppState) {
        app_with(backends, CoordinatorConfig::default()).await
    }

    /// Same as [`app`] with a custom coordinator configuration.
    pub(crate) async fn app_with(backends: &[&str], config: CoordinatorConfig) -> (Router, AppState) {
        let configs = backends
            .iter()
            .map(|name| BackendConfig::new(*name, StorageProvider::Memory))
            .collect();
        let registry = BackendRegistry::build(configs, &StorageOptions::default()).await;
        let state = AppState::new(Arc::new(registry), config, InMemoryResultStore::default());
        (create_router(state.clone()), state)
    }

    /// Router over already constructed backends.
    pub(crate) async fn app_over(backends: Vec<Arc<dyn StorageBackend>>) -> (Router, AppState) {
        let registry = BackendRegistry::admit(backends, Duration::from_secs(1)).await;
        let state = AppState::new(
            Arc::new(registry),
            CoordinatorConfig::default(),
            InMemoryResultStore::default(),
        );
        (create_router(state.clone()), state)
    }

    /// In-memory backend that counts the objects written to it.
    pub(crate) struct CountingBackend {
        inner: ObjectStoreBackend,
        puts: AtomicUsize,
    }

    impl CountingBackend {
        pub(crate) fn new(name: &str) -> Arc<Self> {
            let config = BackendConfig::new(name, StorageProvider::Memory);
            let inner = ObjectStoreBackend::from_config(&config, &StorageOptions::default())
                .unwrap();
            Arc::new(Self {
                inner,
                puts: AtomicUsize::new(0),
            })
        }

        pub(crate) fn put_count(&self) -> usize {
            self.puts.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl StorageBackend for CountingBackend {
        fn name(&self) -> &str {
            self.inner.name()
        }

        fn kind(&self) -> &'static str {
            self.inner.kind()
        }

        async fn put(&self, artifact: &Artifact) -> Result<StoredObject, StorageError> {
            self.puts.fetch_add(1, Ordering::SeqCst);
            self.inner.put(artifact).await
        }

        async fn get(&self, key: &str) -> Result<Bytes, StorageError> {
            self.inner.get(key).await
        }

        async fn delete(&self, key: &str) -> Result<(), StorageError> {
            self.inner.delete(key).await
        }

        async fn health_check(&self) -> Result<(), StorageError> {
            self.inner.health_check().await
        }
    }

    /// Send a request and return status plus body bytes.
    pub(crate) async fn send(
        router: &Router,
        request: Request<Body>,
    ) -> (axum::http::StatusCode, axum::http::HeaderMap, Vec<u8>) {
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, headers, body.to_vec())
    }

    /// Send a request and parse the body as JSON.
    pub(crate) async fn send_json(
        router: &Router,
        request: Request<Body>,
    ) -> (axum::http::StatusCode, serde_json::Value) {
        let (status, _, body) = send(router, request).await;
        (status, serde_json::from_slice(&body).unwrap())
    }

    /// JSON POST request.
    pub(crate) fn post_json(uri: &str, body: &serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    /// GET request.
    pub(crate) fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }
}
