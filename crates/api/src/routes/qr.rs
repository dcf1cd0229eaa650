//! QR code generation, download and storage routes.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Multipart, Path, State},
    http::header,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use qrcloud_core::Artifact;
use qrcloud_core::encoder::payload::{ContactCard, WifiNetwork, url_payload};
use qrcloud_core::encoder::{QrFormat, QrOptions};
use qrcloud_core::retrieval::PurgeReport;
use qrcloud_core::upload::UploadResult;
use qrcloud_shared::AppError;
use qrcloud_shared::types::ArtifactId;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::AppState;
use crate::error::ApiError;

/// Largest batch accepted.
pub const MAX_BATCH_ITEMS: usize = 100;

/// Creates the QR routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/qr/generate", post(generate))
        .route("/qr/batch", post(generate_batch))
        .route("/qr/wifi", post(generate_wifi))
        .route("/qr/vcard", post(generate_vcard))
        .route("/qr/url", post(generate_url))
        .route("/qr/upload", post(upload_file))
        .route("/qr/{id}/download", get(download))
        .route("/qr/{id}/storage", get(storage_record))
        .route("/qr/{id}", delete(purge))
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for batch generation.
#[derive(Debug, Deserialize)]
pub struct BatchRequest {
    /// One QR code per item.
    pub items: Vec<String>,
    /// Output format for every item.
    #[serde(default)]
    pub format: QrFormat,
    /// Module size for every item.
    #[serde(default = "default_module_size")]
    pub size: u32,
}

fn default_module_size() -> u32 {
    10
}

/// Request body for a Wi-Fi network QR code.
#[derive(Debug, Deserialize)]
pub struct WifiRequest {
    /// Network credentials.
    #[serde(flatten)]
    pub network: WifiNetwork,
    /// Output format.
    #[serde(default)]
    pub format: QrFormat,
    /// Module size.
    #[serde(default = "default_module_size")]
    pub size: u32,
}

/// Request body for a contact card QR code.
#[derive(Debug, Deserialize)]
pub struct VcardRequest {
    /// Contact details.
    #[serde(flatten)]
    pub card: ContactCard,
    /// Output format.
    #[serde(default)]
    pub format: QrFormat,
    /// Module size.
    #[serde(default = "default_module_size")]
    pub size: u32,
}

/// Request body for a URL QR code.
#[derive(Debug, Deserialize)]
pub struct UrlRequest {
    /// Target URL; a missing scheme becomes `https://`.
    pub url: String,
    /// Output format.
    #[serde(default)]
    pub format: QrFormat,
    /// Module size.
    #[serde(default = "default_module_size")]
    pub size: u32,
}

/// Where a generated QR code ended up.
#[derive(Debug, Serialize)]
pub struct StorageSummary {
    /// URL per configured backend; `null` where the artifact was not stored.
    pub urls: BTreeMap<String, Option<String>>,
    /// URL of the first backend, in registry order, that stored it.
    pub canonical_url: Option<String>,
    /// True when no backend was registered.
    pub degraded: bool,
    /// Present when the artifact was stored nowhere.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// Response for one generated QR code.
#[derive(Debug, Serialize)]
pub struct QrCodeResponse {
    /// Artifact id.
    pub id: ArtifactId,
    /// Encoded payload.
    pub data: String,
    /// Output format.
    pub format: QrFormat,
    /// Module size.
    pub size: u32,
    /// MIME type.
    pub content_type: String,
    /// Rendered size in bytes.
    pub file_size: usize,
    /// Download path on this service.
    pub download_url: String,
    /// Inline copy, usable even when storage failed.
    pub qr_code_base64: String,
    /// Storage placement.
    pub storage: StorageSummary,
    /// Render time.
    pub created_at: DateTime<Utc>,
}

/// Response for a batch.
#[derive(Debug, Serialize)]
pub struct BatchResponse {
    /// Number of QR codes generated.
    pub total: usize,
    /// One entry per item, in request order.
    pub results: Vec<QrCodeResponse>,
}

/// Response for the stored upload record.
#[derive(Debug, Serialize)]
pub struct StorageRecordResponse {
    /// Backend serving downloads by default.
    pub canonical_backend: Option<String>,
    /// Its URL.
    pub canonical_url: Option<String>,
    /// Full per-backend result.
    #[serde(flatten)]
    pub result: UploadResult,
}

/// Response for a purge.
#[derive(Debug, Serialize)]
pub struct PurgeResponse {
    /// Artifact purged.
    pub id: ArtifactId,
    /// Whether every registered copy is gone.
    pub complete: bool,
    /// Per-backend detail.
    #[serde(flatten)]
    pub report: PurgeReport,
}

// ============================================================================
// Helper Functions
// ============================================================================

fn storage_summary(state: &AppState, result: &UploadResult) -> StorageSummary {
    let urls = state
        .registry
        .status()
        .into_iter()
        .map(|s| {
            let url = result.url_for(&s.name).map(str::to_string);
            (s.name, url)
        })
        .collect();

    let warning = if result.is_degraded() {
        Some("No storage backend available; QR code was not stored".to_string())
    } else if result.is_unstored() {
        Some("QR code could not be stored on any backend".to_string())
    } else {
        None
    };

    StorageSummary {
        urls,
        canonical_url: result.canonical_url().map(str::to_string),
        degraded: result.is_degraded(),
        warning,
    }
}

/// Render, upload and record one QR code.
async fn process(state: &AppState, options: QrOptions) -> Result<QrCodeResponse, ApiError> {
    let artifact = Arc::new(state.encoder.encode(&options)?);
    store(state, options, artifact).await
}

/// Upload and record an already rendered QR code.
async fn store(
    state: &AppState,
    options: QrOptions,
    artifact: Arc<Artifact>,
) -> Result<QrCodeResponse, ApiError> {
    let result = state.coordinator.upload(Arc::clone(&artifact)).await?;
    state.retriever.remember(&result).await?;

    if result.is_unstored() {
        warn!(artifact_id = %artifact.id(), "QR code generated but not stored");
    }

    Ok(response_for(state, options, &artifact, &result))
}

/// Prefix validation failures with the batch position.
fn item_error(index: usize, err: impl Into<ApiError>) -> ApiError {
    match err.into() {
        ApiError(AppError::Validation(msg)) => ApiError::validation(format!("item {index}: {msg}")),
        other => other,
    }
}

fn response_for(
    state: &AppState,
    options: QrOptions,
    artifact: &Artifact,
    result: &UploadResult,
) -> QrCodeResponse {
    QrCodeResponse {
        id: artifact.id(),
        data: options.data,
        format: options.format,
        size: options.size,
        content_type: artifact.content_type().to_string(),
        file_size: artifact.len(),
        download_url: format!("/api/v1/qr/{}/download", artifact.id()),
        qr_code_base64: STANDARD.encode(artifact.bytes()),
        storage: storage_summary(state, result),
        created_at: artifact.created_at(),
    }
}

async fn run_batch(state: &AppState, request: BatchRequest) -> Result<BatchResponse, ApiError> {
    if request.items.is_empty() {
        return Err(ApiError::validation("Batch must contain at least one item"));
    }
    if request.items.len() > MAX_BATCH_ITEMS {
        return Err(ApiError::validation(format!(
            "Batch size cannot exceed {MAX_BATCH_ITEMS} items"
        )));
    }

    // Every item is rendered and checked before the first upload starts.
    let mut rendered = Vec::with_capacity(request.items.len());
    for (i, item) in request.items.into_iter().enumerate() {
        let options = QrOptions::new(item)
            .with_format(request.format)
            .with_size(request.size);
        let artifact = state
            .encoder
            .encode(&options)
            .map_err(|e| item_error(i, e))?;
        state
            .coordinator
            .config()
            .validate(&artifact)
            .map_err(|e| item_error(i, e))?;
        rendered.push((options, Arc::new(artifact)));
    }

    // Every upload runs to completion and is recorded.
    let results = join_all(
        rendered
            .into_iter()
            .map(|(options, artifact)| store(state, options, artifact)),
    )
    .await
    .into_iter()
    .collect::<Result<Vec<_>, _>>()?;
    info!(count = results.len(), "Batch QR codes generated");
    Ok(BatchResponse {
        total: results.len(),
        results,
    })
}

fn is_supported_upload(filename: &str) -> bool {
    let lower = filename.to_ascii_lowercase();
    lower.ends_with(".txt") || lower.ends_with(".csv")
}

// ============================================================================
// Route Handlers
// ============================================================================

/// POST `/qr/generate`
async fn generate(
    State(state): State<AppState>,
    Json(options): Json<QrOptions>,
) -> Result<Json<QrCodeResponse>, ApiError> {
    info!(
        data_length = options.data.len(),
        format = options.format.extension(),
        "Generating QR code"
    );
    process(&state, options).await.map(Json)
}

/// POST `/qr/batch`
async fn generate_batch(
    State(state): State<AppState>,
    Json(request): Json<BatchRequest>,
) -> Result<Json<BatchResponse>, ApiError> {
    info!(count = request.items.len(), "Generating batch QR codes");
    run_batch(&state, request).await.map(Json)
}

/// POST `/qr/wifi`
async fn generate_wifi(
    State(state): State<AppState>,
    Json(request): Json<WifiRequest>,
) -> Result<Json<QrCodeResponse>, ApiError> {
    if request.network.ssid.trim().is_empty() {
        return Err(ApiError::validation("ssid must not be empty"));
    }
    info!(security = request.network.security.as_str(), "Generating Wi-Fi QR code");
    let options = QrOptions::new(request.network.to_payload())
        .with_format(request.format)
        .with_size(request.size);
    process(&state, options).await.map(Json)
}

/// POST `/qr/vcard`
async fn generate_vcard(
    State(state): State<AppState>,
    Json(request): Json<VcardRequest>,
) -> Result<Json<QrCodeResponse>, ApiError> {
    if request.card.name.trim().is_empty() {
        return Err(ApiError::validation("name must not be empty"));
    }
    info!("Generating contact card QR code");
    let options = QrOptions::new(request.card.to_payload())
        .with_format(request.format)
        .with_size(request.size);
    process(&state, options).await.map(Json)
}

/// POST `/qr/url`
async fn generate_url(
    State(state): State<AppState>,
    Json(request): Json<UrlRequest>,
) -> Result<Json<QrCodeResponse>, ApiError> {
    if request.url.trim().is_empty() {
        return Err(ApiError::validation("url must not be empty"));
    }
    info!("Generating URL QR code");
    let options = QrOptions::new(url_payload(&request.url))
        .with_format(request.format)
        .with_size(request.size);
    process(&state, options).await.map(Json)
}

/// POST `/qr/upload`
/// One QR code per non-empty line of a `.txt` or `.csv` file.
async fn upload_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<BatchResponse>, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::validation(e.body_text()))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        if !is_supported_upload(&filename) {
            return Err(ApiError::validation(
                "Only .txt and .csv files are supported",
            ));
        }

        let text = field
            .text()
            .await
            .map_err(|e| ApiError::validation(e.body_text()))?;
        let items: Vec<String> = text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect();
        if items.len() > MAX_BATCH_ITEMS {
            return Err(ApiError::validation(format!(
                "File cannot contain more than {MAX_BATCH_ITEMS} lines"
            )));
        }

        info!(filename = %filename, lines = items.len(), "Processing uploaded file");
        let request = BatchRequest {
            items,
            format: QrFormat::default(),
            size: default_module_size(),
        };
        return run_batch(&state, request).await.map(Json);
    }

    Err(ApiError::validation("Missing 'file' field"))
}

/// GET `/qr/{id}/download`
async fn download(
    State(state): State<AppState>,
    Path(id): Path<ArtifactId>,
) -> Result<Response, ApiError> {
    let download = state.retriever.download(id).await?;
    let filename = download
        .key
        .rsplit('/')
        .next()
        .unwrap_or(&download.key)
        .to_string();

    Ok((
        [
            (header::CONTENT_TYPE, download.content_type),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename={filename}"),
            ),
            (
                header::HeaderName::from_static("x-storage-backend"),
                download.backend,
            ),
        ],
        download.bytes,
    )
        .into_response())
}

/// GET `/qr/{id}/storage`
async fn storage_record(
    State(state): State<AppState>,
    Path(id): Path<ArtifactId>,
) -> Result<Json<StorageRecordResponse>, ApiError> {
    let result = state.retriever.result(id).await?;
    Ok(Json(StorageRecordResponse {
        canonical_backend: result.canonical_backend().map(str::to_string),
        canonical_url: result.canonical_url().map(str::to_string),
        result,
    }))
}

/// DELETE `/qr/{id}`
async fn purge(
    State(state): State<AppState>,
    Path(id): Path<ArtifactId>,
) -> Result<Json<PurgeResponse>, ApiError> {
    let report = state.retriever.purge(id).await?;
    Ok(Json(PurgeResponse {
        id,
        complete: report.is_complete(),
        report,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{
        CountingBackend, app, app_over, app_with, get, post_json, send, send_json,
    };
    use qrcloud_core::encoder::QrEncoder;
    use qrcloud_core::storage::StorageBackend;
    use qrcloud_core::upload::CoordinatorConfig;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::json;

    #[test]
    fn test_is_supported_upload() {
        assert!(is_supported_upload("links.txt"));
        assert!(is_supported_upload("LINKS.CSV"));
        assert!(!is_supported_upload("links.pdf"));
        assert!(!is_supported_upload(""));
    }

    #[tokio::test]
    async fn test_generate_stores_on_every_backend() {
        let (router, _) = app(&["aws", "azure"]).await;
        let (status, body) = send_json(
            &router,
            post_json("/api/v1/qr/generate", &json!({"data": "https://example.com"})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["format"], "png");
        assert_eq!(body["content_type"], "image/png");
        assert!(!body["qr_code_base64"].as_str().unwrap().is_empty());
        assert!(body["storage"]["urls"]["aws"].is_string());
        assert!(body["storage"]["urls"]["azure"].is_string());
        assert_eq!(body["storage"]["canonical_url"], body["storage"]["urls"]["aws"]);
        assert_eq!(body["storage"]["degraded"], false);
        assert!(body["storage"].get("warning").is_none());
    }

    #[tokio::test]
    async fn test_generate_without_backends_still_returns_image() {
        let (router, _) = app(&[]).await;
        let (status, body) = send_json(
            &router,
            post_json("/api/v1/qr/generate", &json!({"data": "hello"})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert!(!body["qr_code_base64"].as_str().unwrap().is_empty());
        assert_eq!(body["storage"]["degraded"], true);
        assert!(body["storage"]["canonical_url"].is_null());
        assert!(body["storage"]["warning"].is_string());
    }

    #[tokio::test]
    async fn test_generate_rejects_bad_options() {
        let (router, _) = app(&["aws"]).await;
        let (status, body) = send_json(
            &router,
            post_json("/api/v1/qr/generate", &json!({"data": "x", "size": 99})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "validation_error");
    }

    #[tokio::test]
    async fn test_download_round_trip() {
        let (router, _) = app(&["aws"]).await;
        let (_, body) = send_json(
            &router,
            post_json("/api/v1/qr/generate", &json!({"data": "dl", "format": "svg"})),
        )
        .await;
        let download_url = body["download_url"].as_str().unwrap().to_string();

        let (status, headers, bytes) = send(&router, get(&download_url)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers[header::CONTENT_TYPE], "image/svg+xml");
        assert_eq!(headers["x-storage-backend"], "aws");
        assert!(
            headers[header::CONTENT_DISPOSITION]
                .to_str()
                .unwrap()
                .ends_with(".svg")
        );
        let inline = STANDARD
            .decode(body["qr_code_base64"].as_str().unwrap())
            .unwrap();
        assert_eq!(bytes, inline);
    }

    #[tokio::test]
    async fn test_download_unknown_id_is_not_found() {
        let (router, _) = app(&["aws"]).await;
        let uri = format!("/api/v1/qr/{}/download", ArtifactId::new());
        let (status, body) = send_json(&router, get(&uri)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "not_found");
    }

    #[tokio::test]
    async fn test_storage_record_and_purge() {
        let (router, _) = app(&["aws", "azure"]).await;
        let (_, body) = send_json(
            &router,
            post_json("/api/v1/qr/generate", &json!({"data": "purge me"})),
        )
        .await;
        let id = body["id"].as_str().unwrap().to_string();

        let (status, record) = send_json(&router, get(&format!("/api/v1/qr/{id}/storage"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(record["canonical_backend"], "aws");
        assert_eq!(record["outcomes"]["azure"]["status"], "success");

        let request = Request::builder()
            .method("DELETE")
            .uri(format!("/api/v1/qr/{id}"))
            .body(Body::empty())
            .unwrap();
        let (status, purged) = send_json(&router, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(purged["complete"], true);
        assert_eq!(purged["deleted"], json!(["aws", "azure"]));

        let (status, _) = send_json(&router, get(&format!("/api/v1/qr/{id}/download"))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_batch_generates_each_item() {
        let (router, _) = app(&["aws"]).await;
        let (status, body) = send_json(
            &router,
            post_json(
                "/api/v1/qr/batch",
                &json!({"items": ["a", "b", "c"], "format": "SVG", "size": 4}),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 3);
        assert_eq!(body["results"][1]["data"], "b");
        assert_eq!(body["results"][2]["format"], "svg");
        assert_eq!(body["results"][0]["size"], 4);
    }

    #[tokio::test]
    async fn test_batch_limits() {
        let (router, _) = app(&["aws"]).await;
        let too_many: Vec<String> = (0..=MAX_BATCH_ITEMS).map(|i| i.to_string()).collect();
        let (status, _) =
            send_json(&router, post_json("/api/v1/qr/batch", &json!({"items": too_many}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send_json(
            &router,
            post_json("/api/v1/qr/batch", &json!({"items": ["ok", ""]})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["message"].as_str().unwrap().contains("item 1"));
    }

    #[tokio::test]
    async fn test_batch_checks_capacity_before_uploading() {
        let backend = CountingBackend::new("aws");
        let (router, _) = app_over(vec![Arc::clone(&backend) as Arc<dyn StorageBackend>]).await;
        let oversized = "a".repeat(4000);
        let (status, body) = send_json(
            &router,
            post_json("/api/v1/qr/batch", &json!({"items": ["fits", oversized]})),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["message"].as_str().unwrap().contains("item 1:"));

        assert_eq!(backend.put_count(), 0);

        let (status, body) = send_json(
            &router,
            post_json("/api/v1/qr/batch", &json!({"items": ["fits", "also fits"]})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 2);
        assert_eq!(backend.put_count(), 2);
    }

    #[tokio::test]
    async fn test_batch_rejects_item_over_upload_limit() {
        let small = QrEncoder::new()
            .encode(&QrOptions::new("a").with_format(QrFormat::Svg).with_size(4))
            .unwrap();
        let limit = u64::try_from(small.len()).unwrap();
        let (router, _) = app_with(
            &["aws"],
            CoordinatorConfig::default().with_max_artifact_size(limit),
        )
        .await;
        let (status, body) = send_json(
            &router,
            post_json(
                "/api/v1/qr/batch",
                &json!({"items": ["a", "b".repeat(500)], "format": "svg", "size": 4}),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["message"].as_str().unwrap().contains("item 1:"));
    }

    #[tokio::test]
    async fn test_wifi_qr_code() {
        let (router, _) = app(&["aws"]).await;
        let (status, body) = send_json(
            &router,
            post_json(
                "/api/v1/qr/wifi",
                &json!({"ssid": "Office", "password": "hunter2", "format": "svg"}),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"], "WIFI:T:WPA;S:Office;P:hunter2;H:false;;");
        assert_eq!(body["content_type"], "image/svg+xml");

        let (status, _) =
            send_json(&router, post_json("/api/v1/qr/wifi", &json!({"ssid": " "}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_vcard_qr_code() {
        let (router, _) = app(&["aws"]).await;
        let (status, body) = send_json(
            &router,
            post_json(
                "/api/v1/qr/vcard",
                &json!({"name": "Ada Lovelace", "phone": "+44 20 7946 0000"}),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let data = body["data"].as_str().unwrap();
        assert!(data.starts_with("BEGIN:VCARD\nVERSION:3.0\nFN:Ada Lovelace"));
        assert!(data.contains("TEL:+44 20 7946 0000"));
        assert_eq!(body["size"], 10);
    }

    #[tokio::test]
    async fn test_url_qr_code_adds_scheme() {
        let (router, _) = app(&["aws"]).await;
        let (status, body) = send_json(
            &router,
            post_json("/api/v1/qr/url", &json!({"url": "example.com/menu"})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"], "https://example.com/menu");
    }

    fn multipart(filename: &str, content: &str) -> Request<Body> {
        let boundary = "qrcloud-test-boundary";
        let body = format!(
            "--{boundary}\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n\
             Content-Type: text/plain\r\n\r\n\
             {content}\r\n\
             --{boundary}--\r\n"
        );
        Request::builder()
            .method("POST")
            .uri("/api/v1/qr/upload")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_upload_file_one_code_per_line() {
        let (router, _) = app(&["aws"]).await;
        let (status, body) = send_json(
            &router,
            multipart("links.txt", "https://a.example\n\n  https://b.example  \n"),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 2);
        assert_eq!(body["results"][1]["data"], "https://b.example");
    }

    #[tokio::test]
    async fn test_upload_rejects_other_file_types() {
        let (router, _) = app(&["aws"]).await;
        let (status, _) = send_json(&router, multipart("links.json", "[]")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
