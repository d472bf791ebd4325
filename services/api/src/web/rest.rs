//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI specification.

use crate::web::{
    protocol::{
        ErrorBody, ExtractRequest, ExtractedPaymentBody, SaveScanRequest, SaveScanResponse,
        ScanEntry,
    },
    state::AppState,
};
use axum::{extract::State, http::StatusCode, response::Json};
use base64::Engine as _;
use quickscan_core::ports::ExtractionError;
use std::sync::Arc;
use tracing::{error, info, warn};
use utoipa::OpenApi;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        extract_handler,
        save_scan_handler,
        list_scans_handler,
        health_handler,
    ),
    components(
        schemas(ExtractRequest, ExtractedPaymentBody, SaveScanRequest, SaveScanResponse, ScanEntry, ErrorBody)
    ),
    tags(
        (name = "QuickScan API", description = "Receipt extraction and scan history for the payment helper.")
    )
)]
pub struct ApiDoc;

type ApiFailure = (StatusCode, Json<ErrorBody>);

fn failure(status: StatusCode, message: impl Into<String>) -> ApiFailure {
    (
        status,
        Json(ErrorBody {
            error: message.into(),
        }),
    )
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Read the payer name, phone number and amount from a receipt image.
#[utoipa::path(
    post,
    path = "/api/extract",
    request_body = ExtractRequest,
    responses(
        (status = 200, description = "Fields extracted", body = ExtractedPaymentBody),
        (status = 400, description = "Image is not valid base64", body = ErrorBody),
        (status = 500, description = "Provider failure or missing API key", body = ErrorBody)
    )
)]
pub async fn extract_handler(
    State(app_state): State<Arc<AppState>>,
    Json(req): Json<ExtractRequest>,
) -> Result<Json<ExtractedPaymentBody>, ApiFailure> {
    info!(
        mime_type = %req.mime_type,
        base64_len = req.base64_image.len(),
        "Extract request received."
    );

    let extractor = app_state.extractor.as_ref().ok_or_else(|| {
        error!("GEMINI_API_KEY not configured.");
        failure(StatusCode::INTERNAL_SERVER_ERROR, "API key not configured")
    })?;

    let image = base64::engine::general_purpose::STANDARD
        .decode(req.base64_image.trim())
        .map_err(|e| {
            warn!("Rejected extract request with invalid base64: {}", e);
            failure(StatusCode::BAD_REQUEST, format!("Invalid base64 image: {}", e))
        })?;

    match extractor.extract(&image, &req.mime_type).await {
        Ok(payment) => Ok(Json(payment.into())),
        Err(e) => {
            error!("Extraction error: {}", e);
            let status = match &e {
                ExtractionError::Provider {
                    status: Some(code), ..
                } => StatusCode::from_u16(*code)
                    .ok()
                    .filter(|s| s.is_client_error() || s.is_server_error())
                    .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            Err(failure(status, e.to_string()))
        }
    }
}

/// Remember a completed scan.
#[utoipa::path(
    post,
    path = "/api/scans",
    request_body = SaveScanRequest,
    responses(
        (status = 200, description = "Scan stored", body = SaveScanResponse),
        (status = 500, description = "Internal server error", body = ErrorBody)
    )
)]
pub async fn save_scan_handler(
    State(app_state): State<Arc<AppState>>,
    Json(req): Json<SaveScanRequest>,
) -> Result<Json<SaveScanResponse>, ApiFailure> {
    let payment = req.into_domain();
    match app_state.db.record_scan(&payment).await {
        Ok(id) => Ok(Json(SaveScanResponse { id })),
        Err(e) => {
            error!("Failed to save scan: {:?}", e);
            Err(failure(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}

/// List stored scans, newest first.
#[utoipa::path(
    get,
    path = "/api/scans",
    responses(
        (status = 200, description = "Scan history", body = [ScanEntry]),
        (status = 500, description = "Internal server error", body = ErrorBody)
    )
)]
pub async fn list_scans_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<Vec<ScanEntry>>, ApiFailure> {
    match app_state.db.list_scans().await {
        Ok(scans) => Ok(Json(scans.into_iter().map(ScanEntry::from).collect())),
        Err(e) => {
            error!("Failed to list scans: {:?}", e);
            Err(failure(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}

/// Liveness check.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Server is up", body = String, content_type = "text/plain")
    )
)]
pub async fn health_handler() -> &'static str {
    "ok"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::db::tests::memory_adapter;
    use crate::config::Config;
    use crate::web::router;
    use async_trait::async_trait;
    use axum::{body::Body, http::Request, Router};
    use http_body_util::BodyExt;
    use quickscan_core::domain::ExtractedPayment;
    use quickscan_core::ports::ExtractionService;
    use tower::ServiceExt;
    use tower_http::cors::CorsLayer;

    struct FixedExtractor(Result<ExtractedPayment, ExtractionError>);

    #[async_trait]
    impl ExtractionService for FixedExtractor {
        async fn extract(
            &self,
            image: &[u8],
            _mime_type: &str,
        ) -> Result<ExtractedPayment, ExtractionError> {
            assert_eq!(image, b"receipt");
            self.0.clone()
        }
    }

    fn test_config() -> Config {
        Config {
            bind_address: "127.0.0.1:0".parse().unwrap(),
            database_url: "sqlite::memory:".to_string(),
            log_level: tracing::Level::INFO,
            gemini_api_key: Some("test-key".to_string()),
            extraction_api_base: "http://localhost".to_string(),
            extraction_model: "test-model".to_string(),
            max_upload_bytes: 1024 * 1024,
            allowed_origin: None,
        }
    }

    async fn app(extractor: Option<FixedExtractor>) -> Router {
        let state = Arc::new(AppState {
            db: Arc::new(memory_adapter().await),
            config: Arc::new(test_config()),
            extractor: extractor.map(|e| Arc::new(e) as Arc<dyn ExtractionService>),
        });
        router(state, CorsLayer::permissive())
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn read_json(resp: axum::response::Response) -> serde_json::Value {
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&body).unwrap()
    }

    fn receipt_body() -> serde_json::Value {
        serde_json::json!({
            "base64Image": base64::engine::general_purpose::STANDARD.encode(b"receipt"),
            "mimeType": "image/jpeg",
        })
    }

    #[tokio::test]
    async fn extract_returns_camel_case_fields() {
        let app = app(Some(FixedExtractor(Ok(ExtractedPayment::new(
            "Juan Dela Cruz",
            "09171234567",
            500.0,
        )))))
        .await;

        let resp = app.oneshot(post_json("/api/extract", receipt_body())).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let json = read_json(resp).await;
        assert_eq!(json["name"], "Juan Dela Cruz");
        assert_eq!(json["phoneNumber"], "09171234567");
        assert_eq!(json["amount"], 500.0);
    }

    #[tokio::test]
    async fn extract_without_key_reports_missing_key() {
        let app = app(None).await;

        let resp = app.oneshot(post_json("/api/extract", receipt_body())).await.unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(read_json(resp).await["error"], "API key not configured");
    }

    #[tokio::test]
    async fn extract_forwards_provider_message() {
        let app = app(Some(FixedExtractor(Err(ExtractionError::Provider {
            status: Some(403),
            message: "PERMISSION_DENIED: Generative Language API has not been used".to_string(),
        }))))
        .await;

        let resp = app.oneshot(post_json("/api/extract", receipt_body())).await.unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        let json = read_json(resp).await;
        assert!(json["error"].as_str().unwrap().starts_with("PERMISSION_DENIED"));
    }

    #[tokio::test]
    async fn extract_rejects_bad_base64() {
        let app = app(Some(FixedExtractor(Err(ExtractionError::NoData)))).await;

        let body = serde_json::json!({ "base64Image": "not base64!", "mimeType": "image/png" });
        let resp = app.oneshot(post_json("/api/extract", body)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn saved_scans_are_listed() {
        let app = app(None).await;

        let body = serde_json::json!({ "phoneNumber": "09171234567", "amount": 500, "name": "Juan Dela Cruz" });
        let resp = app.clone().oneshot(post_json("/api/scans", body)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let id = read_json(resp).await["id"].as_i64().unwrap();

        let req = Request::builder().uri("/api/scans").body(Body::empty()).unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = read_json(resp).await;
        assert_eq!(json[0]["id"], id);
        assert_eq!(json[0]["phoneNumber"], "09171234567");
        assert_eq!(json[0]["amount"], 500.0);
    }

    #[tokio::test]
    async fn health_answers_ok() {
        let app = app(None).await;
        let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"ok");
    }

    #[test]
    fn api_doc_lists_every_route() {
        let doc = ApiDoc::openapi();
        for path in ["/api/extract", "/api/scans", "/health"] {
            assert!(doc.paths.paths.contains_key(path), "{} is undocumented", path);
        }
    }
}
