pub mod protocol;
pub mod rest;
pub mod state;

use crate::config::{Config, ConfigError};
use axum::{
    extract::DefaultBodyLimit,
    http::{header::CONTENT_TYPE, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use self::state::AppState;

pub use rest::{extract_handler, health_handler, list_scans_handler, save_scan_handler, ApiDoc};

/// Builds the CORS policy: one allowed origin if configured, otherwise any.
pub fn cors_layer(config: &Config) -> Result<CorsLayer, ConfigError> {
    match &config.allowed_origin {
        Some(origin) => {
            let origin = origin.parse::<HeaderValue>().map_err(|e| {
                ConfigError::InvalidValue("ALLOWED_ORIGIN".to_string(), e.to_string())
            })?;
            Ok(CorsLayer::new()
                .allow_origin(origin)
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers([CONTENT_TYPE]))
        }
        None => Ok(CorsLayer::permissive()),
    }
}

/// The API router with its body limit and CORS policy applied.
pub fn router(app_state: Arc<AppState>, cors: CorsLayer) -> Router {
    let body_limit = app_state.config.max_upload_bytes;
    Router::new()
        .route("/api/extract", post(extract_handler))
        .route("/api/scans", post(save_scan_handler).get(list_scans_handler))
        .route("/health", get(health_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .with_state(app_state)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_origin(origin: Option<&str>) -> Config {
        Config {
            bind_address: "127.0.0.1:0".parse().unwrap(),
            database_url: "sqlite::memory:".to_string(),
            log_level: tracing::Level::INFO,
            gemini_api_key: None,
            extraction_api_base: "http://localhost".to_string(),
            extraction_model: "test-model".to_string(),
            max_upload_bytes: 1024,
            allowed_origin: origin.map(str::to_string),
        }
    }

    #[test]
    fn accepts_a_configured_origin() {
        assert!(cors_layer(&config_with_origin(Some("http://localhost:5173"))).is_ok());
        assert!(cors_layer(&config_with_origin(None)).is_ok());
    }

    #[test]
    fn rejects_an_unencodable_origin() {
        let err = cors_layer(&config_with_origin(Some("http://bad\norigin"))).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(var, _) if var == "ALLOWED_ORIGIN"));
    }
}
