//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{db::DbAdapter, vision_llm::OpenAiVisionAdapter},
    config::Config,
    error::ApiError,
    web::{cors_layer, rest::ApiDoc, router, state::AppState},
};
use async_openai::{config::OpenAIConfig, Client};
use axum::Router;
use quickscan_core::ports::ExtractionService;
use sqlx::sqlite::SqlitePoolOptions;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to Database & Run Migrations ---
    info!("Connecting to database...");
    let db_pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    let db_adapter = Arc::new(DbAdapter::new(db_pool));
    info!("Running database migrations...");
    db_adapter.run_migrations().await?;
    info!("Database migrations complete.");

    // --- 3. Initialize the Extraction Adapter ---
    let extractor = match &config.gemini_api_key {
        Some(api_key) => {
            let openai_config = OpenAIConfig::new()
                .with_api_base(config.extraction_api_base.clone())
                .with_api_key(api_key.clone());
            let adapter = OpenAiVisionAdapter::new(
                Client::with_config(openai_config),
                config.extraction_model.clone(),
            );
            Some(Arc::new(adapter) as Arc<dyn ExtractionService>)
        }
        None => {
            warn!("GEMINI_API_KEY environment variable is not set! Extraction will fail.");
            None
        }
    };

    // --- 4. Build the Shared AppState ---
    let app_state = Arc::new(AppState {
        db: db_adapter,
        config: config.clone(),
        extractor,
    });

    // --- 5. Create the Web Router ---
    let api_router = router(app_state, cors_layer(&config)?);

    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
