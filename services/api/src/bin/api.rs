//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{DbAdapter, RagClient},
    config::Config,
    error::ApiError,
    web::{api_router, state::AppState, ApiDoc},
};
use axum::Router;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Configuration & Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Study tracker API starting up");
    if config.uses_dev_jwt_secret() {
        warn!("JWT_SECRET is not set; tokens are signed with an insecure development secret");
    }

    // --- 2. Postgres ---
    info!("Connecting to Postgres...");
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    let db = Arc::new(DbAdapter::new(pool));
    db.run_migrations().await?;
    info!("Schema is up to date");

    // --- 3. RAG Service Client ---
    let assistant = Arc::new(RagClient::new(config.ai_service_url.clone())?);
    info!("Forwarding AI requests to {}", config.ai_service_url);

    // --- 4. Router ---
    let app_state = Arc::new(AppState {
        db,
        assistant,
        config: config.clone(),
    });
    let app = Router::new()
        .merge(api_router(app_state))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 5. Serve ---
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    info!(
        "Listening on {} (Swagger UI at /swagger-ui)",
        config.bind_address
    );
    axum::serve(listener, app).await?;

    Ok(())
}
