//! Roomly API server entry point.

use std::sync::Arc;

use roomly_api::config::ServerConfig;
use roomly_api::error::AppError;
use roomly_api::state::AppState;
use roomly_api::{build_router, cors_layer, telemetry};
use roomly_core::clock::SystemClock;
use roomly_core::repository::EventRepository;
use roomly_event_store::migrations::run_migrations;
use roomly_event_store::pg_event_repository::PgEventRepository;
use sqlx::postgres::PgPoolOptions;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let config = ServerConfig::from_env()?;
    let tracer_provider = telemetry::init_tracing(config.otel_endpoint.as_deref())?;

    tracing::info!("Starting Roomly API server");

    // Create database connection pool.
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(&config.database_url)
        .await?;
    run_migrations(&pool).await?;

    // Build application state.
    let event_repository: Arc<dyn EventRepository> = Arc::new(PgEventRepository::new(pool));
    let app_state = AppState::new(
        Arc::new(SystemClock),
        event_repository,
        config.identity_header.clone(),
    );

    let app = build_router(app_state, cors_layer(config.cors_allowed_origin.clone()));

    tracing::info!("Listening on {}", config.addr);
    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app).await?;

    if let Some(provider) = tracer_provider {
        if let Err(err) = provider.shutdown() {
            tracing::warn!(error = %err, "span exporter did not shut down cleanly");
        }
    }
    Ok(())
}
