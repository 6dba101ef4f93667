// =============================================================================
// CONFIGURATOR SERVICE - Main Entry Point
// =============================================================================
// Backend of the CCTV system configurator.
//
// WHAT THIS SERVICE DOES:
// - Turns a customer questionnaire into a priced bill of materials
//   (cameras, recorder, disks, switch, cabling, accessories, UPS, assembly)
// - Serves the product catalog for browsing
// - Saves calculated configurations and renders quotes and order drafts
// - Exposes Prometheus metrics and caches the catalog in Redis
// =============================================================================

// -----------------------------------------------------------------------------
// MODULE DECLARATIONS
// -----------------------------------------------------------------------------
mod catalog; // Catalog query interface and in-memory snapshot (catalog.rs)
mod config; // Configuration loading (config.rs)
mod db; // Database operations (db.rs)
mod engine; // Selection engine (engine.rs)
mod error; // Error types (error.rs)
mod handlers; // HTTP request handlers (handlers.rs)
mod metrics; // Prometheus metrics setup (metrics.rs)
mod models; // Data structures (models.rs)
mod quote; // Quote and order rendering (quote.rs)

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::db::Database;
use crate::metrics::setup_metrics;

// -----------------------------------------------------------------------------
// APPLICATION STATE
// -----------------------------------------------------------------------------
// Shared by every request handler through Arc<AppState>.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: Database,

    /// Redis connection for the catalog cache
    pub redis: redis::aio::ConnectionManager,

    /// Used to render metrics in Prometheus format
    pub metrics_handle: metrics_exporter_prometheus::PrometheusHandle,

    /// Service and engine configuration
    pub config: Config,
}

// -----------------------------------------------------------------------------
// MAIN FUNCTION
// -----------------------------------------------------------------------------
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -------------------------------------------------------------------------
    // STEP 1: Load environment variables
    // -------------------------------------------------------------------------
    dotenvy::dotenv().ok(); // .env is optional

    // -------------------------------------------------------------------------
    // STEP 2: Initialize logging/tracing
    // -------------------------------------------------------------------------
    // RUST_LOG controls levels, e.g. RUST_LOG=info,configurator_service=debug
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,configurator_service=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("Starting Configurator Service...");

    // -------------------------------------------------------------------------
    // STEP 3: Load configuration
    // -------------------------------------------------------------------------
    let config = Config::from_env()?;
    info!(
        port = config.port,
        catalog_cache_ttl_secs = config.catalog_cache_ttl_secs,
        ups_sizing = %config.engine.ups_sizing,
        "Configuration loaded"
    );

    // -------------------------------------------------------------------------
    // STEP 4: Set up Prometheus metrics
    // -------------------------------------------------------------------------
    let metrics_handle = setup_metrics()?;
    info!("Prometheus metrics initialized");

    // -------------------------------------------------------------------------
    // STEP 5: Connect to PostgreSQL database
    // -------------------------------------------------------------------------
    let db = Database::connect(&config.database_url).await?;
    info!("Connected to PostgreSQL");

    db.run_migrations().await?;
    info!("Database migrations completed");

    // -------------------------------------------------------------------------
    // STEP 6: Connect to Redis
    // -------------------------------------------------------------------------
    let redis_client = redis::Client::open(config.redis_url.as_str())?;
    let redis_conn = redis::aio::ConnectionManager::new(redis_client).await?;
    info!("Connected to Redis");

    // -------------------------------------------------------------------------
    // STEP 7: Create application state
    // -------------------------------------------------------------------------
    let port = config.port;
    let state = Arc::new(AppState {
        db,
        redis: redis_conn,
        metrics_handle,
        config,
    });

    // -------------------------------------------------------------------------
    // STEP 8: Define routes
    // -------------------------------------------------------------------------
    let app = Router::new()
        // ----- Health & Readiness Endpoints -----
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        // ----- Metrics Endpoint -----
        .route("/metrics", get(handlers::metrics_handler))
        // ----- Catalog API -----
        .route("/api/v1/products", get(handlers::list_products))
        .route("/api/v1/products/:id", get(handlers::get_product))
        // ----- Configurator API -----
        .route("/api/v1/configurator/calculate", post(handlers::calculate))
        .route("/api/v1/configurations", get(handlers::list_configurations))
        .route("/api/v1/configurations/:id", get(handlers::get_configuration))
        .route(
            "/api/v1/configurations/:id/input",
            get(handlers::get_configuration_input),
        )
        .route("/api/v1/configurations/:id/quote", get(handlers::get_quote))
        .route("/api/v1/configurations/:id/order", get(handlers::get_order_draft))
        // ----- Middleware Layers -----
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // -------------------------------------------------------------------------
    // STEP 9: Start the HTTP server
    // -------------------------------------------------------------------------
    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(address = %addr, "Configurator Service is listening");

    axum::serve(listener, app).await?;

    Ok(())
}
