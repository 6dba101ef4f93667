// =============================================================================
// HANDLERS MODULE
// =============================================================================
// HTTP request handlers for the configurator service.
//
// AXUM EXTRACTORS USED:
// - State<T>: shared AppState (database, Redis, metrics, config)
// - Path<T>: product / configuration ids
// - Query<T>: catalog filters and pagination
// - Json<T>: questionnaire body
// =============================================================================

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

use crate::catalog::{CatalogSearch, CatalogSnapshot, CatalogSort};
use crate::engine;
use crate::error::{AppError, AppResult};
use crate::metrics;
use crate::models::*;
use crate::quote;
use crate::AppState;

/// Redis key holding the serialized catalog snapshot
const CATALOG_CACHE_KEY: &str = "catalog:snapshot";

/// Upper bound for the saved configuration listing
const MAX_LISTED_CONFIGURATIONS: i64 = 100;

// =============================================================================
// HEALTH CHECK ENDPOINTS
// =============================================================================

/// Liveness check
///
/// GET /health
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        service: "configurator-service".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Readiness check: database and Redis must both answer.
///
/// GET /ready
pub async fn readiness_check(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ReadinessResponse>, StatusCode> {
    let db_healthy = state.db.health_check().await;

    let redis_healthy = redis::cmd("PING")
        .query_async::<_, String>(&mut state.redis.clone())
        .await
        .is_ok();

    let all_healthy = db_healthy && redis_healthy;
    let status = if all_healthy { "ready" } else { "not_ready" };

    let response = ReadinessResponse {
        status: status.to_string(),
        checks: ReadinessChecks {
            database: db_healthy,
            redis: redis_healthy,
        },
    };

    if all_healthy {
        Ok(Json(response))
    } else {
        Err(StatusCode::SERVICE_UNAVAILABLE)
    }
}

// =============================================================================
// METRICS ENDPOINT
// =============================================================================
/// Prometheus exposition
///
/// GET /metrics
pub async fn metrics_handler(State(state): State<Arc<AppState>>) -> String {
    state.metrics_handle.render()
}

// =============================================================================
// CATALOG SNAPSHOT LOADING
// =============================================================================

/// Load one consistent catalog snapshot for a request.
///
/// Served from Redis when a fresh copy is cached; any cache failure falls
/// back to PostgreSQL. A fresh load is written back with the configured TTL.
async fn load_snapshot(state: &AppState) -> AppResult<CatalogSnapshot> {
    let start = Instant::now();
    let cached: Option<String> = redis::cmd("GET")
        .arg(CATALOG_CACHE_KEY)
        .query_async(&mut state.redis.clone())
        .await
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Catalog cache read failed");
            None
        });
    metrics::record_redis_operation("get", start.elapsed().as_secs_f64());

    if let Some(json) = cached {
        match serde_json::from_str::<Vec<Product>>(&json) {
            Ok(products) => {
                metrics::record_catalog_cache(true);
                return Ok(CatalogSnapshot::new(products));
            }
            Err(e) => tracing::warn!(error = %e, "Discarding unreadable catalog cache entry"),
        }
    }
    metrics::record_catalog_cache(false);

    let start = Instant::now();
    let snapshot = state.db.load_catalog().await?;
    metrics::record_db_query("select", start.elapsed().as_secs_f64());
    metrics::set_catalog_size(snapshot.len());
    if snapshot.is_empty() {
        tracing::warn!("Catalog is empty; every line will come back unmatched");
    }

    if state.config.catalog_cache_ttl_secs > 0 {
        let json = serde_json::to_string(snapshot.products())?;
        let start = Instant::now();
        let stored: Result<(), _> = redis::cmd("SETEX")
            .arg(CATALOG_CACHE_KEY)
            .arg(state.config.catalog_cache_ttl_secs)
            .arg(&json)
            .query_async(&mut state.redis.clone())
            .await;
        metrics::record_redis_operation("set", start.elapsed().as_secs_f64());
        if let Err(e) = stored {
            tracing::warn!(error = %e, "Catalog cache write failed");
        }
    }

    tracing::debug!(products = snapshot.len(), "Catalog snapshot loaded from database");
    Ok(snapshot)
}

// =============================================================================
// CATALOG API ENDPOINTS
// =============================================================================

// -----------------------------------------------------------------------------
// QUERY PARAMETERS
// -----------------------------------------------------------------------------
/// Query parameters for the product listing
///
/// # Example
/// GET /api/v1/products?category=camera&q=hikvision&min_resolution=4&page=2
#[derive(Debug, Deserialize)]
pub struct ProductListParams {
    pub category: Option<ProductCategory>,
    /// Case-insensitive match on name, brand or model
    pub q: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub min_resolution: Option<u32>,
    #[serde(default)]
    pub outdoor_only: bool,
    #[serde(default)]
    pub sort: CatalogSort,

    /// Page number (1-indexed, default: 1)
    #[serde(default = "default_page")]
    pub page: usize,

    /// Items per page (default: 20, max: 100)
    #[serde(default = "default_per_page")]
    pub per_page: usize,
}

fn default_page() -> usize {
    1
}
fn default_per_page() -> usize {
    20
}

impl ProductListParams {
    fn search(&self) -> AppResult<CatalogSearch> {
        if let (Some(min), Some(max)) = (self.min_price, self.max_price) {
            if min > max {
                return Err(AppError::BadRequest(format!(
                    "min_price ({min}) is greater than max_price ({max})"
                )));
            }
        }
        Ok(CatalogSearch {
            category: self.category,
            query: self.q.clone(),
            min_price: self.min_price,
            max_price: self.max_price,
            min_resolution: self.min_resolution,
            outdoor_only: self.outdoor_only,
            sort: self.sort,
        })
    }
}

/// Slice one page out of `items`; pages past the end are empty.
fn paginate<T>(items: Vec<T>, page: usize, per_page: usize) -> Vec<T> {
    let offset = page.saturating_sub(1).saturating_mul(per_page);
    items.into_iter().skip(offset).take(per_page).collect()
}

// -----------------------------------------------------------------------------
// LIST PRODUCTS
// -----------------------------------------------------------------------------
/// Browse the catalog with filters, sorting and pagination
///
/// GET /api/v1/products
///
/// # Response
/// ```json
/// { "items": [...], "total": 28, "page": 1, "per_page": 20 }
/// ```
pub async fn list_products(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ProductListParams>,
) -> AppResult<Json<ProductListResponse>> {
    let start = Instant::now();

    let page = params.page.max(1);
    let per_page = params.per_page.clamp(1, 100);
    let search = params.search()?;

    let snapshot = load_snapshot(&state).await?;
    let found = snapshot.search(&search);
    let total = found.len();
    let items = paginate(found, page, per_page);

    metrics::record_http_request(
        "GET",
        "/api/v1/products",
        200,
        start.elapsed().as_secs_f64(),
    );

    Ok(Json(ProductListResponse {
        items,
        total,
        page,
        per_page,
    }))
}

// -----------------------------------------------------------------------------
// GET SINGLE PRODUCT
// -----------------------------------------------------------------------------
/// GET /api/v1/products/:id
///
/// - 200 OK: product JSON
/// - 404 Not Found: unknown id
pub async fn get_product(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Product>> {
    let start = Instant::now();

    let product = state
        .db
        .get_product(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Product not found: {id}")))?;

    let duration = start.elapsed().as_secs_f64();
    metrics::record_http_request("GET", "/api/v1/products/:id", 200, duration);
    metrics::record_db_query("select", duration);

    Ok(Json(product))
}

// =============================================================================
// CONFIGURATOR ENDPOINTS
// =============================================================================

// -----------------------------------------------------------------------------
// CALCULATE
// -----------------------------------------------------------------------------
/// Run the selection engine for a questionnaire and save the result
///
/// POST /api/v1/configurator/calculate
///
/// # Request Body
/// Any subset of the questionnaire; missing fields take their defaults.
/// ```json
/// { "building": "office", "tech": "ip_poe", "outdoor_cam_count": 6, "need_ups": true }
/// ```
///
/// # Response
/// - 200 OK: `CalculationResponse`; `configuration_id` is null if saving failed
/// - 422 Unprocessable Entity: no cameras requested
pub async fn calculate(
    State(state): State<Arc<AppState>>,
    Json(input): Json<ConfiguratorInput>,
) -> AppResult<Json<CalculationResponse>> {
    let start = Instant::now();

    tracing::info!(
        building = ?input.building,
        tech = ?input.tech,
        outdoor = input.outdoor_cam_count,
        indoor = input.indoor_cam_count,
        "Calculating configuration"
    );

    // Rejected questionnaires never touch the catalog
    check_questionnaire(&input, start)?;

    let snapshot = load_snapshot(&state).await?;

    let engine_start = Instant::now();
    let result = engine::calculate(&input, &snapshot, &state.config.engine)?;
    let engine_secs = engine_start.elapsed().as_secs_f64();
    metrics::record_calculation(Some(&result), engine_secs);

    let unmatched = result.unmatched_lines();
    if !unmatched.is_empty() {
        tracing::info!(lines = ?unmatched, "Some requested lines have no matching product");
    }

    let db_start = Instant::now();
    let configuration_id = match state.db.save_configuration(&result).await {
        Ok(id) => Some(id),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to save configuration; returning unsaved result");
            None
        }
    };
    metrics::record_db_query("insert", db_start.elapsed().as_secs_f64());

    let total_price = result.total_price();
    tracing::info!(
        configuration_id = ?configuration_id,
        total_price = %total_price,
        "Configuration calculated"
    );

    metrics::record_http_request(
        "POST",
        "/api/v1/configurator/calculate",
        200,
        start.elapsed().as_secs_f64(),
    );

    Ok(Json(CalculationResponse {
        configuration_id,
        total_price,
        result,
    }))
}

/// Validate the questionnaire and count a rejection as a 422.
fn check_questionnaire(input: &ConfiguratorInput, start: Instant) -> AppResult<()> {
    engine::validate(input).map_err(|e| {
        metrics::record_calculation(None, 0.0);
        metrics::record_http_request(
            "POST",
            "/api/v1/configurator/calculate",
            422,
            start.elapsed().as_secs_f64(),
        );
        AppError::from(e)
    })
}

// -----------------------------------------------------------------------------
// SAVED CONFIGURATIONS
// -----------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct RecentParams {
    /// Number of configurations to return (default: 20, max: 100)
    #[serde(default = "default_recent_limit")]
    pub limit: i64,
}

fn default_recent_limit() -> i64 {
    20
}

/// Recently saved configurations, newest first
///
/// GET /api/v1/configurations?limit=10
pub async fn list_configurations(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RecentParams>,
) -> AppResult<Json<Vec<ConfigurationSummary>>> {
    let start = Instant::now();

    let limit = params.limit.clamp(1, MAX_LISTED_CONFIGURATIONS);
    let summaries = state.db.list_configurations(limit).await?;

    let duration = start.elapsed().as_secs_f64();
    metrics::record_http_request("GET", "/api/v1/configurations", 200, duration);
    metrics::record_db_query("select", duration);

    Ok(Json(summaries))
}

async fn fetch_saved(state: &AppState, id: Uuid) -> AppResult<SavedConfiguration> {
    let start = Instant::now();
    let saved = state
        .db
        .get_configuration(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Configuration not found: {id}")))?;
    metrics::record_db_query("select", start.elapsed().as_secs_f64());
    Ok(saved)
}

/// Full saved result document
///
/// GET /api/v1/configurations/:id
pub async fn get_configuration(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<SavedConfiguration>> {
    let start = Instant::now();
    let saved = fetch_saved(&state, id).await?;
    metrics::record_http_request(
        "GET",
        "/api/v1/configurations/:id",
        200,
        start.elapsed().as_secs_f64(),
    );
    Ok(Json(saved))
}

/// The questionnaire behind a saved result, ready to be edited and resent
///
/// GET /api/v1/configurations/:id/input
pub async fn get_configuration_input(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ConfiguratorInput>> {
    let start = Instant::now();
    let saved = fetch_saved(&state, id).await?;
    metrics::record_http_request(
        "GET",
        "/api/v1/configurations/:id/input",
        200,
        start.elapsed().as_secs_f64(),
    );
    Ok(Json(saved.result.input))
}

/// Plain-text quote
///
/// GET /api/v1/configurations/:id/quote
pub async fn get_quote(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let start = Instant::now();
    let saved = fetch_saved(&state, id).await?;
    let text = quote::render_quote(saved.id, saved.created_at, &saved.result);

    metrics::record_http_request(
        "GET",
        "/api/v1/configurations/:id/quote",
        200,
        start.elapsed().as_secs_f64(),
    );

    Ok(([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], text))
}

/// Order lines for the order-management side
///
/// GET /api/v1/configurations/:id/order
pub async fn get_order_draft(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<OrderDraft>> {
    let start = Instant::now();
    let saved = fetch_saved(&state, id).await?;
    let draft = quote::order_draft(saved.id, &saved.result);

    metrics::record_http_request(
        "GET",
        "/api/v1/configurations/:id/order",
        200,
        start.elapsed().as_secs_f64(),
    );

    Ok(Json(draft))
}
