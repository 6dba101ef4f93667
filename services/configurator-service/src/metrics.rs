// =============================================================================
// METRICS MODULE
// =============================================================================
// Prometheus metrics for the configurator, scraped from GET /metrics.
//
// - Counter: calculations, unmatched lines, cache hits/misses, HTTP requests
// - Gauge: size of the last loaded catalog
// - Histogram: HTTP, engine, database and Redis latency
// =============================================================================

use anyhow::Result;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};

use crate::models::ConfigurationResult;

// =============================================================================
// METRIC NAMES
// =============================================================================

/// HTTP request counter
/// Labels: method, endpoint, status
pub const HTTP_REQUESTS_TOTAL: &str = "http_requests_total";

/// HTTP request duration histogram
/// Labels: method, endpoint
pub const HTTP_REQUEST_DURATION_SECONDS: &str = "http_request_duration_seconds";

/// Calculations run, labelled by outcome (success/rejected)
pub const CONFIGURATOR_CALCULATIONS_TOTAL: &str = "configurator_calculations_total";

/// Time spent inside the selection engine
pub const CONFIGURATOR_CALCULATION_DURATION_SECONDS: &str =
    "configurator_calculation_duration_seconds";

/// Requested lines the catalog could not fill
/// Labels: line (outdoor_camera, recorder, ups, ...)
pub const CONFIGURATOR_UNMATCHED_LINES_TOTAL: &str = "configurator_unmatched_lines_total";

/// Catalog snapshot lookups in Redis
/// Labels: result (hit/miss)
pub const CATALOG_CACHE_LOOKUPS_TOTAL: &str = "catalog_cache_lookups_total";

/// Number of products in the last loaded snapshot
pub const CATALOG_PRODUCTS: &str = "catalog_products";

/// Database query duration histogram
/// Labels: operation
pub const DB_QUERY_DURATION_SECONDS: &str = "db_query_duration_seconds";

/// Redis operation duration histogram
/// Labels: operation
pub const REDIS_OPERATION_DURATION_SECONDS: &str = "redis_operation_duration_seconds";

// =============================================================================
// SETUP FUNCTION
// =============================================================================
/// Install the Prometheus recorder and return the handle used by /metrics.
pub fn setup_metrics() -> Result<PrometheusHandle> {
    // 1ms .. 10s
    let latency_buckets = &[
        0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
    ];
    // The engine itself runs in micro- to milliseconds
    let engine_buckets = &[0.00005, 0.0001, 0.00025, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.05];

    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full(HTTP_REQUEST_DURATION_SECONDS.to_string()),
            latency_buckets,
        )?
        .set_buckets_for_metric(
            Matcher::Full(CONFIGURATOR_CALCULATION_DURATION_SECONDS.to_string()),
            engine_buckets,
        )?
        .set_buckets_for_metric(
            Matcher::Full(DB_QUERY_DURATION_SECONDS.to_string()),
            latency_buckets,
        )?
        .set_buckets_for_metric(
            Matcher::Full(REDIS_OPERATION_DURATION_SECONDS.to_string()),
            latency_buckets,
        )?
        .install_recorder()?;

    describe_counter!(HTTP_REQUESTS_TOTAL, "Total number of HTTP requests received");
    describe_histogram!(HTTP_REQUEST_DURATION_SECONDS, "HTTP request latency in seconds");
    describe_counter!(
        CONFIGURATOR_CALCULATIONS_TOTAL,
        "Total number of configuration calculations"
    );
    describe_histogram!(
        CONFIGURATOR_CALCULATION_DURATION_SECONDS,
        "Selection engine run time in seconds"
    );
    describe_counter!(
        CONFIGURATOR_UNMATCHED_LINES_TOTAL,
        "Requested configuration lines with no matching product"
    );
    describe_counter!(
        CATALOG_CACHE_LOOKUPS_TOTAL,
        "Catalog snapshot cache lookups by result"
    );
    describe_gauge!(CATALOG_PRODUCTS, "Products in the last loaded catalog snapshot");
    describe_histogram!(DB_QUERY_DURATION_SECONDS, "Database query latency in seconds");
    describe_histogram!(
        REDIS_OPERATION_DURATION_SECONDS,
        "Redis operation latency in seconds"
    );

    Ok(handle)
}

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// Record an HTTP request
pub fn record_http_request(method: &str, endpoint: &str, status: u16, duration_secs: f64) {
    counter!(
        HTTP_REQUESTS_TOTAL,
        "method" => method.to_string(),
        "endpoint" => endpoint.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    histogram!(
        HTTP_REQUEST_DURATION_SECONDS,
        "method" => method.to_string(),
        "endpoint" => endpoint.to_string()
    )
    .record(duration_secs);
}

/// Record one engine run.
///
/// `result` is `None` when the questionnaire was rejected.
pub fn record_calculation(result: Option<&ConfigurationResult>, duration_secs: f64) {
    let outcome = if result.is_some() { "success" } else { "rejected" };
    counter!(CONFIGURATOR_CALCULATIONS_TOTAL, "outcome" => outcome).increment(1);
    histogram!(CONFIGURATOR_CALCULATION_DURATION_SECONDS).record(duration_secs);

    if let Some(result) = result {
        for line in result.unmatched_lines() {
            counter!(CONFIGURATOR_UNMATCHED_LINES_TOTAL, "line" => line.as_ref().to_string())
                .increment(1);
        }
    }
}

/// Record a catalog cache lookup
pub fn record_catalog_cache(hit: bool) {
    let result = if hit { "hit" } else { "miss" };
    counter!(CATALOG_CACHE_LOOKUPS_TOTAL, "result" => result).increment(1);
}

/// Update the catalog size gauge
pub fn set_catalog_size(products: usize) {
    gauge!(CATALOG_PRODUCTS).set(products as f64);
}

/// Record database query duration
pub fn record_db_query(operation: &str, duration_secs: f64) {
    histogram!(
        DB_QUERY_DURATION_SECONDS,
        "operation" => operation.to_string()
    )
    .record(duration_secs);
}

/// Record Redis operation duration
pub fn record_redis_operation(operation: &str, duration_secs: f64) {
    histogram!(
        REDIS_OPERATION_DURATION_SECONDS,
        "operation" => operation.to_string()
    )
    .record(duration_secs);
}
