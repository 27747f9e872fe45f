//! Prometheus metrics for observability.
//!
//! This module provides metrics for monitoring the trawl server:
//! - HTTP request metrics (latency, counts, errors)
//! - Result cache occupancy (collected dynamically)
//! - Source health (collected dynamically)
//!
//! Core metrics (source queries, cache lookups, aggregation) are registered
//! into the same registry.

use once_cell::sync::Lazy;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, IntGaugeVec, Opts,
    Registry, TextEncoder,
};
use regex_lite::Regex;
use tracing::warn;
use trawl_core::SourceStatus;

use crate::state::AppState;

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// HTTP Request Metrics
// =============================================================================

/// HTTP request duration in seconds.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "trawl_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0,
        ]),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("trawl_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests currently in flight.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "trawl_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

/// Authentication failures.
pub static AUTH_FAILURES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("trawl_auth_failures_total", "Total authentication failures"),
        &["reason"],
    )
    .unwrap()
});

// =============================================================================
// Cache Metrics (collected dynamically)
// =============================================================================

/// Cached query entries across all sources.
pub static CACHE_ENTRIES: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("trawl_cache_entries", "Number of cached query entries").unwrap()
});

/// Results held by cached entries.
pub static CACHE_RESULTS: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("trawl_cache_results", "Number of results held in the cache").unwrap()
});

// =============================================================================
// Source Metrics (collected dynamically)
// =============================================================================

/// Registered sources by derived health status.
pub static SOURCES_BY_STATUS: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(
        Opts::new("trawl_sources_by_status", "Registered sources by health status"),
        &["status"],
    )
    .unwrap()
});

// =============================================================================
// Registration
// =============================================================================

fn register_metrics(registry: &Registry) {
    let server: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(HTTP_REQUEST_DURATION.clone()),
        Box::new(HTTP_REQUESTS_TOTAL.clone()),
        Box::new(HTTP_REQUESTS_IN_FLIGHT.clone()),
        Box::new(AUTH_FAILURES_TOTAL.clone()),
        Box::new(CACHE_ENTRIES.clone()),
        Box::new(CACHE_RESULTS.clone()),
        Box::new(SOURCES_BY_STATUS.clone()),
    ];

    for metric in server.into_iter().chain(trawl_core::metrics::all_metrics()) {
        registry.register(metric).unwrap();
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        warn!(error = %e, "Failed to encode metrics");
    }
    String::from_utf8(buffer).unwrap_or_default()
}

/// Refresh gauges from current application state before encoding.
pub fn collect_dynamic_metrics(state: &AppState) {
    let stats = state.cache().stats();
    CACHE_ENTRIES.set(stats.total_entries as i64);
    CACHE_RESULTS.set(stats.total_results as i64);

    let sources = state.registry().list();
    for status in SourceStatus::ALL {
        let count = sources.iter().filter(|s| s.status == status).count();
        SOURCES_BY_STATUS
            .with_label_values(&[status.as_str()])
            .set(count as i64);
    }
}

static SCOPE_SEGMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"/indexers/[^/]+").unwrap());
static NUMERIC_SEGMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"/\d+(/|$)").unwrap());

/// Normalize a path for metric labels (replace scopes and ids with placeholders).
pub fn normalize_path(path: &str) -> String {
    let result = SCOPE_SEGMENT.replace_all(path, "/indexers/{scope}");
    let result = NUMERIC_SEGMENT.replace_all(&result, "/{id}$1");
    result.to_string()
}
