//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Source queries (outcome and latency per source)
//! - The result cache (hits and misses)
//! - Aggregation (merged result counts, rejected filters)

use once_cell::sync::Lazy;
use prometheus::{Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Source Metrics
// =============================================================================

/// Live source queries by outcome.
pub static SOURCE_QUERIES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "trawl_source_queries_total",
            "Total live queries sent to sources",
        ),
        &["source", "status"], // status: "success", "error", "timeout"
    )
    .unwrap()
});

/// Live source query duration in seconds.
pub static SOURCE_QUERY_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "trawl_source_query_duration_seconds",
            "Duration of live source queries",
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]),
        &["source"],
    )
    .unwrap()
});

// =============================================================================
// Cache Metrics
// =============================================================================

/// Cache lookups by result.
pub static CACHE_LOOKUPS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("trawl_cache_lookups_total", "Total result cache lookups"),
        &["result"], // "hit", "miss"
    )
    .unwrap()
});

// =============================================================================
// Aggregation Metrics
// =============================================================================

/// Merged results returned per aggregate query.
pub static AGGREGATE_RESULTS: Lazy<Histogram> = Lazy::new(|| {
    Histogram::with_opts(
        HistogramOpts::new(
            "trawl_aggregate_results",
            "Number of merged results returned per query",
        )
        .buckets(vec![0.0, 1.0, 10.0, 50.0, 100.0, 250.0, 500.0, 1000.0]),
    )
    .unwrap()
});

/// Requests rejected for a malformed filter expression.
pub static FILTER_REJECTIONS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "trawl_filter_rejections_total",
        "Total requests rejected for an invalid filter expression",
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(SOURCE_QUERIES_TOTAL.clone()),
        Box::new(SOURCE_QUERY_DURATION.clone()),
        Box::new(CACHE_LOOKUPS_TOTAL.clone()),
        Box::new(AGGREGATE_RESULTS.clone()),
        Box::new(FILTER_REJECTIONS_TOTAL.clone()),
    ]
}
