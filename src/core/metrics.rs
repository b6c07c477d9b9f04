//! Prometheus metrics for legacy calls and backend fetches.
//!
//! Exported by pingora's prometheus HTTP service when `prometheus` is configured.

use once_cell::sync::Lazy;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, register_int_gauge_vec, HistogramOpts,
    HistogramVec, IntCounterVec, IntGaugeVec,
};

const DEFAULT_BUCKETS: &[f64] = &[
    1.0, 2.0, 5.0, 10.0, 20.0, 50.0, 100.0, 200.0, 500.0, 1000.0, 2000.0, 5000.0, 10000.0, 30000.0,
    60000.0,
];

// Legacy calls by outcome
pub static LEGACY_CALLS: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "legacy_calls_total",
        "The total number of legacy calls served by pinglegacy",
        &[
            "legacy",  // Legacy path
            "outcome", // "ok" or error kind
        ]
    )
    .unwrap()
});

// Backend fetches by outcome
pub static BACKEND_FETCHES: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "backend_fetches_total",
        "The total number of rationalized backend fetches",
        &["url", "outcome"]
    )
    .unwrap()
});

pub static BACKEND_LATENCY: Lazy<HistogramVec> = Lazy::new(|| {
    let opts = HistogramOpts::new(
        "backend_fetch_latency",
        "Rationalized backend fetch latency in milliseconds",
    )
    .buckets(DEFAULT_BUCKETS.to_vec());
    register_histogram_vec!(opts, &["url"]).unwrap()
});

pub static POOL_IN_FLIGHT: Lazy<IntGaugeVec> = Lazy::new(|| {
    register_int_gauge_vec!(
        "endpoint_pool_in_flight",
        "Tasks currently holding a worker slot of an endpoint pool",
        &["url"]
    )
    .unwrap()
});
