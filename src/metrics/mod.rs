//! Prometheus instrumentation for the creation pipeline.

use once_cell::sync::Lazy;
use prometheus::{
    register_histogram, register_int_counter_vec, Histogram, HistogramOpts, IntCounterVec,
};

const DEFAULT_BUCKETS: &[f64] = &[
    1.0, 5.0, 10.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0, 10000.0, 30000.0, 60000.0,
];

// Admission decisions, by kind
pub(crate) static ADMISSIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "fnexec_admissions_total",
        "Creation requests admitted by the coordinator",
        &["kind"] // miss or duplicate
    )
    .unwrap()
});

// Creation pipeline outcomes
pub(crate) static CREATIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "fnexec_creations_total",
        "Finished creation pipelines",
        &["outcome"] // success or failure
    )
    .unwrap()
});

// Environment cache lookups
pub(crate) static ENV_CACHE: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "fnexec_env_cache_lookups_total",
        "Environment cache lookups",
        &["result"] // hit or miss
    )
    .unwrap()
});

pub(crate) static CREATION_LATENCY: Lazy<Histogram> = Lazy::new(|| {
    let opts = HistogramOpts::new(
        "fnexec_creation_latency",
        "Creation pipeline latency in milliseconds",
    )
    .buckets(DEFAULT_BUCKETS.to_vec());
    register_histogram!(opts).unwrap()
});

/// Render every registered metric in the text exposition format.
pub fn gather_text() -> String {
    use prometheus::{Encoder, TextEncoder};

    let mut buffer = Vec::new();
    let encoder = TextEncoder::new();
    if let Err(e) = encoder.encode(&prometheus::gather(), &mut buffer) {
        log::error!("Failed to encode metrics: {}", e);
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}
