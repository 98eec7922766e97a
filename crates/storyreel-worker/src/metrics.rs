//! Prometheus metrics for the pipeline.

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Install the Prometheus exporter on `addr`.
pub fn init_metrics(addr: SocketAddr) -> anyhow::Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;
    Ok(())
}

/// Metric names as constants for consistency.
pub mod names {
    // Generation metrics
    pub const GENERATION_ATTEMPTS_TOTAL: &str = "storyreel_generation_attempts_total";
    pub const GENERATION_FAILURES_TOTAL: &str = "storyreel_generation_failures_total";
    pub const GENERATION_CANCELLED_TOTAL: &str = "storyreel_generation_cancelled_total";
    pub const GENERATION_DURATION_SECONDS: &str = "storyreel_generation_duration_seconds";

    // Pipeline metrics
    pub const ITEMS_PROCESSED_TOTAL: &str = "storyreel_items_processed_total";
    pub const BATCHES_TOTAL: &str = "storyreel_batches_total";
    pub const JOBS_TOTAL: &str = "storyreel_jobs_total";
}

/// Record a generative dispatch.
pub fn record_generation_attempt(operation: &str) {
    let labels = [("operation", operation.to_string())];
    counter!(names::GENERATION_ATTEMPTS_TOTAL, &labels).increment(1);
}

/// Record a generative call that exhausted its attempts.
pub fn record_generation_failure(operation: &str) {
    let labels = [("operation", operation.to_string())];
    counter!(names::GENERATION_FAILURES_TOTAL, &labels).increment(1);
}

/// Record a generative call stopped by cancellation.
pub fn record_generation_cancelled(operation: &str) {
    let labels = [("operation", operation.to_string())];
    counter!(names::GENERATION_CANCELLED_TOTAL, &labels).increment(1);
}

/// Record end-to-end duration of a generative call, retries included.
pub fn record_generation_duration(operation: &str, duration_secs: f64) {
    let labels = [("operation", operation.to_string())];
    histogram!(names::GENERATION_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record an item finishing Analyze+Script.
pub fn record_item_processed(outcome: &str) {
    let labels = [("outcome", outcome.to_string())];
    counter!(names::ITEMS_PROCESSED_TOTAL, &labels).increment(1);
}

/// Record a batch outcome.
pub fn record_batch(outcome: &str) {
    let labels = [("outcome", outcome.to_string())];
    counter!(names::BATCHES_TOTAL, &labels).increment(1);
}

/// Record a generation job reaching a terminal status.
pub fn record_job(kind: &str, status: &str) {
    let labels = [("kind", kind.to_string()), ("status", status.to_string())];
    counter!(names::JOBS_TOTAL, &labels).increment(1);
}
