//! Kodo client metrics.
//!
//! - Request counters by operation and status
//! - Latency histograms
//! - Batch item outcomes and listing pages

use metrics::{counter, histogram};

/// Metric name constants.
pub mod names {
    /// Total remote requests by operation and status.
    pub const REQUESTS_TOTAL: &str = "kodo_requests_total";

    /// Request latency in seconds by operation.
    pub const LATENCY_SECONDS: &str = "kodo_request_latency_seconds";

    /// Batch items by outcome (success / failed).
    pub const BATCH_OPERATIONS_TOTAL: &str = "kodo_batch_operations_total";

    /// Listing pages fetched.
    pub const LIST_PAGES_TOTAL: &str = "kodo_list_pages_total";
}

/// Record a completed remote request. `status` is `-1` when no exchange completed.
pub fn record_request(operation: &str, status: i64, latency_ms: f64) {
    counter!(
        names::REQUESTS_TOTAL,
        "operation" => operation.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    histogram!(
        names::LATENCY_SECONDS,
        "operation" => operation.to_string()
    )
    .record(latency_ms / 1000.0);
}

/// Record item outcomes of one batch chunk.
pub fn record_batch_items(succeeded: u64, failed: u64) {
    counter!(names::BATCH_OPERATIONS_TOTAL, "outcome" => "success").increment(succeeded);
    counter!(names::BATCH_OPERATIONS_TOTAL, "outcome" => "failed").increment(failed);
}

pub fn record_list_page() {
    counter!(names::LIST_PAGES_TOTAL).increment(1);
}
