//! Observability for the exporter itself
//!
//! Provides:
//! - Prometheus self-metrics (scrape duration, controller requests, rate-limit pauses,
//!   per-class failures)
//! - Structured JSON logging helpers with tracing

use crate::error::CollectorError;
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge,
    Histogram, IntCounter, IntCounterVec, IntGauge,
};
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{info, warn};

/// Histogram buckets for a full collection cycle (in seconds)
const CYCLE_BUCKETS: &[f64] = &[0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 20.0, 30.0, 60.0, 120.0];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<ExporterMetricsInner> = OnceLock::new();

struct ExporterMetricsInner {
    scrape_duration_seconds: Histogram,
    api_requests: IntCounterVec,
    rate_limit_pauses: IntCounter,
    class_failures: IntCounterVec,
    records_exported: IntGauge,
    cycle_timeouts: IntCounter,
}

impl ExporterMetricsInner {
    fn new() -> Self {
        Self {
            scrape_duration_seconds: register_histogram!(
                "nsx_exporter_scrape_duration_seconds",
                "Time spent running one collection cycle against the controller",
                CYCLE_BUCKETS.to_vec()
            )
            .expect("Failed to register scrape_duration_seconds"),

            api_requests: register_int_counter_vec!(
                "nsx_exporter_api_requests_total",
                "Controller API requests by method and outcome",
                &["method", "outcome"]
            )
            .expect("Failed to register api_requests_total"),

            rate_limit_pauses: register_int_counter!(
                "nsx_exporter_rate_limit_pauses_total",
                "Number of pauses taken by the controller call rate limiter"
            )
            .expect("Failed to register rate_limit_pauses_total"),

            class_failures: register_int_counter_vec!(
                "nsx_exporter_class_failures_total",
                "Resource class collections that failed",
                &["class"]
            )
            .expect("Failed to register class_failures_total"),

            records_exported: register_int_gauge!(
                "nsx_exporter_records_exported",
                "Exposition records rendered in the most recent scrape"
            )
            .expect("Failed to register records_exported"),

            cycle_timeouts: register_int_counter!(
                "nsx_exporter_cycle_timeouts_total",
                "Collection cycles abandoned after exceeding the cycle timeout"
            )
            .expect("Failed to register cycle_timeouts_total"),
        }
    }
}

/// Handle to the exporter's self-metrics
///
/// Clones share the same global metrics.
#[derive(Clone)]
pub struct ExporterMetrics {
    _private: (),
}

impl Default for ExporterMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ExporterMetrics {
    /// Create a handle, registering the global metrics on first use
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(ExporterMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &ExporterMetricsInner {
        GLOBAL_METRICS.get().expect("Metrics not initialized")
    }

    pub fn observe_scrape_duration(&self, duration_secs: f64) {
        self.inner().scrape_duration_seconds.observe(duration_secs);
    }

    pub fn inc_api_request(&self, method: &str, outcome: &str) {
        self.inner()
            .api_requests
            .with_label_values(&[method, outcome])
            .inc();
    }

    pub fn inc_rate_limit_pauses(&self) {
        self.inner().rate_limit_pauses.inc();
    }

    pub fn inc_class_failure(&self, class: &str) {
        self.inner().class_failures.with_label_values(&[class]).inc();
    }

    pub fn set_records_exported(&self, count: i64) {
        self.inner().records_exported.set(count);
    }

    pub fn inc_cycle_timeouts(&self) {
        self.inner().cycle_timeouts.inc();
    }
}

/// Structured logger for exporter events
#[derive(Clone)]
pub struct StructuredLogger {
    controller: String,
}

impl StructuredLogger {
    pub fn new(controller: impl Into<String>) -> Self {
        Self {
            controller: controller.into(),
        }
    }

    pub fn log_startup(&self, version: &str, port: u16) {
        info!(
            event = "exporter_started",
            controller = %self.controller,
            exporter_version = %version,
            port = port,
            "NSX exporter started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "exporter_shutdown",
            controller = %self.controller,
            reason = %reason,
            "NSX exporter shutting down"
        );
    }

    /// A resource class could not be collected this cycle
    pub fn log_class_failure(&self, class: &str, error: &CollectorError) {
        warn!(
            event = "class_failed",
            controller = %self.controller,
            class = %class,
            kind = error.kind(),
            error = %error,
            "Resource class collection failed, skipping for this cycle"
        );
    }

    pub fn log_cycle_timeout(&self, timeout: Duration) {
        warn!(
            event = "cycle_timeout",
            controller = %self.controller,
            timeout_secs = timeout.as_secs(),
            "Collection cycle exceeded its timeout"
        );
    }
}
