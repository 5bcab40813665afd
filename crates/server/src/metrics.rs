//! Application metrics for Prometheus monitoring.
//!
//! This module provides:
//! - Prometheus metrics recorder initialization
//! - Metric definitions (counters, histograms, gauges)
//! - Helper functions for recording metrics
//! - The request-tracking middleware

use std::sync::OnceLock;
use std::time::{Duration, Instant};

use axum::extract::{MatchedPath, Request};
use axum::middleware::Next;
use axum::response::Response;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Global Prometheus handle for rendering metrics.
static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize the Prometheus metrics recorder.
///
/// This should be called once at application startup, before any metrics are recorded.
/// Returns `true` if initialization succeeded, `false` if already initialized.
pub fn init_metrics() -> bool {
    if PROMETHEUS_HANDLE.get().is_some() {
        return false;
    }

    let recorder = PrometheusBuilder::new().build_recorder();
    let handle = recorder.handle();

    if metrics::set_global_recorder(recorder).is_err() {
        tracing::warn!("Failed to set global metrics recorder (already set)");
        return false;
    }

    if PROMETHEUS_HANDLE.set(handle).is_err() {
        tracing::warn!("Failed to store Prometheus handle (already set)");
    }

    describe_metrics();

    tracing::info!("Prometheus metrics initialized");
    true
}

fn describe_metrics() {
    describe_counter!(
        "agencydesk_requests_total",
        "Total number of API requests by endpoint and status"
    );
    describe_histogram!(
        "agencydesk_request_duration_seconds",
        "Duration of API requests in seconds"
    );
    describe_gauge!(
        "agencydesk_realtime_subscribers",
        "Open server-sent event streams"
    );
    describe_counter!(
        "agencydesk_uploads_bytes_total",
        "Bytes written to object storage by bucket"
    );
}

/// Render current metrics in Prometheus text format.
///
/// Returns `None` if metrics are not initialized.
pub fn render_metrics() -> Option<String> {
    PROMETHEUS_HANDLE.get().map(|h| h.render())
}

/// Record a completed API request.
///
/// `endpoint` is the matched route template (`/api/clients/{id}`), never the
/// raw path, so ids don't explode label cardinality.
pub fn record_request(endpoint: &str, status: &str, duration: Duration) {
    counter!("agencydesk_requests_total", "endpoint" => endpoint.to_string(), "status" => status.to_string())
        .increment(1);
    histogram!("agencydesk_request_duration_seconds", "endpoint" => endpoint.to_string())
        .record(duration.as_secs_f64());
}

pub fn record_upload(bucket: &str, bytes: u64) {
    counter!("agencydesk_uploads_bytes_total", "bucket" => bucket.to_string()).increment(bytes);
}

/// Counts an open SSE stream for as long as it is alive.
pub struct SubscriberGauge(());

impl SubscriberGauge {
    pub fn open() -> Self {
        gauge!("agencydesk_realtime_subscribers").increment(1.0);
        Self(())
    }
}

impl Drop for SubscriberGauge {
    fn drop(&mut self) {
        gauge!("agencydesk_realtime_subscribers").decrement(1.0);
    }
}

/// Middleware: time every request and record it under its route template.
pub async fn track_requests(request: Request, next: Next) -> Response {
    let endpoint = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());
    let start = Instant::now();
    let response = next.run(request).await;
    record_request(&endpoint, response.status().as_str(), start.elapsed());
    response
}
