//! Metrics collection and exposition.
//!
//! # Metrics
//! - `sidecar_proxy_requests_total` (counter): proxied requests by method,
//!   status
//! - `sidecar_config_writes_total` / `sidecar_config_reloads_total`
//!   (counters): managed-file churn
//! - `sidecar_alerts_pushed_total` (counter): alerts re-asserted upstream
//! - `sidecar_refresh_errors_total` (counter): failed refresh pushes

use std::net::SocketAddr;

use axum::http::Method;
use metrics_exporter_prometheus::PrometheusBuilder;

/// Start the Prometheus exposition endpoint. Failure is logged, not fatal;
/// the sidecar works without metrics.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "metrics exporter listening"),
        Err(err) => tracing::error!(error = %err, "failed to install metrics exporter"),
    }
}

pub fn record_proxy_request(method: &Method, status: u16) {
    metrics::counter!(
        "sidecar_proxy_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

pub fn record_config_write() {
    metrics::counter!("sidecar_config_writes_total").increment(1);
}

pub fn record_config_reload() {
    metrics::counter!("sidecar_config_reloads_total").increment(1);
}

pub fn record_alerts_pushed(count: usize) {
    metrics::counter!("sidecar_alerts_pushed_total").increment(count as u64);
}

pub fn record_refresh_error() {
    metrics::counter!("sidecar_refresh_errors_total").increment(1);
}
