//! # Metrics Collection
//!
//! Prometheus metrics for the authentication stack.

use std::net::SocketAddr;
use std::sync::Arc;

use metrics::{counter, describe_counter, Unit};
use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::config::ObservabilityConfig;
use crate::errors::{Error, Result};

/// Metrics recorder that tracks application metrics
#[derive(Debug, Clone, Default)]
pub struct MetricsRecorder;

impl MetricsRecorder {
    /// Create a new metrics recorder instance
    pub fn new() -> Self {
        Self
    }

    /// Record an authentication attempt outcome
    pub fn record_authentication(&self, status: &str) {
        let labels = [("status", status.to_string())];
        counter!("auth_attempts_total", &labels).increment(1);
    }

    /// Record an HTTP request
    pub fn record_http_request(&self, method: &str, path: &str, status: u16) {
        let request_labels = [("method", method.to_string()), ("path", path.to_string())];
        counter!("http_requests_total", &request_labels).increment(1);

        let status_label = [("status", status.to_string())];
        counter!("http_responses_total", &status_label).increment(1);
    }

    /// Register authentication metric descriptions
    pub fn register_auth_metrics(&self) {
        describe_counter!(
            "auth_attempts_total",
            Unit::Count,
            "Authentication attempts by outcome status"
        );
        describe_counter!("http_requests_total", Unit::Count, "HTTP requests received");
        describe_counter!("http_responses_total", Unit::Count, "HTTP responses by status code");
    }
}

/// Global metrics recorder instance
static METRICS: once_cell::sync::Lazy<Arc<RwLock<Option<MetricsRecorder>>>> =
    once_cell::sync::Lazy::new(|| Arc::new(RwLock::new(None)));

/// Initialize metrics collection and Prometheus exporter
pub async fn init_metrics(config: &ObservabilityConfig) -> Result<()> {
    if !config.enable_metrics {
        return Ok(());
    }

    let metrics_addr = match config.metrics_bind_address() {
        Some(addr) => addr,
        None => {
            warn!("Metrics disabled: no bind address configured");
            return Ok(());
        }
    };

    let socket_addr: SocketAddr = metrics_addr.parse().map_err(|e| {
        Error::config(format!("Invalid metrics bind address '{}': {}", metrics_addr, e))
    })?;

    let builder = PrometheusBuilder::new()
        .with_http_listener(socket_addr)
        .add_global_label("service", &config.service_name);

    builder
        .install()
        .map_err(|e| Error::config(format!("Failed to initialize metrics exporter: {}", e)))?;

    let recorder = MetricsRecorder::new();
    {
        let mut metrics = METRICS.write().await;
        *metrics = Some(recorder.clone());
    }

    recorder.register_auth_metrics();

    info!(
        metrics_addr = %metrics_addr,
        service_name = %config.service_name,
        "Metrics collection initialized"
    );

    Ok(())
}

/// Get the global metrics recorder
pub async fn get_metrics() -> Option<MetricsRecorder> {
    METRICS.read().await.clone()
}

/// Record an authentication outcome using the global metrics recorder
pub async fn record_authentication(status: &str) {
    if let Some(metrics) = get_metrics().await {
        metrics.record_authentication(status);
    }
}

/// Record an HTTP request using the global metrics recorder
pub async fn record_http_request(method: &str, path: &str, status: u16) {
    if let Some(metrics) = get_metrics().await {
        metrics.record_http_request(method, path, status);
    }
}
