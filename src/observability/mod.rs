//! # Observability Infrastructure
//!
//! Structured logging and metrics collection for the Tollgate backend.

pub mod metrics;

use tracing_subscriber::EnvFilter;

use crate::config::ObservabilityConfig;
use crate::errors::{Error, Result};

pub use metrics::{init_metrics, MetricsRecorder};

/// Initialize structured logging from the observability configuration.
///
/// `RUST_LOG` takes precedence over the configured log level so operators
/// can raise verbosity without touching deployment config.
pub fn init_tracing(config: &ObservabilityConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .map_err(|e| Error::config(format!("Invalid log filter: {}", e)))?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let result = if config.json_logging {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    result.map_err(|e| Error::config(format!("Failed to initialize logging: {}", e)))
}

/// Initialize all observability components.
pub async fn init_observability(config: &ObservabilityConfig) -> Result<()> {
    init_tracing(config)?;

    if config.enable_metrics {
        init_metrics(config).await?;
    }

    tracing::info!(
        service_name = %config.service_name,
        log_level = %config.log_level,
        metrics_enabled = %config.enable_metrics,
        "Observability initialized"
    );

    Ok(())
}
