//! # CBAM Telemetry
//!
//! Structured logging and Prometheus metrics for the emission engine.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use cbam_telemetry::{init_telemetry, TelemetryConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     let _guard = init_telemetry(&TelemetryConfig::from_env())?;
//!     tracing::info!("engine started");
//!     Ok(())
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `OTEL_SERVICE_NAME` | `cbam-emissions` | Service name in log lines |
//! | `CBAM_LOG_LEVEL` | `info` | Log level filter (falls back to `RUST_LOG`) |
//! | `CBAM_CONSOLE_OUTPUT` | `true` | Write logs to the console |
//! | `CBAM_JSON_LOGS` | `false` | JSON log output (`true` inside containers) |

mod config;
mod logging;
mod metrics;

pub use config::TelemetryConfig;
pub use logging::{build_filter, init_logging};
pub use metrics::*;

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),

    #[error("Failed to initialize metrics: {0}")]
    MetricsInit(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Guard that logs shutdown when dropped.
pub struct TelemetryGuard {
    service_name: String,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::info!(service = %self.service_name, "Telemetry shut down");
    }
}

/// Initialize logging and metrics.
///
/// Keep the returned guard alive for the lifetime of the process.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    init_logging(config)?;
    register_metrics()?;

    Ok(TelemetryGuard {
        service_name: config.service_name.clone(),
    })
}

/// Increment a counter, optionally labelled.
#[macro_export]
macro_rules! metric_inc {
    ($metric:expr) => {
        $metric.inc()
    };
    ($metric:expr, $($label:expr),+) => {
        $metric.with_label_values(&[$($label),+]).inc()
    };
}
