//! Telemetry error types.

use thiserror::Error;

/// Errors raised while installing logging or metrics.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The tracing subscriber could not be installed.
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),

    /// The metrics recorder could not be installed.
    #[error("Failed to initialize metrics: {0}")]
    MetricsInit(String),
}
