//! Structured logging for the gateway.
//!
//! The gateway only emits `tracing` events; installing a subscriber is left to
//! the host. [`init_logging`] is the convenience used by the demos and by
//! hosts without their own subscriber. Output always goes to standard error.
//!
//! # Example
//!
//! ```rust,ignore
//! use atomicdocs_telemetry::logging::{init_logging, LogConfig};
//!
//! init_logging(&LogConfig::default())?;
//! tracing::info!(routes = 4, "registered routes with AtomicDocs");
//! ```

use atomicdocs_core::LoggingSettings;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::error::TelemetryError;
use crate::TelemetryResult;

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Whether logging is enabled.
    pub enabled: bool,

    /// Filter directive (e.g., "info", "atomicdocs=debug").
    pub level: String,

    /// Whether to output JSON format.
    pub json_format: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: "info".to_string(),
            json_format: false,
        }
    }
}

impl From<&LoggingSettings> for LogConfig {
    fn from(settings: &LoggingSettings) -> Self {
        Self {
            level: settings.level.clone(),
            json_format: settings.json,
            ..Self::default()
        }
    }
}

/// Initializes the logging subsystem.
///
/// # Errors
///
/// Returns `TelemetryError::LoggingInit` if the filter is invalid or a global
/// subscriber is already installed.
pub fn init_logging(config: &LogConfig) -> TelemetryResult<()> {
    if !config.enabled {
        return Ok(());
    }

    let filter = EnvFilter::try_new(&config.level)
        .map_err(|e| TelemetryError::LoggingInit(format!("Invalid log level: {e}")))?;

    if config.json_format {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_filter(filter);

        tracing_subscriber::registry()
            .with(fmt_layer)
            .try_init()
            .map_err(|e| TelemetryError::LoggingInit(e.to_string()))?;
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_filter(filter);

        tracing_subscriber::registry()
            .with(fmt_layer)
            .try_init()
            .map_err(|e| TelemetryError::LoggingInit(e.to_string()))?;
    }

    Ok(())
}

/// Standard log targets and field names.
pub mod fields {
    /// Target for re-emitted subprocess output.
    pub const SUBPROCESS_TARGET: &str = "atomicdocs::subprocess";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default() {
        let config = LogConfig::default();
        assert!(config.enabled);
        assert!(!config.json_format);
        assert_eq!(config.level, "info");
    }

    #[test]
    fn test_from_settings() {
        let settings = LoggingSettings {
            level: "atomicdocs=trace".to_string(),
            json: true,
        };
        let config = LogConfig::from(&settings);
        assert_eq!(config.level, "atomicdocs=trace");
        assert!(config.json_format);
    }

    #[test]
    fn test_invalid_level() {
        let config = LogConfig {
            level: "atomicdocs=verbose".to_string(),
            ..LogConfig::default()
        };
        assert!(matches!(
            init_logging(&config),
            Err(TelemetryError::LoggingInit(_))
        ));
    }

    #[test]
    fn test_disabled_is_noop() {
        let config = LogConfig {
            enabled: false,
            ..LogConfig::default()
        };
        assert!(init_logging(&config).is_ok());
    }
}
