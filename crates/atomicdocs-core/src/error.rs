//! Error types shared by the AtomicDocs crates.

use thiserror::Error;

/// Errors raised by core operations.
///
/// Only [`CoreError::UnsupportedPlatform`] and [`CoreError::Config`] are ever
/// surfaced to the host application; everything else is handled inside the
/// gateway.
#[derive(Debug, Error)]
pub enum CoreError {
    /// No documentation binary exists for this OS/architecture pair.
    #[error("Unsupported platform: {os}-{arch}")]
    UnsupportedPlatform {
        /// Operating system reported by the host.
        os: String,
        /// CPU architecture reported by the host.
        arch: String,
    },

    /// A route descriptor violated its invariants.
    #[error("Invalid route: {message}")]
    InvalidRoute {
        /// Error message.
        message: String,
    },

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config {
        /// Error message.
        message: String,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CoreError {
    /// Create an unsupported platform error.
    pub fn unsupported_platform(os: impl Into<String>, arch: impl Into<String>) -> Self {
        Self::UnsupportedPlatform {
            os: os.into(),
            arch: arch.into(),
        }
    }

    /// Create an invalid route error.
    pub fn invalid_route(message: impl Into<String>) -> Self {
        Self::InvalidRoute {
            message: message.into(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Whether this error must abort gateway startup.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::UnsupportedPlatform { .. } | Self::Config { .. })
    }

    /// Get the error category for metrics.
    pub fn category(&self) -> &'static str {
        match self {
            Self::UnsupportedPlatform { .. } => "platform",
            Self::InvalidRoute { .. } => "route",
            Self::Config { .. } => "config",
            Self::Io(_) => "io",
            Self::Json(_) => "json",
        }
    }
}

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_platform_display() {
        let err = CoreError::unsupported_platform("freebsd", "x64");
        assert_eq!(err.to_string(), "Unsupported platform: freebsd-x64");
        assert!(err.is_fatal());
        assert_eq!(err.category(), "platform");
    }

    #[test]
    fn test_non_fatal_errors() {
        assert!(!CoreError::invalid_route("empty path").is_fatal());
        assert!(CoreError::config("bad port").is_fatal());
    }
}
