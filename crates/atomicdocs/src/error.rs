//! Gateway error types.

use atomicdocs_bridge::BridgeError;
use atomicdocs_core::CoreError;
use atomicdocs_host::HostKind;
use thiserror::Error;

/// Errors returned to the host while setting up the gateway.
///
/// Nothing here is produced while serving requests.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Platform resolution or configuration failed.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The outbound HTTP clients could not be built.
    #[error(transparent)]
    Bridge(#[from] BridgeError),

    /// Middleware was applied to a host of the other kind.
    #[error("middleware built for a {expected} host cannot be applied to a {found} host")]
    HostMismatch {
        /// Kind the middleware was built for.
        expected: &'static str,
        /// Kind of the host it was applied to.
        found: &'static str,
    },
}

impl GatewayError {
    /// Create a host mismatch error.
    pub fn host_mismatch(expected: HostKind, found: HostKind) -> Self {
        Self::HostMismatch {
            expected: expected.as_str(),
            found: found.as_str(),
        }
    }

    /// Get the error category for metrics.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Core(e) => e.category(),
            Self::Bridge(e) => e.category(),
            Self::HostMismatch { .. } => "host",
        }
    }
}

/// Result type for gateway setup.
pub type GatewayResult<T> = Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_platform_passes_through() {
        let err = GatewayError::from(CoreError::unsupported_platform("plan9", "mips"));
        assert_eq!(err.to_string(), "Unsupported platform: plan9-mips");
        assert_eq!(err.category(), "platform");
    }

    #[test]
    fn test_host_mismatch() {
        let err = GatewayError::host_mismatch(HostKind::StackBased, HostKind::TableBased);
        assert_eq!(
            err.to_string(),
            "middleware built for a stack host cannot be applied to a table host"
        );
    }
}
