//! Error types for the bridge.

use std::time::Duration;

use atomicdocs_core::CoreError;
use thiserror::Error;

/// Errors raised while talking to the documentation subprocess.
///
/// None of these reach the host's request pipeline; the proxy turns them into
/// a 503 and registration logs and drops them.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The subprocess could not be reached.
    #[error("AtomicDocs server not reachable: {message}")]
    Unavailable {
        /// Error message.
        message: String,
    },

    /// The subprocess did not answer before the deadline.
    #[error("AtomicDocs server timed out after {after:?}")]
    Timeout {
        /// The deadline that elapsed.
        after: Duration,
    },

    /// The subprocess answered but the body could not be read.
    #[error("Failed to read response: {message}")]
    Body {
        /// Error message.
        message: String,
    },

    /// The payload could not be encoded.
    #[error(transparent)]
    Payload(#[from] CoreError),

    /// HTTP client construction or request error.
    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),
}

impl BridgeError {
    /// Create an unavailable error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    /// Create a body read error.
    pub fn body(message: impl Into<String>) -> Self {
        Self::Body {
            message: message.into(),
        }
    }

    /// Get the error category for metrics.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Unavailable { .. } => "unavailable",
            Self::Timeout { .. } => "timeout",
            Self::Body { .. } => "body",
            Self::Payload(_) => "payload",
            Self::Request(_) => "request",
        }
    }
}

/// Result type for bridge operations.
pub type BridgeResult<T> = Result<T, BridgeError>;
