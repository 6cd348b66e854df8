//! Test error types.

use std::fmt;

/// Errors that can occur while driving a test.
#[derive(Debug)]
pub enum TestError {
    /// Response body reading failed
    BodyRead(String),
    /// JSON deserialization failed
    Json(serde_json::Error),
    /// The mock server could not be started
    Bind(std::io::Error),
}

impl fmt::Display for TestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BodyRead(msg) => write!(f, "Body read error: {msg}"),
            Self::Json(e) => write!(f, "JSON error: {e}"),
            Self::Bind(e) => write!(f, "Bind error: {e}"),
        }
    }
}

impl std::error::Error for TestError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Json(e) => Some(e),
            Self::Bind(e) => Some(e),
            Self::BodyRead(_) => None,
        }
    }
}

impl From<serde_json::Error> for TestError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}

impl From<std::io::Error> for TestError {
    fn from(e: std::io::Error) -> Self {
        Self::Bind(e)
    }
}
