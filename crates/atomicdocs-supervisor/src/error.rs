//! Supervisor error types.

use std::path::PathBuf;

use atomicdocs_core::CoreError;
use thiserror::Error;

/// Errors raised while launching the documentation subprocess.
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// The binary could not be resolved for this platform.
    #[error(transparent)]
    Resolve(#[from] CoreError),

    /// The operating system refused to start the binary.
    #[error("failed to spawn {}: {source}", path.display())]
    Spawn {
        /// Binary that was launched.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl SupervisorError {
    /// Create a spawn error.
    pub fn spawn(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Spawn {
            path: path.into(),
            source,
        }
    }
}

/// Result type for supervisor operations.
pub type SupervisorResult<T> = Result<T, SupervisorError>;
