//! Logging and metrics for the AtomicDocs gateway.
//!
//! Logs go to standard error through `tracing-subscriber`, so failures that
//! the gateway reports (a subprocess that could not be spawned, an abandoned
//! registration) land on the host process's stderr alongside its own output.
//!
//! # Standard Metrics
//!
//! | Metric | Type | Labels |
//! |--------|------|--------|
//! | `atomicdocs_proxy_requests_total` | Counter | `outcome` |
//! | `atomicdocs_proxy_duration_seconds` | Histogram | `outcome` |
//! | `atomicdocs_registrations_total` | Counter | `outcome` |
//! | `atomicdocs_subprocess_spawns_total` | Counter | `outcome` |

#![doc(html_root_url = "https://docs.rs/atomicdocs-telemetry/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::TelemetryError;
pub use logging::{init_logging, LogConfig};
pub use metrics::{init_metrics, render_metrics};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
