//! # AtomicDocs Supervisor
//!
//! Launches the platform-specific documentation binary exactly once per
//! process and exposes a [`ReadySignal`] that flips after a settle delay.
//!
//! ```no_run
//! use std::time::Duration;
//! use atomicdocs_core::BinaryResolver;
//! use atomicdocs_supervisor::Supervisor;
//!
//! # async fn run() -> Result<(), atomicdocs_supervisor::SupervisorError> {
//! let binary = BinaryResolver::new("atomicdocs", "./bin").resolve()?;
//! let ready = Supervisor::global(Duration::from_millis(500)).ensure_started(&binary);
//! ready.wait().await;
//! # Ok(())
//! # }
//! ```

mod error;
mod ready;
mod spawner;
mod supervisor;

pub use error::{SupervisorError, SupervisorResult};
pub use ready::{ReadySignal, ReadyTrigger};
pub use spawner::{ProcessSpawner, SpawnedProcess, Spawner};
pub use supervisor::{SubprocessState, Supervisor};
