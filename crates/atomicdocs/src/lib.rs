//! # AtomicDocs
//!
//! A drop-in documentation gateway for host web applications.
//!
//! Installing the gateway into a host application:
//!
//! 1. launches the AtomicDocs documentation process once per host process,
//! 2. intercepts `GET /docs` and `GET /docs/json` and relays them to that
//!    process, streaming or buffering depending on the host's shape,
//! 3. reports the host's routes to the process once it is ready.
//!
//! Documentation failures never reach the host: an unreachable process
//! answers `/docs` with a 503 and lost registrations are logged.
//!
//! ## Stack-based host
//!
//! ```no_run
//! use atomicdocs::{DocsGateway, GatewayConfig};
//! use atomicdocs_host::StackApp;
//!
//! # async fn run() -> Result<(), atomicdocs::GatewayError> {
//! let gateway = DocsGateway::start(GatewayConfig::default())?;
//! let app = StackApp::new();
//! gateway.install(&app, None).apply_to_stack(&app)?;
//! // ...declare routes, start listening on 6767...
//! gateway.register(&app, 6767);
//! # Ok(())
//! # }
//! ```
//!
//! ## Table-based host
//!
//! ```no_run
//! use atomicdocs::{DocsGateway, GatewayConfig};
//! use atomicdocs_host::TableApp;
//!
//! # async fn run() -> Result<(), atomicdocs::GatewayError> {
//! let gateway = DocsGateway::start(GatewayConfig::default())?;
//! let app = TableApp::new();
//! gateway.install(&app, Some(3000)).apply_to_table(&app)?;
//! # Ok(())
//! # }
//! ```

pub mod adapters;
mod error;
mod gateway;
mod middleware;

pub use adapters::{extract_routes, extract_stack_routes, extract_table_routes};
pub use error::{GatewayError, GatewayResult};
pub use gateway::DocsGateway;
pub use middleware::{DocsContextMiddleware, DocsStackMiddleware, GatewayMiddleware};

pub use atomicdocs_bridge::{RegistrationOutcome, RelayMode};
pub use atomicdocs_core::{DocsMount, GatewayConfig, RegistrationPayload, RouteDescriptor};
pub use atomicdocs_host::HostKind;
pub use atomicdocs_supervisor::{ReadySignal, Supervisor};

/// Logging and metrics setup.
pub use atomicdocs_telemetry as telemetry;
