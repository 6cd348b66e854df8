//! # AtomicDocs Core
//!
//! Shared vocabulary of the AtomicDocs gateway.
//!
//! - [`RouteDescriptor`]: one `(method, path, handler)` entry extracted from a
//!   host application
//! - [`RegistrationPayload`]: the body shipped to the documentation process
//! - [`DocsMount`]: the reserved `/docs` paths
//! - [`BinaryResolver`]: maps the running platform to a documentation binary
//! - [`GatewayConfig`]: layered configuration (defaults, file, environment)
//!
//! ## Example
//!
//! ```
//! use atomicdocs_core::{RegistrationPayload, RouteDescriptor};
//!
//! let routes = vec![
//!     RouteDescriptor::new("get", "/users/:id", "get_user").unwrap(),
//! ];
//! let payload = RegistrationPayload::new(routes, 6767);
//! let bytes = payload.to_json_vec().unwrap();
//!
//! let decoded = RegistrationPayload::from_slice(&bytes).unwrap();
//! assert_eq!(decoded.routes[0].method, "GET");
//! assert_eq!(decoded.port, 6767);
//! ```

#![doc(html_root_url = "https://docs.rs/atomicdocs-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod mount;
pub mod payload;
pub mod platform;
pub mod route;

pub use config::{
    GatewayConfig, GatewayConfigBuilder, LoggingSettings, ProxySettings, RegistrationSettings,
    SubprocessSettings,
};
pub use error::{CoreError, CoreResult};
pub use mount::DocsMount;
pub use payload::RegistrationPayload;
pub use platform::{Arch, BinaryResolver, Platform};
pub use route::{normalize_method, PathParameter, RouteDescriptor, STANDARD_METHODS};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
