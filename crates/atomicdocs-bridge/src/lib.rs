//! # AtomicDocs Bridge
//!
//! The two outbound paths from a host application to the documentation
//! subprocess:
//!
//! - [`RegistrationClient`] posts the route inventory once the subprocess is
//!   ready, either polling for readiness a bounded number of times or checking
//!   once and skipping.
//! - [`ProxyBridge`] forwards `/docs` and `/docs/json` and relays the answer
//!   by streaming or by buffering, turning every failure into a 503.

mod error;
mod proxy;
mod registration;

pub use error::{BridgeError, BridgeResult};
pub use proxy::{unavailable, ProxyBridge, RelayMode, Relayed, UNAVAILABLE_BODY};
pub use registration::{RegistrationClient, RegistrationOutcome, RetryPolicy};
