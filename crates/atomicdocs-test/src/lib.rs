//! # AtomicDocs Test
//!
//! Test utilities for AtomicDocs:
//!
//! - [`MockDocsServer`]: a loopback stand-in for the documentation process
//!   that records registrations and the `X-App-Port` header.
//! - [`unused_port`]: a port nothing listens on, for unreachable-process
//!   scenarios.
//! - Host fixtures: [`users_stack_app`] and [`products_table_app`].
//! - [`TestResponse`]: collects any response body for assertions.
//!
//! ```ignore
//! use atomicdocs_test::{MockDocsServer, users_stack_app};
//!
//! #[tokio::test]
//! async fn test_docs_served() {
//!     let mock = MockDocsServer::start().await.unwrap();
//!     let app = users_stack_app();
//!     // install the gateway pointing at mock.port() ...
//! }
//! ```

mod error;
mod fixtures;
mod mock;
mod response;

pub use error::TestError;
pub use fixtures::{products_table_app, users_stack_app, PRODUCTS_PORT, USERS_PORT};
pub use mock::{unused_port, MockDocsServer, MockReply};
pub use response::TestResponse;
