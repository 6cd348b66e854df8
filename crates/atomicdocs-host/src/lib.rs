//! # AtomicDocs Host
//!
//! The two host application shapes the AtomicDocs gateway knows how to plug
//! into:
//!
//! - [`StackApp`]: an ordered stack of layers. Middleware has the shape
//!   `(request, response, next)`, handlers write into a [`ResponseWriter`].
//! - [`TableApp`]: a flat route table of `{method, path, handler}` entries.
//!   Middleware has the shape `(context, next)` and returns a response.
//!
//! Both expose their route storage through [`HostApp`], which is how the
//! gateway extracts routes and decides the [`HostKind`] without knowing the
//! concrete type.

mod body;
mod handler;
mod introspect;
mod pattern;
mod request;
pub mod serve;
mod stack;
mod table;

use std::future::Future;
use std::pin::Pin;

pub use body::{empty, full, full_from, BoxError, StreamingBody};
pub use handler::HandlerInfo;
pub use introspect::{HostApp, HostKind, HostRoutes, PortLookup};
pub use pattern::PathPattern;
pub use request::HostRequest;
pub use stack::{
    BoundHandler, Layer, MiddlewareLayer, ResponseWriter, RouteHandler, RouteLayer, StackApp,
    StackMiddleware, StackNext,
};
pub use table::{
    Context, ContextHandler, ContextMiddleware, Next, TableApp, TableResponse, TableRoute,
    ALL_METHODS,
};

/// A boxed, sendable future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
