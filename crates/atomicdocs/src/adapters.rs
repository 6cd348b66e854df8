//! Route extraction.
//!
//! Turns whatever route storage a host exposes into an ordered list of
//! [`RouteDescriptor`]s. The storage shape is re-detected on every call.
//!
//! All paths share one post-processing step:
//!
//! 1. drop anything under the documentation mount,
//! 2. keep the first descriptor for each `(method, path)` pair,
//! 3. attach summary, tag and path parameters.

use std::collections::HashSet;

use atomicdocs_core::{normalize_method, DocsMount, RouteDescriptor};
use atomicdocs_host::{HostApp, HostRoutes, Layer, TableRoute};

/// Extract the documentable routes of `app`.
pub fn extract_routes<A: HostApp + ?Sized>(app: &A, mount: &DocsMount) -> Vec<RouteDescriptor> {
    let raw = match app.routes() {
        HostRoutes::Stack(layers) => extract_stack_routes(&layers),
        HostRoutes::Table(routes) => extract_table_routes(&routes),
    };
    finish(raw, mount)
}

/// One descriptor per enabled verb of every terminal route layer.
///
/// The handler description is taken from the first handler bound to the
/// route. Middleware layers and non-standard verb flags are ignored.
pub fn extract_stack_routes(layers: &[Layer]) -> Vec<RouteDescriptor> {
    layers
        .iter()
        .filter_map(Layer::route)
        .flat_map(|route| {
            let handler = route
                .stack()
                .first()
                .map(|h| h.info().describe().to_string())
                .unwrap_or_default();

            route
                .methods()
                .iter()
                .filter(|(_, enabled)| **enabled)
                .filter_map(move |(verb, _)| {
                    RouteDescriptor::new(verb, route.path(), handler.clone()).ok()
                })
                .collect::<Vec<_>>()
        })
        .collect()
}

/// One descriptor per table entry with a standard verb.
///
/// Entries such as `ALL` middleware registrations are dropped. A missing
/// handler yields an empty description.
pub fn extract_table_routes(routes: &[TableRoute]) -> Vec<RouteDescriptor> {
    routes
        .iter()
        .filter(|route| normalize_method(route.method()).is_some())
        .filter_map(|route| {
            let handler = route
                .handler()
                .map(|h| h.describe().to_string())
                .unwrap_or_default();
            RouteDescriptor::new(route.method(), route.path(), handler).ok()
        })
        .collect()
}

fn finish(routes: Vec<RouteDescriptor>, mount: &DocsMount) -> Vec<RouteDescriptor> {
    let mut seen = HashSet::new();
    routes
        .into_iter()
        .filter(|route| !mount.is_under_mount(&route.path))
        .filter(|route| seen.insert((route.method.clone(), route.path.clone())))
        .map(RouteDescriptor::with_metadata)
        .collect()
}
