//! Capability probing for host applications.
//!
//! The gateway never inspects a host's concrete type. It asks the host for
//! its route storage through [`HostApp::routes`] and decides the host's
//! [`HostKind`] from what comes back.

use std::fmt;
use std::sync::Arc;

use crate::stack::{Layer, StackApp};
use crate::table::{TableApp, TableRoute};

/// How a host stores its routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostKind {
    /// Ordered layer stack with `(request, response, next)` middleware.
    StackBased,
    /// Flat route table with `(context, next)` middleware.
    TableBased,
}

impl HostKind {
    /// Determine the kind of `app` from the storage it exposes.
    pub fn detect<A: HostApp + ?Sized>(app: &A) -> Self {
        match app.routes() {
            HostRoutes::Stack(_) => Self::StackBased,
            HostRoutes::Table(_) => Self::TableBased,
        }
    }

    /// Lowercase label for logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::StackBased => "stack",
            Self::TableBased => "table",
        }
    }
}

/// A snapshot of a host's route storage.
#[derive(Debug, Clone)]
pub enum HostRoutes {
    /// Layers of a stack-based host.
    Stack(Vec<Layer>),
    /// Entries of a table-based host.
    Table(Vec<TableRoute>),
}

/// Reads the port a host has recorded for itself, at the time of asking.
#[derive(Clone)]
pub struct PortLookup {
    lookup: Arc<dyn Fn() -> Option<u16> + Send + Sync>,
}

impl PortLookup {
    /// Always answer `port`.
    pub fn fixed(port: Option<u16>) -> Self {
        Self::from_fn(move || port)
    }

    /// Ask `lookup` every time.
    pub fn from_fn<F>(lookup: F) -> Self
    where
        F: Fn() -> Option<u16> + Send + Sync + 'static,
    {
        Self {
            lookup: Arc::new(lookup),
        }
    }

    /// The current port, if any.
    pub fn get(&self) -> Option<u16> {
        (self.lookup)()
    }
}

impl fmt::Debug for PortLookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PortLookup").field(&self.get()).finish()
    }
}

/// A host application the gateway can be installed into.
pub trait HostApp: Send + Sync {
    /// Snapshot the host's route storage.
    fn routes(&self) -> HostRoutes;

    /// Where to read the host's own port from.
    fn port_lookup(&self) -> PortLookup {
        PortLookup::fixed(None)
    }

    /// The port the host has recorded for itself right now.
    fn configured_port(&self) -> Option<u16> {
        self.port_lookup().get()
    }
}

impl HostApp for StackApp {
    fn routes(&self) -> HostRoutes {
        HostRoutes::Stack(self.layers())
    }

    fn port_lookup(&self) -> PortLookup {
        StackApp::port_lookup(self)
    }
}

impl HostApp for TableApp {
    fn routes(&self) -> HostRoutes {
        HostRoutes::Table(TableApp::routes(self))
    }
}
