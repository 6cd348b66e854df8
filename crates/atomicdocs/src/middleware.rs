//! The interception middleware installed into host applications.

use std::sync::Arc;

use atomicdocs_bridge::{ProxyBridge, RelayMode, Relayed};
use atomicdocs_host::{
    BoxFuture, Context, ContextMiddleware, HostApp, HostKind, HostRequest, Next, PortLookup,
    ResponseWriter, StackApp, StackMiddleware, StackNext, TableApp, TableResponse,
};
use tracing::debug;

use crate::error::{GatewayError, GatewayResult};

/// Decides whether a request is for the documentation endpoints and relays
/// it if so.
#[derive(Debug, Clone)]
struct Interceptor {
    bridge: Arc<ProxyBridge>,
    mode: RelayMode,
    ports: PortLookup,
}

impl Interceptor {
    async fn intercept(&self, req: &HostRequest) -> Option<Relayed> {
        if !self.bridge.is_docs_path(req.path()) {
            return None;
        }

        let app_port = self
            .ports
            .get()
            .or_else(|| req.local_port())
            .unwrap_or_default();
        debug!(path = req.path(), app_port, "relaying documentation request");
        Some(self.bridge.relay(req.path(), app_port, self.mode).await)
    }
}

/// Middleware for stack-based hosts; relays by streaming.
#[derive(Debug, Clone)]
pub struct DocsStackMiddleware {
    interceptor: Interceptor,
}

impl DocsStackMiddleware {
    /// Relay through `bridge`, reading the host port from `ports` and
    /// falling back to the port the request arrived on.
    pub fn new(bridge: Arc<ProxyBridge>, ports: PortLookup) -> Self {
        Self {
            interceptor: Interceptor {
                bridge,
                mode: RelayMode::Stream,
                ports,
            },
        }
    }
}

impl StackMiddleware for DocsStackMiddleware {
    fn name(&self) -> &'static str {
        "atomicdocs"
    }

    fn handle<'a>(
        &'a self,
        req: &'a HostRequest,
        res: &'a mut ResponseWriter,
        next: StackNext<'a>,
    ) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            let relayed = self.interceptor.intercept(req).await;
            match relayed {
                Some(relayed) => {
                    let (parts, body) = relayed.into_streaming().into_parts();
                    res.write_head(parts.status, &parts.headers);
                    res.pipe(body);
                }
                None => next.run(req, res).await,
            }
        })
    }
}

/// Middleware for table-based hosts; relays by buffering.
#[derive(Debug, Clone)]
pub struct DocsContextMiddleware {
    interceptor: Interceptor,
}

impl DocsContextMiddleware {
    /// Relay through `bridge`, reading the host port from `ports` and
    /// falling back to the port the request arrived on.
    pub fn new(bridge: Arc<ProxyBridge>, ports: PortLookup) -> Self {
        Self {
            interceptor: Interceptor {
                bridge,
                mode: RelayMode::Buffer,
                ports,
            },
        }
    }
}

impl ContextMiddleware for DocsContextMiddleware {
    fn name(&self) -> &'static str {
        "atomicdocs"
    }

    fn process<'a>(&'a self, ctx: &'a mut Context, next: Next<'a>) -> BoxFuture<'a, TableResponse> {
        Box::pin(async move {
            let relayed = self.interceptor.intercept(ctx.request()).await;
            match relayed {
                Some(relayed) => relayed.into_buffered().await,
                None => next.run(ctx).await,
            }
        })
    }
}

/// The middleware built for a host, in the shape that host expects.
#[derive(Debug, Clone)]
pub enum GatewayMiddleware {
    /// For [`HostKind::StackBased`] hosts.
    Stack(DocsStackMiddleware),
    /// For [`HostKind::TableBased`] hosts.
    Context(DocsContextMiddleware),
}

impl GatewayMiddleware {
    /// The host kind this middleware was built for.
    pub fn kind(&self) -> HostKind {
        match self {
            Self::Stack(_) => HostKind::StackBased,
            Self::Context(_) => HostKind::TableBased,
        }
    }

    /// Append to a stack-based host.
    pub fn apply_to_stack(self, app: &StackApp) -> GatewayResult<()> {
        match self {
            Self::Stack(middleware) => {
                app.use_middleware(middleware);
                Ok(())
            }
            Self::Context(_) => Err(GatewayError::host_mismatch(
                HostKind::TableBased,
                HostKind::detect(app),
            )),
        }
    }

    /// Register on every path of a table-based host.
    pub fn apply_to_table(self, app: &TableApp) -> GatewayResult<()> {
        match self {
            Self::Context(middleware) => {
                app.use_middleware("*", middleware);
                Ok(())
            }
            Self::Stack(_) => Err(GatewayError::host_mismatch(
                HostKind::StackBased,
                HostKind::detect(app),
            )),
        }
    }
}

/// Pick the middleware shape for `app`.
pub(crate) fn for_host<A: HostApp + ?Sized>(
    kind: HostKind,
    app: &A,
    bridge: Arc<ProxyBridge>,
    port: Option<u16>,
) -> GatewayMiddleware {
    let ports = match port {
        Some(port) => PortLookup::fixed(Some(port)),
        None => app.port_lookup(),
    };
    match kind {
        HostKind::StackBased => GatewayMiddleware::Stack(DocsStackMiddleware::new(bridge, ports)),
        HostKind::TableBased => GatewayMiddleware::Context(DocsContextMiddleware::new(bridge, ports)),
    }
}
