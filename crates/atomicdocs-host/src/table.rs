//! The table-based host shape.
//!
//! A [`TableApp`] stores a flat, ordered table of `{method, path, handler}`
//! entries. Middleware is registered as an `ALL` entry with a path pattern
//! and receives a mutable [`Context`] plus a [`Next`] continuation; it must
//! return a response.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{HeaderValue, Method, Response, StatusCode};
use http_body_util::Full;
use parking_lot::RwLock;
use serde::Serialize;

use crate::handler::HandlerInfo;
use crate::pattern::PathPattern;
use crate::request::HostRequest;
use crate::BoxFuture;

/// Method marker stored for middleware entries.
pub const ALL_METHODS: &str = "ALL";

/// Response type produced by table handlers and middleware.
pub type TableResponse = Response<Full<Bytes>>;

/// Per-request state handed to table handlers and middleware.
#[derive(Debug)]
pub struct Context {
    request: HostRequest,
    params: HashMap<String, String>,
}

impl Context {
    /// Wrap `request`.
    pub fn new(request: HostRequest) -> Self {
        Self {
            request,
            params: HashMap::new(),
        }
    }

    /// The inbound request.
    pub fn request(&self) -> &HostRequest {
        &self.request
    }

    /// Request path.
    pub fn path(&self) -> &str {
        self.request.path()
    }

    /// A path parameter captured by the matched route.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// Build a plain-text response.
    pub fn text(&self, status: StatusCode, body: impl Into<String>) -> TableResponse {
        respond(status, "text/plain; charset=UTF-8", Bytes::from(body.into()))
    }

    /// Build a JSON response.
    pub fn json<T: Serialize + ?Sized>(&self, value: &T) -> TableResponse {
        match serde_json::to_vec(value) {
            Ok(bytes) => respond(StatusCode::OK, "application/json", Bytes::from(bytes)),
            Err(e) => {
                tracing::error!(error = %e, "failed to serialize JSON response");
                self.text(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
            }
        }
    }

    /// Build an HTML response.
    pub fn html(&self, body: impl Into<String>) -> TableResponse {
        respond(StatusCode::OK, "text/html; charset=UTF-8", Bytes::from(body.into()))
    }
}

fn respond(status: StatusCode, content_type: &'static str, body: Bytes) -> TableResponse {
    let mut response = Response::new(Full::new(body));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    response
}

/// A synchronous table endpoint.
pub trait ContextHandler: Send + Sync + 'static {
    /// Produce the response for `ctx`.
    fn call(&self, ctx: &Context) -> TableResponse;
}

impl<F> ContextHandler for F
where
    F: Fn(&Context) -> TableResponse + Send + Sync + 'static,
{
    fn call(&self, ctx: &Context) -> TableResponse {
        self(ctx)
    }
}

/// Middleware registered in a route table.
///
/// Implementations either return their own response or delegate with
/// [`Next::run`], which must be called at most once.
pub trait ContextMiddleware: Send + Sync + 'static {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    /// Process the request.
    fn process<'a>(&'a self, ctx: &'a mut Context, next: Next<'a>) -> BoxFuture<'a, TableResponse>;
}

/// Continuation handed to [`ContextMiddleware::process`].
pub struct Next<'a> {
    inner: NextInner<'a>,
}

enum NextInner<'a> {
    Chain {
        middleware: &'a dyn ContextMiddleware,
        next: Box<Next<'a>>,
    },
    Endpoint(Box<dyn FnOnce(&mut Context) -> TableResponse + Send + 'a>),
}

impl<'a> Next<'a> {
    fn new(middleware: &'a dyn ContextMiddleware, next: Next<'a>) -> Self {
        Self {
            inner: NextInner::Chain {
                middleware,
                next: Box::new(next),
            },
        }
    }

    fn endpoint<F>(f: F) -> Self
    where
        F: FnOnce(&mut Context) -> TableResponse + Send + 'a,
    {
        Self {
            inner: NextInner::Endpoint(Box::new(f)),
        }
    }

    /// Invoke the rest of the chain.
    pub async fn run(self, ctx: &mut Context) -> TableResponse {
        match self.inner {
            NextInner::Chain { middleware, next } => middleware.process(ctx, *next).await,
            NextInner::Endpoint(endpoint) => endpoint(ctx),
        }
    }
}

#[derive(Clone)]
enum RouteTarget {
    Endpoint(Arc<dyn ContextHandler>),
    Middleware(Arc<dyn ContextMiddleware>),
}

/// One entry of the route table.
#[derive(Clone)]
pub struct TableRoute {
    method: String,
    pattern: PathPattern,
    handler: Option<HandlerInfo>,
    target: RouteTarget,
}

impl TableRoute {
    /// An endpoint entry.
    pub fn endpoint<H: ContextHandler>(method: &str, path: &str, handler: H) -> Self {
        Self {
            method: method.to_ascii_uppercase(),
            pattern: PathPattern::new(path),
            handler: Some(HandlerInfo::of(&handler)),
            target: RouteTarget::Endpoint(Arc::new(handler)),
        }
    }

    /// A middleware entry under `pattern`.
    pub fn middleware<M: ContextMiddleware>(pattern: &str, middleware: M) -> Self {
        Self {
            method: ALL_METHODS.to_string(),
            pattern: PathPattern::new(pattern),
            handler: Some(HandlerInfo::named(middleware.name())),
            target: RouteTarget::Middleware(Arc::new(middleware)),
        }
    }

    /// Replace the handler description.
    #[must_use]
    pub fn with_info(mut self, info: Option<HandlerInfo>) -> Self {
        self.handler = info;
        self
    }

    /// Method as stored, e.g. `GET` or `ALL`.
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Declared path pattern.
    pub fn path(&self) -> &str {
        self.pattern.as_str()
    }

    /// Handler description, when one was recorded.
    pub fn handler(&self) -> Option<&HandlerInfo> {
        self.handler.as_ref()
    }

    /// Whether this entry is middleware.
    pub fn is_middleware(&self) -> bool {
        matches!(self.target, RouteTarget::Middleware(_))
    }

    fn answers(&self, method: &Method) -> bool {
        self.method == ALL_METHODS || self.method == method.as_str()
    }
}

impl std::fmt::Debug for TableRoute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableRoute")
            .field("method", &self.method)
            .field("path", &self.path())
            .field("handler", &self.handler)
            .finish_non_exhaustive()
    }
}

/// A host application backed by a flat route table.
///
/// Cloning is cheap; clones share the same table.
#[derive(Clone, Default)]
pub struct TableApp {
    routes: Arc<RwLock<Vec<TableRoute>>>,
}

impl std::fmt::Debug for TableApp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableApp")
            .field("routes", &self.routes.read().len())
            .finish()
    }
}

impl TableApp {
    /// An empty application.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a raw table entry.
    pub fn push_route(&self, route: TableRoute) -> &Self {
        self.routes.write().push(route);
        self
    }

    /// Register middleware for paths matching `pattern`.
    pub fn use_middleware<M: ContextMiddleware>(&self, pattern: &str, middleware: M) -> &Self {
        self.push_route(TableRoute::middleware(pattern, middleware))
    }

    /// Register an endpoint for `method`.
    pub fn on<H: ContextHandler>(&self, method: &str, path: &str, handler: H) -> &Self {
        self.push_route(TableRoute::endpoint(method, path, handler))
    }

    /// Register a `GET` endpoint.
    pub fn get<H: ContextHandler>(&self, path: &str, handler: H) -> &Self {
        self.on("GET", path, handler)
    }

    /// Register a `POST` endpoint.
    pub fn post<H: ContextHandler>(&self, path: &str, handler: H) -> &Self {
        self.on("POST", path, handler)
    }

    /// Register a `PUT` endpoint.
    pub fn put<H: ContextHandler>(&self, path: &str, handler: H) -> &Self {
        self.on("PUT", path, handler)
    }

    /// Register a `PATCH` endpoint.
    pub fn patch<H: ContextHandler>(&self, path: &str, handler: H) -> &Self {
        self.on("PATCH", path, handler)
    }

    /// Register a `DELETE` endpoint.
    pub fn delete<H: ContextHandler>(&self, path: &str, handler: H) -> &Self {
        self.on("DELETE", path, handler)
    }

    /// A snapshot of the route table.
    pub fn routes(&self) -> Vec<TableRoute> {
        self.routes.read().clone()
    }

    /// Run `request` through matching middleware and the first matching
    /// endpoint.
    pub async fn dispatch(&self, request: HostRequest) -> TableResponse {
        let routes = self.routes();
        let path = request.path().to_string();

        let middleware: Vec<Arc<dyn ContextMiddleware>> = routes
            .iter()
            .filter(|route| route.pattern.matches(&path).is_some())
            .filter_map(|route| match &route.target {
                RouteTarget::Middleware(mw) => Some(Arc::clone(mw)),
                RouteTarget::Endpoint(_) => None,
            })
            .collect();

        let endpoint = routes.iter().find_map(|route| match &route.target {
            RouteTarget::Endpoint(handler) if route.answers(request.method()) => route
                .pattern
                .matches(&path)
                .map(|params| (Arc::clone(handler), params)),
            _ => None,
        });

        let terminal = Next::endpoint(move |ctx: &mut Context| match endpoint {
            Some((handler, params)) => {
                ctx.params = params;
                handler.call(ctx)
            }
            None => ctx.text(StatusCode::NOT_FOUND, "404 Not Found"),
        });

        let chain = middleware
            .iter()
            .rev()
            .fold(terminal, |next, mw| Next::new(mw.as_ref(), next));

        let mut ctx = Context::new(request);
        chain.run(&mut ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_text(response: TableResponse) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    struct Gate;

    impl ContextMiddleware for Gate {
        fn name(&self) -> &'static str {
            "gate"
        }

        fn process<'a>(&'a self, ctx: &'a mut Context, next: Next<'a>) -> BoxFuture<'a, TableResponse> {
            Box::pin(async move {
                if ctx.path() == "/admin" {
                    return ctx.text(StatusCode::UNAUTHORIZED, "nope");
                }
                let mut response = next.run(ctx).await;
                response
                    .headers_mut()
                    .insert("x-gate", HeaderValue::from_static("passed"));
                response
            })
        }
    }

    #[tokio::test]
    async fn test_endpoint_dispatch() {
        let app = TableApp::new();
        app.get("/products/:id", |ctx: &Context| {
            ctx.json(&serde_json::json!({ "id": ctx.param("id") }))
        });

        let response = app.dispatch(HostRequest::get("/products/3")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, r#"{"id":"3"}"#);
    }

    #[tokio::test]
    async fn test_not_found() {
        let app = TableApp::new();
        app.get("/products", |ctx: &Context| ctx.text(StatusCode::OK, "list"));

        let response = app
            .dispatch(HostRequest::new(Method::POST, "/products".parse().unwrap()))
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_text(response).await, "404 Not Found");
    }

    #[tokio::test]
    async fn test_middleware_wraps_endpoint() {
        let app = TableApp::new();
        app.use_middleware("*", Gate);
        app.get("/products", |ctx: &Context| ctx.text(StatusCode::OK, "list"));

        let response = app.dispatch(HostRequest::get("/products")).await;
        assert_eq!(response.headers()["x-gate"], "passed");
        assert_eq!(body_text(response).await, "list");

        let response = app.dispatch(HostRequest::get("/admin")).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_table_records_entries() {
        let app = TableApp::new();
        app.use_middleware("*", Gate);
        app.post("/products", |ctx: &Context| ctx.text(StatusCode::CREATED, "ok"));

        let routes = app.routes();
        assert_eq!(routes.len(), 2);
        assert_eq!(routes[0].method(), "ALL");
        assert!(routes[0].is_middleware());
        assert_eq!(routes[1].method(), "POST");
        assert_eq!(routes[1].path(), "/products");
        assert!(routes[1].handler().is_some());
    }
}
