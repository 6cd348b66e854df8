//! The stack-based host shape.
//!
//! A [`StackApp`] keeps an ordered list of [`Layer`]s. Middleware layers see
//! every request and decide whether to continue with [`StackNext::run`];
//! route layers answer when both path and verb match. Handlers write into a
//! [`ResponseWriter`] instead of returning a value.
//!
//! ```
//! use atomicdocs_host::{HostRequest, StackApp};
//!
//! # tokio_test::block_on(async {
//! let app = StackApp::new();
//! app.get("/users", |_req: &HostRequest, res: &mut atomicdocs_host::ResponseWriter| {
//!     res.json(&serde_json::json!([]));
//! });
//!
//! let response = app.dispatch(HostRequest::get("/users")).await;
//! assert_eq!(response.status(), 200);
//! # });
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use http::{HeaderMap, HeaderName, HeaderValue, Method, Response, StatusCode};
use indexmap::IndexMap;
use parking_lot::RwLock;
use serde::Serialize;

use crate::body::{self, StreamingBody};
use crate::handler::HandlerInfo;
use crate::introspect::PortLookup;
use crate::pattern::PathPattern;
use crate::request::HostRequest;
use crate::BoxFuture;

/// A synchronous route handler.
pub trait RouteHandler: Send + Sync + 'static {
    /// Handle `req`, writing the outcome into `res`.
    fn call(&self, req: &HostRequest, res: &mut ResponseWriter);
}

impl<F> RouteHandler for F
where
    F: Fn(&HostRequest, &mut ResponseWriter) + Send + Sync + 'static,
{
    fn call(&self, req: &HostRequest, res: &mut ResponseWriter) {
        self(req, res);
    }
}

/// Middleware placed in the layer stack.
///
/// Implementations either finish the response themselves or call
/// [`StackNext::run`] to let the remaining layers handle it.
pub trait StackMiddleware: Send + Sync + 'static {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    /// Process one request.
    fn handle<'a>(
        &'a self,
        req: &'a HostRequest,
        res: &'a mut ResponseWriter,
        next: StackNext<'a>,
    ) -> BoxFuture<'a, ()>;
}

/// A handler bound to an optional verb inside a route layer.
#[derive(Clone)]
pub struct BoundHandler {
    method: Option<Method>,
    info: HandlerInfo,
    handler: Arc<dyn RouteHandler>,
}

impl BoundHandler {
    /// Bind `handler` to `method`; `None` answers every verb.
    pub fn new<H: RouteHandler>(method: Option<Method>, handler: H) -> Self {
        Self {
            method,
            info: HandlerInfo::of(&handler),
            handler: Arc::new(handler),
        }
    }

    /// Override the handler description.
    #[must_use]
    pub fn with_info(mut self, info: HandlerInfo) -> Self {
        self.info = info;
        self
    }

    /// The verb this handler answers.
    pub fn method(&self) -> Option<&Method> {
        self.method.as_ref()
    }

    /// The handler description.
    pub fn info(&self) -> &HandlerInfo {
        &self.info
    }

    fn accepts(&self, method: &Method) -> bool {
        self.method.as_ref().map_or(true, |m| m == method)
    }
}

impl std::fmt::Debug for BoundHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundHandler")
            .field("method", &self.method)
            .field("info", &self.info)
            .finish_non_exhaustive()
    }
}

/// A terminal route: a path pattern, its enabled verbs and handler stack.
#[derive(Debug, Clone)]
pub struct RouteLayer {
    pattern: PathPattern,
    methods: IndexMap<String, bool>,
    stack: Vec<BoundHandler>,
}

impl RouteLayer {
    /// Create a route with no verbs enabled.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            pattern: PathPattern::new(path),
            methods: IndexMap::new(),
            stack: Vec::new(),
        }
    }

    /// Enable `method` and append `handler` to the stack.
    #[must_use]
    pub fn handle<H: RouteHandler>(self, method: Method, handler: H) -> Self {
        self.bind(BoundHandler::new(Some(method), handler))
    }

    /// Append an already bound handler.
    #[must_use]
    pub fn bind(mut self, handler: BoundHandler) -> Self {
        if let Some(method) = handler.method() {
            self.methods.insert(method.as_str().to_ascii_lowercase(), true);
        }
        self.stack.push(handler);
        self
    }

    /// Set a verb flag directly.
    #[must_use]
    pub fn with_method_flag(mut self, method: &str, enabled: bool) -> Self {
        self.methods.insert(method.to_ascii_lowercase(), enabled);
        self
    }

    /// The declared path.
    pub fn path(&self) -> &str {
        self.pattern.as_str()
    }

    /// Verb flags keyed by lowercase method name, in declaration order.
    pub fn methods(&self) -> &IndexMap<String, bool> {
        &self.methods
    }

    /// Handlers in registration order.
    pub fn stack(&self) -> &[BoundHandler] {
        &self.stack
    }

    fn answers(&self, method: &Method) -> bool {
        self.methods
            .get(method.as_str().to_ascii_lowercase().as_str())
            .copied()
            .unwrap_or(false)
    }
}

/// A middleware entry in the stack.
#[derive(Clone)]
pub struct MiddlewareLayer {
    name: &'static str,
    handler: Arc<dyn StackMiddleware>,
}

impl MiddlewareLayer {
    /// The middleware's name.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl std::fmt::Debug for MiddlewareLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MiddlewareLayer")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// One entry of the layer stack.
#[derive(Debug, Clone)]
pub enum Layer {
    /// Runs for every request.
    Middleware(MiddlewareLayer),
    /// Answers matching requests.
    Route(RouteLayer),
}

impl Layer {
    /// The route, if this is a terminal route layer.
    pub fn route(&self) -> Option<&RouteLayer> {
        match self {
            Self::Route(route) => Some(route),
            Self::Middleware(_) => None,
        }
    }
}

/// Continuation handed to stack middleware.
pub struct StackNext<'a> {
    layers: &'a [Layer],
}

impl<'a> StackNext<'a> {
    /// Run the remaining layers against `req`.
    pub fn run<'b>(self, req: &'b HostRequest, res: &'b mut ResponseWriter) -> BoxFuture<'b, ()>
    where
        'a: 'b,
    {
        Box::pin(async move {
            let mut remaining = self.layers;
            while let Some((layer, rest)) = remaining.split_first() {
                remaining = rest;
                match layer {
                    Layer::Middleware(mw) => {
                        return mw.handler.handle(req, res, StackNext { layers: rest }).await;
                    }
                    Layer::Route(route) => {
                        if !route.answers(req.method()) {
                            continue;
                        }
                        let Some(params) = route.pattern.matches(req.path()) else {
                            continue;
                        };
                        let routed = req.clone().with_params(params);
                        for handler in route.stack.iter().filter(|h| h.accepts(req.method())) {
                            handler.handler.call(&routed, res);
                            if res.is_finished() {
                                return;
                            }
                        }
                    }
                }
            }
        })
    }
}

/// Accumulates the response a stack handler produces.
pub struct ResponseWriter {
    status: StatusCode,
    headers: HeaderMap,
    body: Option<StreamingBody>,
    headers_sent: bool,
}

impl Default for ResponseWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseWriter {
    /// A fresh, unfinished writer.
    pub fn new() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: None,
            headers_sent: false,
        }
    }

    /// Set the status code.
    pub fn status(&mut self, status: StatusCode) -> &mut Self {
        self.status = status;
        self
    }

    /// Set a header, replacing any previous value.
    pub fn set_header(&mut self, name: HeaderName, value: HeaderValue) -> &mut Self {
        self.headers.insert(name, value);
        self
    }

    /// Commit the status line and headers.
    pub fn write_head(&mut self, status: StatusCode, headers: &HeaderMap) {
        self.status = status;
        for (name, value) in headers {
            self.headers.append(name.clone(), value.clone());
        }
        self.headers_sent = true;
    }

    /// Finish with a body that is forwarded as it is produced.
    pub fn pipe(&mut self, body: StreamingBody) {
        self.headers_sent = true;
        self.body = Some(body);
    }

    /// Finish with a complete body.
    pub fn send(&mut self, bytes: impl Into<Bytes>) {
        let bytes = bytes.into();
        if !self.headers.contains_key(CONTENT_TYPE) {
            self.headers
                .insert(CONTENT_TYPE, HeaderValue::from_static("text/html; charset=utf-8"));
        }
        self.headers.insert(CONTENT_LENGTH, HeaderValue::from(bytes.len()));
        self.pipe(body::full(bytes));
    }

    /// Finish with a plain-text body and `status`.
    pub fn send_text(&mut self, status: StatusCode, text: impl Into<String>) {
        self.status = status;
        self.headers
            .insert(CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
        self.send(text.into());
    }

    /// Finish with a JSON body.
    pub fn json<T: Serialize + ?Sized>(&mut self, value: &T) {
        match serde_json::to_vec(value) {
            Ok(bytes) => {
                self.headers
                    .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
                self.send(bytes);
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to serialize JSON response");
                self.send_text(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error");
            }
        }
    }

    /// Whether the status line and headers have been committed.
    pub fn headers_sent(&self) -> bool {
        self.headers_sent
    }

    /// Whether a body has been supplied.
    pub fn is_finished(&self) -> bool {
        self.body.is_some()
    }

    /// The response, if one was produced.
    pub fn into_response(self) -> Option<Response<StreamingBody>> {
        let body = self.body?;
        let mut response = Response::new(body);
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        Some(response)
    }
}

struct StackInner {
    layers: RwLock<Vec<Layer>>,
    settings: RwLock<HashMap<String, String>>,
}

/// A host application built from an ordered stack of layers.
///
/// Cloning is cheap; clones share the same stack.
#[derive(Clone)]
pub struct StackApp {
    inner: Arc<StackInner>,
}

impl Default for StackApp {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for StackApp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StackApp")
            .field("layers", &self.inner.layers.read().len())
            .finish_non_exhaustive()
    }
}

impl StackApp {
    /// An empty application.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(StackInner {
                layers: RwLock::new(Vec::new()),
                settings: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// Append middleware to the stack.
    pub fn use_middleware<M: StackMiddleware>(&self, middleware: M) -> &Self {
        let layer = MiddlewareLayer {
            name: middleware.name(),
            handler: Arc::new(middleware),
        };
        self.inner.layers.write().push(Layer::Middleware(layer));
        self
    }

    /// Append a prepared route layer.
    pub fn add_route(&self, route: RouteLayer) -> &Self {
        self.inner.layers.write().push(Layer::Route(route));
        self
    }

    /// Append a single-verb route.
    pub fn route<H: RouteHandler>(&self, method: Method, path: &str, handler: H) -> &Self {
        self.add_route(RouteLayer::new(path).handle(method, handler))
    }

    /// Append a `GET` route.
    pub fn get<H: RouteHandler>(&self, path: &str, handler: H) -> &Self {
        self.route(Method::GET, path, handler)
    }

    /// Append a `POST` route.
    pub fn post<H: RouteHandler>(&self, path: &str, handler: H) -> &Self {
        self.route(Method::POST, path, handler)
    }

    /// Append a `PUT` route.
    pub fn put<H: RouteHandler>(&self, path: &str, handler: H) -> &Self {
        self.route(Method::PUT, path, handler)
    }

    /// Append a `PATCH` route.
    pub fn patch<H: RouteHandler>(&self, path: &str, handler: H) -> &Self {
        self.route(Method::PATCH, path, handler)
    }

    /// Append a `DELETE` route.
    pub fn delete<H: RouteHandler>(&self, path: &str, handler: H) -> &Self {
        self.route(Method::DELETE, path, handler)
    }

    /// Store an application setting.
    pub fn set(&self, key: &str, value: impl ToString) -> &Self {
        self.inner.settings.write().insert(key.to_string(), value.to_string());
        self
    }

    /// Read an application setting.
    pub fn setting(&self, key: &str) -> Option<String> {
        self.inner.settings.read().get(key).cloned()
    }

    /// The `port` setting, if set and numeric.
    pub fn port(&self) -> Option<u16> {
        self.setting("port").and_then(|p| p.parse().ok())
    }

    /// A lookup of the `port` setting that does not keep the app alive.
    pub fn port_lookup(&self) -> PortLookup {
        let weak = Arc::downgrade(&self.inner);
        PortLookup::from_fn(move || {
            let inner = weak.upgrade()?;
            let port = inner.settings.read().get("port")?.parse().ok();
            port
        })
    }

    /// A snapshot of the layer stack.
    pub fn layers(&self) -> Vec<Layer> {
        self.inner.layers.read().clone()
    }

    /// Run `req` through the stack.
    ///
    /// Requests no layer finishes get a `404` naming the verb and path.
    pub async fn dispatch(&self, req: HostRequest) -> Response<StreamingBody> {
        let layers = self.layers();
        let mut res = ResponseWriter::new();
        StackNext { layers: &layers }.run(&req, &mut res).await;

        match res.into_response() {
            Some(response) => response,
            None => {
                let mut fallback = ResponseWriter::new();
                fallback.send_text(
                    StatusCode::NOT_FOUND,
                    format!("Cannot {} {}", req.method(), req.path()),
                );
                fallback.into_response().unwrap_or_else(|| Response::new(body::empty()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_text(response: Response<StreamingBody>) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    struct Tagging;

    impl StackMiddleware for Tagging {
        fn name(&self) -> &'static str {
            "tagging"
        }

        fn handle<'a>(
            &'a self,
            req: &'a HostRequest,
            res: &'a mut ResponseWriter,
            next: StackNext<'a>,
        ) -> BoxFuture<'a, ()> {
            Box::pin(async move {
                if req.path() == "/blocked" {
                    res.send_text(StatusCode::FORBIDDEN, "blocked");
                    return;
                }
                res.set_header(
                    HeaderName::from_static("x-tagged"),
                    HeaderValue::from_static("yes"),
                );
                next.run(req, res).await;
            })
        }
    }

    #[tokio::test]
    async fn test_route_dispatch_with_params() {
        let app = StackApp::new();
        app.get("/users/:id", |req: &HostRequest, res: &mut ResponseWriter| {
            res.json(&serde_json::json!({ "id": req.param("id") }));
        });

        let response = app.dispatch(HostRequest::get("/users/7")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CONTENT_TYPE], "application/json");
        assert_eq!(body_text(response).await, r#"{"id":"7"}"#);
    }

    #[tokio::test]
    async fn test_unmatched_is_404() {
        let app = StackApp::new();
        app.get("/users", |_: &HostRequest, res: &mut ResponseWriter| res.send("ok"));

        let response = app
            .dispatch(HostRequest::new(Method::DELETE, "/users".parse().unwrap()))
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_text(response).await, "Cannot DELETE /users");
    }

    #[tokio::test]
    async fn test_middleware_order() {
        let app = StackApp::new();
        app.use_middleware(Tagging);
        app.get("/ok", |_: &HostRequest, res: &mut ResponseWriter| res.send("fine"));

        let response = app.dispatch(HostRequest::get("/ok")).await;
        assert_eq!(response.headers()["x-tagged"], "yes");
        assert_eq!(body_text(response).await, "fine");

        let response = app.dispatch(HostRequest::get("/blocked")).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_handlers_run_until_finished() {
        let app = StackApp::new();
        app.add_route(
            RouteLayer::new("/chain")
                .handle(Method::GET, |_: &HostRequest, res: &mut ResponseWriter| {
                    res.status(StatusCode::CREATED);
                })
                .handle(Method::GET, |_: &HostRequest, res: &mut ResponseWriter| {
                    res.send("second");
                }),
        );

        let response = app.dispatch(HostRequest::get("/chain")).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(body_text(response).await, "second");
    }

    #[test]
    fn test_route_layer_methods() {
        let route = RouteLayer::new("/items")
            .handle(Method::GET, |_: &HostRequest, _: &mut ResponseWriter| {})
            .handle(Method::POST, |_: &HostRequest, _: &mut ResponseWriter| {})
            .with_method_flag("put", false);

        let names: Vec<_> = route.methods().keys().map(String::as_str).collect();
        assert_eq!(names, vec!["get", "post", "put"]);
        assert!(route.answers(&Method::POST));
        assert!(!route.answers(&Method::PUT));
        assert_eq!(route.stack().len(), 2);
    }

    #[test]
    fn test_settings() {
        let app = StackApp::new();
        assert_eq!(app.port(), None);
        app.set("port", 6767);
        assert_eq!(app.port(), Some(6767));
        app.set("port", "not-a-port");
        assert_eq!(app.port(), None);
    }
}
