//! A stand-in for the documentation-rendering subprocess.
//!
//! [`MockDocsServer`] listens on an ephemeral loopback port and implements
//! the three endpoints the gateway talks to:
//!
//! - `POST /api/register` records the payload and answers `{"ok":true}`,
//!   optionally after a configurable delay.
//! - `GET /docs` and `GET /docs/json` record the `X-App-Port` header and
//!   answer with a configurable [`MockReply`].

use std::convert::Infallible;
use std::net::{SocketAddr, TcpListener as StdTcpListener};
use std::sync::Arc;
use std::time::Duration;

use atomicdocs_core::RegistrationPayload;
use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{HeaderName, HeaderValue, Method, Request, Response, StatusCode};
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use parking_lot::{Mutex, RwLock};
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::error::TestError;

/// A port on the loopback interface that nothing is listening on.
///
/// The port is reserved by binding and released immediately, so a later
/// connection attempt is refused.
pub fn unused_port() -> u16 {
    StdTcpListener::bind("127.0.0.1:0")
        .and_then(|listener| listener.local_addr())
        .map(|addr| addr.port())
        .unwrap_or(1)
}

/// A canned response served by the mock.
#[derive(Debug, Clone)]
pub struct MockReply {
    status: StatusCode,
    content_type: Option<&'static str>,
    headers: Vec<(&'static str, &'static str)>,
    body: Bytes,
    delay: Duration,
}

impl MockReply {
    /// A `200` HTML page.
    pub fn html(body: &'static str) -> Self {
        Self {
            status: StatusCode::OK,
            content_type: Some("text/html; charset=utf-8"),
            headers: Vec::new(),
            body: Bytes::from_static(body.as_bytes()),
            delay: Duration::ZERO,
        }
    }

    /// A `200` JSON document.
    pub fn json(value: &serde_json::Value) -> Self {
        Self {
            status: StatusCode::OK,
            content_type: Some("application/json"),
            headers: Vec::new(),
            body: Bytes::from(value.to_string()),
            delay: Duration::ZERO,
        }
    }

    /// Override the status code.
    #[must_use]
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    /// Send no `content-type` header.
    #[must_use]
    pub fn without_content_type(mut self) -> Self {
        self.content_type = None;
        self
    }

    /// Add a response header. `name` must be lowercase.
    #[must_use]
    pub fn with_header(mut self, name: &'static str, value: &'static str) -> Self {
        self.headers.push((name, value));
        self
    }

    /// Wait before answering.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn to_response(&self) -> Response<Full<Bytes>> {
        let mut response = Response::new(Full::new(self.body.clone()));
        *response.status_mut() = self.status;
        if let Some(content_type) = self.content_type {
            response
                .headers_mut()
                .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        }
        for (name, value) in &self.headers {
            response.headers_mut().append(
                HeaderName::from_static(name),
                HeaderValue::from_static(value),
            );
        }
        response
    }
}

#[derive(Debug)]
struct MockState {
    registrations: Mutex<Vec<RegistrationPayload>>,
    app_ports: Mutex<Vec<String>>,
    docs: RwLock<MockReply>,
    docs_json: RwLock<MockReply>,
    register_delay: RwLock<Duration>,
    changed: Notify,
}

/// A mock documentation process bound to `127.0.0.1`.
#[derive(Debug)]
pub struct MockDocsServer {
    addr: SocketAddr,
    state: Arc<MockState>,
    task: JoinHandle<()>,
}

impl MockDocsServer {
    /// Bind an ephemeral port and start serving.
    pub async fn start() -> Result<Self, TestError> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let state = Arc::new(MockState {
            registrations: Mutex::new(Vec::new()),
            app_ports: Mutex::new(Vec::new()),
            docs: RwLock::new(MockReply::html("<html><body>AtomicDocs</body></html>")),
            docs_json: RwLock::new(MockReply::json(&serde_json::json!({ "openapi": "3.0.0" }))),
            register_delay: RwLock::new(Duration::ZERO),
            changed: Notify::new(),
        });

        let task = tokio::spawn(accept_loop(listener, Arc::clone(&state)));
        Ok(Self { addr, state, task })
    }

    /// The bound address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// The bound port.
    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Base URL, e.g. `http://127.0.0.1:54321`.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Replace the `/docs` reply.
    pub fn set_docs(&self, reply: MockReply) {
        *self.state.docs.write() = reply;
    }

    /// Replace the `/docs/json` reply.
    pub fn set_docs_json(&self, reply: MockReply) {
        *self.state.docs_json.write() = reply;
    }

    /// Wait this long before answering `/api/register`.
    pub fn set_register_delay(&self, delay: Duration) {
        *self.state.register_delay.write() = delay;
    }

    /// Registration payloads received so far.
    pub fn registrations(&self) -> Vec<RegistrationPayload> {
        self.state.registrations.lock().clone()
    }

    /// `X-App-Port` values seen on documentation requests.
    pub fn app_ports(&self) -> Vec<String> {
        self.state.app_ports.lock().clone()
    }

    /// Wait until at least `count` registrations have arrived.
    pub async fn wait_for_registrations(&self, count: usize, timeout: Duration) -> bool {
        let wait = async {
            loop {
                let changed = self.state.changed.notified();
                if self.state.registrations.lock().len() >= count {
                    return;
                }
                changed.await;
            }
        };
        tokio::time::timeout(timeout, wait).await.is_ok()
    }
}

impl Drop for MockDocsServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn accept_loop(listener: TcpListener, state: Arc<MockState>) {
    loop {
        let Ok((stream, _)) = listener.accept().await else {
            continue;
        };
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            let service = service_fn(move |req| {
                let state = Arc::clone(&state);
                async move { Ok::<_, Infallible>(handle(req, &state).await) }
            });
            if let Err(e) = http1::Builder::new()
                .serve_connection(TokioIo::new(stream), service)
                .await
            {
                debug!("mock connection error: {}", e);
            }
        });
    }
}

async fn handle(req: Request<Incoming>, state: &MockState) -> Response<Full<Bytes>> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    match (method, path.as_str()) {
        (Method::POST, "/api/register") => {
            let delay = *state.register_delay.read();
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            let body = match req.into_body().collect().await {
                Ok(collected) => collected.to_bytes(),
                Err(_) => return status_only(StatusCode::BAD_REQUEST),
            };
            match RegistrationPayload::from_slice(&body) {
                Ok(payload) => {
                    state.registrations.lock().push(payload);
                    state.changed.notify_waiters();
                    let mut response = Response::new(Full::new(Bytes::from_static(b"{\"ok\":true}")));
                    response
                        .headers_mut()
                        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
                    response
                }
                Err(_) => status_only(StatusCode::BAD_REQUEST),
            }
        }
        (Method::GET, "/docs" | "/docs/json") => {
            if let Some(port) = req.headers().get("x-app-port").and_then(|v| v.to_str().ok()) {
                state.app_ports.lock().push(port.to_string());
            }
            let reply = if path == "/docs" {
                state.docs.read().clone()
            } else {
                state.docs_json.read().clone()
            };
            if !reply.delay.is_zero() {
                tokio::time::sleep(reply.delay).await;
            }
            reply.to_response()
        }
        _ => status_only(StatusCode::NOT_FOUND),
    }
}

fn status_only(status: StatusCode) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::new()));
    *response.status_mut() = status;
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use atomicdocs_core::RouteDescriptor;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    async fn raw_request(addr: SocketAddr, request: &str) -> String {
        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        stream.write_all(request.as_bytes()).await.unwrap();
        let mut buf = Vec::new();
        stream.read_to_end(&mut buf).await.unwrap();
        String::from_utf8_lossy(&buf).into_owned()
    }

    #[tokio::test]
    async fn test_records_registration() {
        let server = MockDocsServer::start().await.unwrap();
        let payload = RegistrationPayload::new(
            vec![RouteDescriptor::new("GET", "/users", "").unwrap()],
            6767,
        );
        let body = String::from_utf8(payload.to_json_vec().unwrap()).unwrap();
        let request = format!(
            "POST /api/register HTTP/1.1\r\nHost: localhost\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            body.len(),
            body
        );

        let response = raw_request(server.addr(), &request).await;
        assert!(response.starts_with("HTTP/1.1 200"));
        assert!(server.wait_for_registrations(1, Duration::from_secs(1)).await);
        assert_eq!(server.registrations()[0].port, 6767);
    }

    #[tokio::test]
    async fn test_records_app_port() {
        let server = MockDocsServer::start().await.unwrap();
        let response = raw_request(
            server.addr(),
            "GET /docs HTTP/1.1\r\nHost: localhost\r\nX-App-Port: 3000\r\nConnection: close\r\n\r\n",
        )
        .await;

        assert!(response.starts_with("HTTP/1.1 200"));
        assert!(response.contains("AtomicDocs"));
        assert_eq!(server.app_ports(), vec!["3000".to_string()]);
    }

    #[tokio::test]
    async fn test_reply_headers() {
        let server = MockDocsServer::start().await.unwrap();
        server.set_docs(
            MockReply::html("")
                .with_status(StatusCode::FOUND)
                .with_header("location", "/docs/"),
        );
        let response = raw_request(
            server.addr(),
            "GET /docs HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
        )
        .await;

        assert!(response.starts_with("HTTP/1.1 302"));
        assert!(response.contains("location: /docs/"));
    }

    #[test]
    fn test_unused_port_is_nonzero() {
        assert_ne!(unused_port(), 0);
    }
}
