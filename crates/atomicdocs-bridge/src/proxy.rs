//! Relaying documentation requests to the subprocess.
//!
//! Every relay first acquires the subprocess response, then hands it to the
//! host in one of two ways chosen at install time:
//!
//! - [`RelayMode::Stream`] writes the status and headers straight away and
//!   forwards body chunks as they arrive.
//! - [`RelayMode::Buffer`] reads the whole body, then builds one complete
//!   response value.
//!
//! Either way an unreachable or slow subprocess ends in a 503.

use std::time::{Duration, Instant};

use atomicdocs_core::{DocsMount, GatewayConfig};
use atomicdocs_host::{BoxError, StreamingBody, TableResponse};
use atomicdocs_telemetry::metrics::{record_proxy, ProxyOutcome};
use bytes::Bytes;
use futures_util::TryStreamExt;
use http::header::{CONTENT_TYPE, LOCATION};
use http::{HeaderMap, HeaderName, HeaderValue, Response, StatusCode};
use http_body_util::{BodyExt, Full, StreamBody};
use hyper::body::Frame;
use reqwest::Client;
use tracing::debug;

use crate::error::{BridgeError, BridgeResult};

/// Body sent when the subprocess cannot be reached.
pub const UNAVAILABLE_BODY: &str = "AtomicDocs unavailable";

const DEFAULT_CONTENT_TYPE: &str = "text/html; charset=utf-8";

/// How a relayed response is handed back to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayMode {
    /// Forward the body incrementally.
    Stream,
    /// Collect the body, then return a complete response.
    Buffer,
}

/// A relayed response in the shape the host expects.
#[derive(Debug)]
pub enum Relayed {
    /// Produced in [`RelayMode::Stream`].
    Streamed(Response<StreamingBody>),
    /// Produced in [`RelayMode::Buffer`].
    Buffered(TableResponse),
}

impl Relayed {
    /// Status code of the relayed response.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Streamed(response) => response.status(),
            Self::Buffered(response) => response.status(),
        }
    }

    /// Headers of the relayed response.
    pub fn headers(&self) -> &HeaderMap {
        match self {
            Self::Streamed(response) => response.headers(),
            Self::Buffered(response) => response.headers(),
        }
    }

    /// The response as a streaming body.
    pub fn into_streaming(self) -> Response<StreamingBody> {
        match self {
            Self::Streamed(response) => response,
            Self::Buffered(response) => response.map(atomicdocs_host::full_from),
        }
    }

    /// The response as a complete body.
    ///
    /// A streamed body that fails mid-way becomes a 503.
    pub async fn into_buffered(self) -> TableResponse {
        match self {
            Self::Buffered(response) => response,
            Self::Streamed(response) => {
                let (parts, body) = response.into_parts();
                match body.collect().await {
                    Ok(collected) => Response::from_parts(parts, Full::new(collected.to_bytes())),
                    Err(e) => {
                        debug!(error = %e, "failed to collect relayed body");
                        unavailable_buffered()
                    }
                }
            }
        }
    }
}

/// Forwards `/docs` requests to the documentation subprocess.
#[derive(Debug, Clone)]
pub struct ProxyBridge {
    client: Client,
    base_url: String,
    mount: DocsMount,
    timeout: Duration,
    port_header: HeaderName,
}

impl ProxyBridge {
    /// Build a bridge from the gateway configuration.
    ///
    /// Redirects from the subprocess are relayed to the browser untouched and
    /// proxy environment variables are ignored: the subprocess is always a
    /// direct loopback hop.
    pub fn new(config: &GatewayConfig) -> BridgeResult<Self> {
        let client = Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .no_proxy()
            .build()?;
        let port_header = HeaderName::try_from(config.proxy.port_header.as_str())
            .map_err(|e| BridgeError::unavailable(format!("invalid port header: {e}")))?;

        Ok(Self {
            client,
            base_url: config.subprocess_url(),
            mount: config.mount(),
            timeout: config.proxy.timeout,
            port_header,
        })
    }

    /// Whether `path` is one of the documentation endpoints.
    pub fn is_docs_path(&self, path: &str) -> bool {
        self.mount.is_docs_path(path)
    }

    /// The documentation mount.
    pub fn mount(&self) -> &DocsMount {
        &self.mount
    }

    /// Subprocess base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Deadline applied to every subprocess call.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Issue `GET path` to the subprocess, naming the host port.
    ///
    /// Resolves once response headers arrive.
    pub async fn acquire(&self, path: &str, app_port: u16) -> BridgeResult<reqwest::Response> {
        let url = format!("{}{}", self.base_url, path);
        let request = self
            .client
            .get(&url)
            .header(self.port_header.clone(), app_port.to_string())
            .send();

        match tokio::time::timeout(self.timeout, request).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(e)) => Err(BridgeError::unavailable(e.to_string())),
            Err(_) => Err(BridgeError::Timeout {
                after: self.timeout,
            }),
        }
    }

    /// Acquire the subprocess response for `path` and relay it in `mode`.
    ///
    /// Never fails: errors become a 503 with a short text body.
    pub async fn relay(&self, path: &str, app_port: u16, mode: RelayMode) -> Relayed {
        let start = Instant::now();
        let relayed = match self.acquire(path, app_port).await {
            Ok(upstream) => match mode {
                RelayMode::Stream => Ok(Relayed::Streamed(stream_response(upstream))),
                RelayMode::Buffer => self.buffer_response(upstream).await.map(Relayed::Buffered),
            },
            Err(e) => Err(e),
        };

        match relayed {
            Ok(relayed) => {
                record_proxy(ProxyOutcome::Relayed, start.elapsed());
                relayed
            }
            Err(e) => {
                debug!(error = %e, path, app_port, "documentation subprocess unavailable");
                record_proxy(ProxyOutcome::Unavailable, start.elapsed());
                unavailable(mode)
            }
        }
    }

    async fn buffer_response(&self, upstream: reqwest::Response) -> BridgeResult<TableResponse> {
        let status = upstream.status();
        let content_type = upstream
            .headers()
            .get(CONTENT_TYPE)
            .cloned()
            .unwrap_or_else(|| HeaderValue::from_static(DEFAULT_CONTENT_TYPE));
        // Redirects are not followed, so the target must reach the browser.
        let location = upstream.headers().get(LOCATION).cloned();

        let body = match tokio::time::timeout(self.timeout, upstream.bytes()).await {
            Ok(Ok(body)) => body,
            Ok(Err(e)) => return Err(BridgeError::body(e.to_string())),
            Err(_) => {
                return Err(BridgeError::Timeout {
                    after: self.timeout,
                })
            }
        };

        let mut response = Response::new(Full::new(body));
        *response.status_mut() = status;
        response.headers_mut().insert(CONTENT_TYPE, content_type);
        if let Some(location) = location {
            response.headers_mut().insert(LOCATION, location);
        }
        Ok(response)
    }
}

fn stream_response(upstream: reqwest::Response) -> Response<StreamingBody> {
    let status = upstream.status();
    let mut headers = HeaderMap::with_capacity(upstream.headers().len());
    for (name, value) in upstream.headers() {
        if !is_hop_by_hop_header(name.as_str()) {
            headers.append(name.clone(), value.clone());
        }
    }

    let stream = upstream
        .bytes_stream()
        .map_ok(Frame::data)
        .map_err(|e| -> BoxError { Box::new(e) });
    let mut response = Response::new(StreamBody::new(stream).boxed_unsync());
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}

/// The 503 response for `mode`.
pub fn unavailable(mode: RelayMode) -> Relayed {
    match mode {
        RelayMode::Stream => Relayed::Streamed(unavailable_buffered().map(atomicdocs_host::full_from)),
        RelayMode::Buffer => Relayed::Buffered(unavailable_buffered()),
    }
}

fn unavailable_buffered() -> TableResponse {
    let mut response = Response::new(Full::new(Bytes::from_static(UNAVAILABLE_BODY.as_bytes())));
    *response.status_mut() = StatusCode::SERVICE_UNAVAILABLE;
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}

/// Check if a header is hop-by-hop (should not be forwarded).
fn is_hop_by_hop_header(name: &str) -> bool {
    matches!(
        name.to_lowercase().as_str(),
        "connection"
            | "keep-alive"
            | "proxy-authenticate"
            | "proxy-authorization"
            | "te"
            | "trailers"
            | "transfer-encoding"
            | "upgrade"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_for(port: u16) -> GatewayConfig {
        GatewayConfig::builder()
            .subprocess_host("127.0.0.1")
            .subprocess_port(port)
            .proxy_timeout(Duration::from_millis(500))
            .build()
            .unwrap()
    }

    #[test]
    fn test_is_hop_by_hop_header() {
        assert!(is_hop_by_hop_header("connection"));
        assert!(is_hop_by_hop_header("Transfer-Encoding"));
        assert!(!is_hop_by_hop_header("content-type"));
        assert!(!is_hop_by_hop_header("x-app-port"));
    }

    #[test]
    fn test_is_docs_path() {
        let bridge = ProxyBridge::new(&config_for(6174)).unwrap();
        assert!(bridge.is_docs_path("/docs"));
        assert!(bridge.is_docs_path("/docs/json"));
        assert!(!bridge.is_docs_path("/docs/other"));
        assert!(!bridge.is_docs_path("/profile"));
        assert_eq!(bridge.base_url(), "http://127.0.0.1:6174");
    }

    #[tokio::test]
    async fn test_unreachable_is_503_in_both_modes() {
        let bridge = ProxyBridge::new(&config_for(atomicdocs_test::unused_port())).unwrap();

        for mode in [RelayMode::Stream, RelayMode::Buffer] {
            let relayed = bridge.relay("/docs", 3000, mode).await;
            assert_eq!(relayed.status(), StatusCode::SERVICE_UNAVAILABLE);
            assert_eq!(relayed.headers()[CONTENT_TYPE], "text/plain; charset=utf-8");
            assert_eq!(
                matches!(relayed, Relayed::Streamed(_)),
                mode == RelayMode::Stream
            );
        }
    }

    #[tokio::test]
    async fn test_into_buffered_collects_stream() {
        let streamed = unavailable(RelayMode::Stream);
        let response = streamed.into_buffered().await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(body.as_ref(), UNAVAILABLE_BODY.as_bytes());
    }

    #[tokio::test]
    async fn test_unavailable_body() {
        let Relayed::Buffered(response) = unavailable(RelayMode::Buffer) else {
            panic!("expected buffered response");
        };
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(body.as_ref(), UNAVAILABLE_BODY.as_bytes());
    }
}
