//! The request type both host shapes dispatch on.

use std::collections::HashMap;

use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, Method, Uri};
use http_body_util::BodyExt;

/// A fully-read inbound request.
#[derive(Debug, Clone)]
pub struct HostRequest {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
    local_port: Option<u16>,
    params: HashMap<String, String>,
}

impl HostRequest {
    /// Create a request with no headers and an empty body.
    pub fn new(method: Method, uri: Uri) -> Self {
        Self {
            method,
            uri,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            local_port: None,
            params: HashMap::new(),
        }
    }

    /// Shorthand for a `GET` of `path`.
    ///
    /// Unparseable paths fall back to `/`.
    pub fn get(path: &str) -> Self {
        Self::new(Method::GET, path.parse().unwrap_or_else(|_| Uri::from_static("/")))
    }

    /// Add a header.
    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Set the body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Record the local port the request arrived on.
    #[must_use]
    pub fn with_local_port(mut self, port: u16) -> Self {
        self.local_port = Some(port);
        self
    }

    /// Replace the captured path parameters.
    #[must_use]
    pub fn with_params(mut self, params: HashMap<String, String>) -> Self {
        self.params = params;
        self
    }

    /// Read a hyper request to completion.
    pub async fn from_http<B>(request: http::Request<B>, local_port: Option<u16>) -> Result<Self, B::Error>
    where
        B: hyper::body::Body<Data = Bytes>,
    {
        let (parts, body) = request.into_parts();
        let body = body.collect().await?.to_bytes();

        Ok(Self {
            method: parts.method,
            uri: parts.uri,
            headers: parts.headers,
            body,
            local_port,
            params: HashMap::new(),
        })
    }

    /// HTTP method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Request URI.
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Path component without the query string.
    pub fn path(&self) -> &str {
        self.uri.path()
    }

    /// Request headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// A header value as a string, if present and valid.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Request body.
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Port of the listener that accepted the request.
    pub fn local_port(&self) -> Option<u16> {
        self.local_port
    }

    /// A captured path parameter.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }
}
