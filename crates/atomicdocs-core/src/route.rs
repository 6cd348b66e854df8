//! Normalized route descriptors.
//!
//! A [`RouteDescriptor`] is what every host adapter produces, regardless of
//! how the host framework stores its routes. Descriptors are serialized
//! verbatim into the registration payload.

use std::sync::OnceLock;

use http::Method;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// The HTTP verbs a descriptor may carry.
pub const STANDARD_METHODS: [Method; 9] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::DELETE,
    Method::PATCH,
    Method::HEAD,
    Method::OPTIONS,
    Method::TRACE,
    Method::CONNECT,
];

/// Uppercase `raw` and map it onto a standard HTTP verb.
///
/// Returns `None` for anything else, including catch-all markers such as
/// `ALL` that some frameworks store in their route tables.
///
/// ```
/// use atomicdocs_core::normalize_method;
/// use http::Method;
///
/// assert_eq!(normalize_method("get"), Some(Method::GET));
/// assert_eq!(normalize_method("Delete"), Some(Method::DELETE));
/// assert_eq!(normalize_method("ALL"), None);
/// ```
pub fn normalize_method(raw: &str) -> Option<Method> {
    let upper = raw.trim().to_ascii_uppercase();
    STANDARD_METHODS
        .iter()
        .find(|method| method.as_str() == upper)
        .cloned()
}

/// One route as reported to the documentation process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteDescriptor {
    /// Uppercase HTTP verb.
    pub method: String,
    /// Path pattern exactly as the host declared it, e.g. `/users/:id`.
    pub path: String,
    /// Opaque description of the handler implementation.
    #[serde(default)]
    pub handler: String,
    /// Short human-readable summary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Grouping tags.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Parameters captured from the path pattern.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<PathParameter>,
}

impl RouteDescriptor {
    /// Create a descriptor, normalizing the verb.
    ///
    /// Fails when the verb is not a standard HTTP method or the path is empty.
    pub fn new(
        method: &str,
        path: impl Into<String>,
        handler: impl Into<String>,
    ) -> CoreResult<Self> {
        let normalized = normalize_method(method)
            .ok_or_else(|| CoreError::invalid_route(format!("unknown method: {method}")))?;
        let path = path.into();
        if path.is_empty() {
            return Err(CoreError::invalid_route("path must not be empty"));
        }

        Ok(Self {
            method: normalized.as_str().to_string(),
            path,
            handler: handler.into(),
            summary: None,
            tags: Vec::new(),
            parameters: Vec::new(),
        })
    }

    /// Fill in summary, tag and path parameters derived from the pattern.
    #[must_use]
    pub fn with_metadata(mut self) -> Self {
        self.summary = Some(format!("{} {}", self.method, self.path));
        self.tags = vec![tag_for(&self.path)];
        self.parameters = path_parameters(&self.path);
        self
    }
}

/// A path parameter such as `id` in `/users/:id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathParameter {
    /// Parameter name without its sigil.
    pub name: String,
    /// Parameter location; always `path`.
    #[serde(rename = "in")]
    pub location: String,
    /// Path parameters are always required.
    pub required: bool,
    /// Declared schema.
    pub schema: ParameterSchema,
}

impl PathParameter {
    /// Create a required string path parameter.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            location: "path".to_string(),
            required: true,
            schema: ParameterSchema {
                kind: "string".to_string(),
            },
        }
    }
}

/// Minimal schema for a path parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterSchema {
    /// Schema type name.
    #[serde(rename = "type")]
    pub kind: String,
}

fn param_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r":(\w+)|\{(\w+)\}").expect("valid parameter pattern"))
}

/// Collect `:name` and `{name}` segments from a path pattern.
pub fn path_parameters(path: &str) -> Vec<PathParameter> {
    param_pattern()
        .captures_iter(path)
        .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)))
        .map(|name| PathParameter::new(name.as_str()))
        .collect()
}

/// Capitalized first path segment, or `API` for the root.
pub fn tag_for(path: &str) -> String {
    let first = path.trim_matches('/').split('/').next().unwrap_or_default();
    let mut chars = first.chars();
    match chars.next() {
        Some(head) => head.to_uppercase().chain(chars).collect(),
        None => "API".to_string(),
    }
}
