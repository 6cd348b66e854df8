//! Path pattern matching shared by both host shapes.
//!
//! Supported segments are literals, `:name` captures and a trailing `*`
//! that matches the rest of the path.

use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
    Wildcard,
}

/// A compiled path pattern such as `/users/:id` or `/docs/*`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    raw: String,
    segments: Vec<Segment>,
}

impl PathPattern {
    /// Compile `raw`.
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let segments = split(&raw)
            .map(|segment| {
                if segment == "*" {
                    Segment::Wildcard
                } else if let Some(name) = segment.strip_prefix(':') {
                    Segment::Param(name.to_string())
                } else {
                    Segment::Literal(segment.to_string())
                }
            })
            .collect();

        Self { raw, segments }
    }

    /// The pattern as declared.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Match `path`, returning captured parameters on success.
    pub fn matches(&self, path: &str) -> Option<HashMap<String, String>> {
        let mut params = HashMap::new();
        let mut parts = split(path);

        for segment in &self.segments {
            match segment {
                Segment::Wildcard => return Some(params),
                Segment::Literal(literal) => {
                    if parts.next()? != literal.as_str() {
                        return None;
                    }
                }
                Segment::Param(name) => {
                    params.insert(name.clone(), parts.next()?.to_string());
                }
            }
        }

        parts.next().is_none().then_some(params)
    }
}

fn split(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|segment| !segment.is_empty())
}
