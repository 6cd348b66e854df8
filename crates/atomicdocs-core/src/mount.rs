//! The documentation mount point.
//!
//! The gateway reserves a prefix (`/docs` by default) on the host. Only the
//! root and its JSON variant are proxied; everything under the prefix is
//! excluded from the extracted route inventory.

use serde::{Deserialize, Serialize};

/// Default mount prefix.
pub const DEFAULT_MOUNT: &str = "/docs";

/// Suffix of the machine-readable documentation endpoint.
pub const JSON_SUFFIX: &str = "/json";

/// Reserved documentation paths on the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocsMount {
    prefix: String,
}

impl DocsMount {
    /// Create a mount at `prefix`, dropping any trailing slash.
    pub fn new(prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        let trimmed = prefix.trim_end_matches('/');
        Self {
            prefix: if trimmed.is_empty() {
                DEFAULT_MOUNT.to_string()
            } else {
                trimmed.to_string()
            },
        }
    }

    /// The mount prefix, e.g. `/docs`.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// The JSON endpoint, e.g. `/docs/json`.
    pub fn json_path(&self) -> String {
        format!("{}{}", self.prefix, JSON_SUFFIX)
    }

    /// Whether `path` is exactly one of the proxied documentation endpoints.
    pub fn is_docs_path(&self, path: &str) -> bool {
        path == self.prefix
            || path
                .strip_prefix(self.prefix.as_str())
                .is_some_and(|rest| rest == JSON_SUFFIX)
    }

    /// Whether `path` starts with the mount prefix.
    pub fn is_under_mount(&self, path: &str) -> bool {
        path.starts_with(self.prefix.as_str())
    }
}

impl Default for DocsMount {
    fn default() -> Self {
        Self::new(DEFAULT_MOUNT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_docs_paths() {
        let mount = DocsMount::default();
        assert!(mount.is_docs_path("/docs"));
        assert!(mount.is_docs_path("/docs/json"));
        assert!(!mount.is_docs_path("/docs/"));
        assert!(!mount.is_docs_path("/docs/other"));
        assert!(!mount.is_docs_path("/profile"));
        assert!(!mount.is_docs_path("/documents"));
    }

    #[test]
    fn test_prefix_exclusion() {
        let mount = DocsMount::default();
        assert!(mount.is_under_mount("/docs"));
        assert!(mount.is_under_mount("/docs/internal"));
        assert!(mount.is_under_mount("/docsify"));
        assert!(!mount.is_under_mount("/users"));
    }

    #[test]
    fn test_custom_mount() {
        let mount = DocsMount::new("/api-docs/");
        assert_eq!(mount.prefix(), "/api-docs");
        assert_eq!(mount.json_path(), "/api-docs/json");
        assert!(mount.is_docs_path("/api-docs/json"));
        assert_eq!(DocsMount::new("/").prefix(), DEFAULT_MOUNT);
    }
}
