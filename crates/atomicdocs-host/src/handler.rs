//! Opaque descriptions of registered handlers.

use std::any::type_name;
use std::borrow::Cow;
use std::fmt;

/// A printable description of a handler implementation.
///
/// Descriptions are informational only; nothing parses them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HandlerInfo {
    name: Cow<'static, str>,
}

impl HandlerInfo {
    /// Describe a handler by its Rust type name.
    pub fn of<F>(_handler: &F) -> Self {
        Self {
            name: Cow::Borrowed(type_name::<F>()),
        }
    }

    /// Describe a handler with an explicit name.
    pub fn named(name: impl Into<Cow<'static, str>>) -> Self {
        Self { name: name.into() }
    }

    /// The description text.
    pub fn describe(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for HandlerInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
