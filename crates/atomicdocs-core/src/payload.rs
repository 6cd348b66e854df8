//! The registration payload shipped to the documentation process.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::CoreResult;
use crate::route::RouteDescriptor;

/// Body of `POST /api/register`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationPayload {
    /// Routes in the order the host declared them.
    pub routes: Vec<RouteDescriptor>,
    /// TCP port the host application listens on.
    pub port: u16,
    /// Schema sources keyed by file name.
    #[serde(
        rename = "schemaFiles",
        default,
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub schema_files: BTreeMap<String, String>,
}

impl RegistrationPayload {
    /// Create a payload for `routes` served on `port`.
    pub fn new(routes: Vec<RouteDescriptor>, port: u16) -> Self {
        Self {
            routes,
            port,
            schema_files: BTreeMap::new(),
        }
    }

    /// Attach a schema file.
    #[must_use]
    pub fn with_schema_file(mut self, name: impl Into<String>, source: impl Into<String>) -> Self {
        self.schema_files.insert(name.into(), source.into());
        self
    }

    /// Serialize to the JSON wire format.
    pub fn to_json_vec(&self) -> CoreResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Parse the JSON wire format.
    pub fn from_slice(bytes: &[u8]) -> CoreResult<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Number of routes carried.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Whether the payload carries no routes.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_round_trip() {
        let routes = vec![
            RouteDescriptor::new("GET", "/a", "").unwrap(),
            RouteDescriptor::new("POST", "/b", "").unwrap(),
        ];
        let payload = RegistrationPayload::new(routes.clone(), 6767);

        let bytes = payload.to_json_vec().unwrap();
        let decoded = RegistrationPayload::from_slice(&bytes).unwrap();

        assert_eq!(decoded.port, 6767);
        assert_eq!(decoded.routes, routes);
        assert_eq!(decoded.routes[0].method, "GET");
        assert_eq!(decoded.routes[1].path, "/b");
    }

    #[test]
    fn test_wire_keys() {
        let payload = RegistrationPayload::new(vec![], 3000);
        let json: serde_json::Value = serde_json::from_slice(&payload.to_json_vec().unwrap()).unwrap();
        assert_eq!(json, serde_json::json!({"routes": [], "port": 3000}));

        let payload = payload.with_schema_file("user.ts", "interface User {}");
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["schemaFiles"]["user.ts"], "interface User {}");
    }
}
