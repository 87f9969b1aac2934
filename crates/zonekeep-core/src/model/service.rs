// ── Service envelope ──
//
// A service is stored as a tagged envelope: metadata plus an opaque JSON
// payload whose shape is determined by `service_type`. The service
// registry decodes the payload into a typed body on demand.

use serde::{Deserialize, Serialize};

use super::identifier::Identifier;

/// Service type that holds the zone apex (SOA and NS).
pub const ORIGIN_SERVICE: &str = "abstract.Origin";

/// A typed grouping of records under one subdomain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    #[serde(rename = "type")]
    pub service_type: String,
    pub id: Identifier,
    #[serde(default)]
    pub owner_id: Identifier,
    /// Subdomain the service lives under, relative to the zone origin.
    #[serde(default)]
    pub subdomain: String,
    /// Record TTL; `None` inherits the zone default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
    /// Comment generated from the body.
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub user_comment: String,
    #[serde(default)]
    pub nb_resources: usize,
    pub body: serde_json::Value,
}

impl Service {
    pub fn is_origin(&self) -> bool {
        self.service_type == ORIGIN_SERVICE
    }

    /// Effective TTL given the zone default.
    pub fn effective_ttl(&self, default_ttl: u32) -> u32 {
        self.ttl.unwrap_or(default_ttl)
    }
}
