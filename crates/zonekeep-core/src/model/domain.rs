// ── Domain entity ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::identifier::Identifier;
use super::record::fqdn;
use crate::error::CoreError;

/// A name the user owns, bound to the provider that serves it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Domain {
    pub id: Identifier,
    pub owner_id: Identifier,
    pub provider_id: Identifier,
    /// Fully qualified, always ends with `.`.
    pub domain_name: String,
    #[serde(default)]
    pub group: String,
    /// Zone identifiers, newest last.
    #[serde(default)]
    pub zone_history: Vec<Identifier>,
}

impl Domain {
    /// Build a new domain after validating and normalizing its name.
    pub fn new(
        owner_id: Identifier,
        provider_id: Identifier,
        name: &str,
    ) -> Result<Self, CoreError> {
        let domain_name = validate_domain_name(name)?;
        Ok(Self {
            id: Identifier::generate(),
            owner_id,
            provider_id,
            domain_name,
            group: String::new(),
            zone_history: Vec::new(),
        })
    }

    /// Most recent zone, if any was imported.
    pub fn latest_zone(&self) -> Option<&Identifier> {
        self.zone_history.last()
    }

    pub fn push_zone(&mut self, zone_id: Identifier) {
        self.zone_history.push(zone_id);
    }
}

/// Check label syntax and return the normalized FQDN.
pub fn validate_domain_name(name: &str) -> Result<String, CoreError> {
    let normalized = fqdn(&name.to_ascii_lowercase());
    let bare = normalized.trim_end_matches('.');
    if bare.is_empty() {
        return Err(CoreError::validation("domain name is empty"));
    }
    if normalized.len() > 254 {
        return Err(CoreError::validation(format!(
            "domain name {normalized} exceeds 253 characters"
        )));
    }
    for label in bare.split('.') {
        let valid_chars = label
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
        if label.is_empty()
            || label.len() > 63
            || !valid_chars
            || label.starts_with('-')
            || label.ends_with('-')
        {
            return Err(CoreError::validation(format!(
                "invalid label {label:?} in domain name {normalized}"
            )));
        }
    }
    Ok(normalized)
}

// ── DomainLog ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

/// Audit entry attached to a domain (imports, publications).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainLog {
    pub id: Identifier,
    pub domain_id: Identifier,
    pub author_id: Identifier,
    pub date: DateTime<Utc>,
    pub level: LogLevel,
    pub content: String,
}

impl DomainLog {
    pub fn new(
        domain_id: Identifier,
        author_id: Identifier,
        level: LogLevel,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: Identifier::generate(),
            domain_id,
            author_id,
            date: Utc::now(),
            level,
            content: content.into(),
        }
    }
}
