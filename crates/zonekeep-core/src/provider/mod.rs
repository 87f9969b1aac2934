//! Provider capability layer.
//!
//! A [`Provider`] wraps one DNS hosting backend. Optional capabilities
//! (zone listing, dedicated SOA updates) are probed at runtime through
//! the `as_*` accessors. Core code only talks to providers through
//! [`GuardedProvider`], which captures panics and wraps failures.

mod guard;
mod memory;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::correction::Correction;
use crate::error::{CoreError, EntityKind};
use crate::model::{Identifier, Record, Soa};

pub use guard::GuardedProvider;
pub use memory::{MemoryProvider, MemorySettings};

// ── Capability traits ───────────────────────────────────────────────

#[async_trait]
pub trait Provider: Send + Sync + fmt::Debug {
    /// Registered type string.
    fn provider_type(&self) -> &'static str;

    /// Check that credentials and settings work.
    async fn validate(&self) -> Result<(), CoreError>;

    /// Live records of `domain` (given without trailing dot).
    async fn get_zone_records(&self, domain: &str) -> Result<Vec<Record>, CoreError>;

    /// Corrections computed by the backend itself.
    ///
    /// `None` lets the correction engine diff on its own.
    async fn zone_corrections(
        &self,
        _domain: &str,
        _target: &[Record],
        _live: &[Record],
    ) -> Result<Option<Vec<Correction>>, CoreError> {
        Ok(None)
    }

    async fn apply_correction(&self, domain: &str, correction: &Correction)
    -> Result<(), CoreError>;

    fn as_zone_lister(&self) -> Option<&dyn ZoneLister> {
        None
    }

    fn as_soa_updater(&self) -> Option<&dyn SoaUpdater> {
        None
    }
}

/// Providers able to enumerate the zones an account holds.
#[async_trait]
pub trait ZoneLister: Send + Sync {
    async fn list_zones(&self) -> Result<Vec<String>, CoreError>;
}

/// Providers with a dedicated SOA update call.
#[async_trait]
pub trait SoaUpdater: Send + Sync {
    async fn update_soa(&self, domain: &str, soa: &Soa, refresh_serial: bool)
    -> Result<(), CoreError>;
}

// ── Stored configuration ────────────────────────────────────────────

/// A user's provider account as stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub id: Identifier,
    pub owner_id: Identifier,
    pub provider_type: String,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub settings: serde_json::Value,
}

impl ProviderConfig {
    pub fn new(owner_id: Identifier, provider_type: &str, settings: serde_json::Value) -> Self {
        Self {
            id: Identifier::generate(),
            owner_id,
            provider_type: provider_type.to_owned(),
            comment: String::new(),
            settings,
        }
    }
}

// ── Registry ────────────────────────────────────────────────────────

type Constructor = fn(&serde_json::Value) -> Result<Arc<dyn Provider>, CoreError>;

#[derive(Clone)]
pub struct ProviderInfo {
    pub provider_type: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    build: Constructor,
}

impl fmt::Debug for ProviderInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderInfo")
            .field("provider_type", &self.provider_type)
            .finish_non_exhaustive()
    }
}

impl ProviderInfo {
    pub fn new(
        provider_type: &'static str,
        name: &'static str,
        description: &'static str,
        build: Constructor,
    ) -> Self {
        Self {
            provider_type,
            name,
            description,
            build,
        }
    }
}

/// Maps provider type strings to constructors.
#[derive(Debug, Clone, Default)]
pub struct ProviderRegistry {
    kinds: BTreeMap<&'static str, ProviderInfo>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        let _ = registry.register(memory::info());
        registry
    }

    pub fn register(&mut self, info: ProviderInfo) -> Result<(), CoreError> {
        if self.kinds.contains_key(info.provider_type) {
            return Err(CoreError::Conflict {
                entity: EntityKind::Provider,
                identifier: info.provider_type.to_owned(),
            });
        }
        self.kinds.insert(info.provider_type, info);
        Ok(())
    }

    pub fn list(&self) -> impl Iterator<Item = &ProviderInfo> {
        self.kinds.values()
    }

    /// Build the provider described by `config`.
    pub fn instantiate(&self, config: &ProviderConfig) -> Result<GuardedProvider, CoreError> {
        let info = self
            .kinds
            .get(config.provider_type.as_str())
            .ok_or_else(|| CoreError::ProviderConfig {
                provider_type: config.provider_type.clone(),
                message: "unknown provider type".into(),
            })?;
        let provider = (info.build)(&config.settings)?;
        Ok(GuardedProvider::new(provider))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn unknown_type_is_a_config_error() {
        let registry = ProviderRegistry::with_builtin();
        let config = ProviderConfig::new(Identifier::generate(), "route66", serde_json::json!({}));
        let err = registry.instantiate(&config).unwrap_err();
        assert_eq!(err.status(), 400);
    }

    #[test]
    fn builds_memory_provider() {
        let registry = ProviderRegistry::with_builtin();
        let config = ProviderConfig::new(Identifier::generate(), "memory", serde_json::json!({}));
        let provider = registry.instantiate(&config).unwrap();
        assert_eq!(provider.provider_type(), "memory");
        assert!(provider.supports_soa_update());
    }

    #[test]
    fn bad_settings_are_rejected() {
        let registry = ProviderRegistry::with_builtin();
        let config = ProviderConfig::new(
            Identifier::generate(),
            "memory",
            serde_json::json!({ "zones": { "example.com": "www IN A nope" } }),
        );
        assert!(registry.instantiate(&config).is_err());
    }
}
