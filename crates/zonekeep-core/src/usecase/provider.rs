// ── Provider configurations ──

use std::sync::Arc;

use dashmap::DashMap;
use tracing::info;

use super::ensure_owner;
use crate::error::{CoreError, EntityKind};
use crate::model::Identifier;
use crate::provider::{GuardedProvider, ProviderConfig, ProviderRegistry};
use crate::store::Storage;

/// Instantiated providers are cached per configuration id, so stateful
/// backends keep their state between calls.
#[derive(Debug, Clone)]
pub struct ProviderUsecase {
    storage: Storage,
    registry: Arc<ProviderRegistry>,
    live: Arc<DashMap<Identifier, GuardedProvider>>,
}

impl ProviderUsecase {
    pub fn new(storage: Storage, registry: Arc<ProviderRegistry>) -> Self {
        Self {
            storage,
            registry,
            live: Arc::new(DashMap::new()),
        }
    }

    /// Validate the settings against the provider and store them.
    pub async fn create(&self, config: ProviderConfig) -> Result<ProviderConfig, CoreError> {
        let provider = self.registry.instantiate(&config)?;
        provider.validate().await?;
        self.storage.put_provider(&config).await?;
        self.live.insert(config.id.clone(), provider);
        info!(provider_id = %config.id, provider_type = %config.provider_type, "provider registered");
        Ok(config)
    }

    pub async fn get(&self, owner: &Identifier, id: &Identifier) -> Result<ProviderConfig, CoreError> {
        let config = self.storage.get_provider(id).await?;
        ensure_owner(EntityKind::Provider, id, &config.owner_id, owner)?;
        Ok(config)
    }

    pub async fn list(&self, owner: &Identifier) -> Result<Vec<ProviderConfig>, CoreError> {
        let mut iter = self.storage.list_providers().await?;
        let mut found = Vec::new();
        while let Some(config) = iter.next_valid() {
            if &config.owner_id == owner {
                found.push(config);
            }
        }
        Ok(found)
    }

    /// Delete a provider no domain still uses.
    pub async fn delete(&self, owner: &Identifier, id: &Identifier) -> Result<(), CoreError> {
        self.get(owner, id).await?;
        let mut domains = self.storage.list_domains().await?;
        while let Some(domain) = domains.next_valid() {
            if &domain.provider_id == id {
                return Err(CoreError::Conflict {
                    entity: EntityKind::Domain,
                    identifier: domain.domain_name,
                });
            }
        }
        self.live.remove(id);
        self.storage.delete_provider(id).await
    }

    /// Build the guarded provider behind a stored configuration.
    pub async fn instantiate(&self, id: &Identifier) -> Result<GuardedProvider, CoreError> {
        if let Some(provider) = self.live.get(id) {
            return Ok(provider.value().clone());
        }
        let config = self.storage.get_provider(id).await?;
        let provider = self.registry.instantiate(&config)?;
        self.live.insert(id.clone(), provider.clone());
        Ok(provider)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn usecase() -> ProviderUsecase {
        ProviderUsecase::new(Storage::in_memory(), Arc::new(ProviderRegistry::with_builtin()))
    }

    #[tokio::test]
    async fn ownership_is_enforced() {
        let uc = usecase();
        let owner = Identifier::generate();
        let config = uc
            .create(ProviderConfig::new(owner.clone(), "memory", json!({})))
            .await
            .unwrap();
        assert!(uc.get(&owner, &config.id).await.is_ok());
        let err = uc.get(&Identifier::generate(), &config.id).await.unwrap_err();
        assert_eq!(err.status(), 403);
        assert_eq!(uc.list(&owner).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn instances_are_reused() {
        let uc = usecase();
        let config = uc
            .create(ProviderConfig::new(Identifier::generate(), "memory", json!({})))
            .await
            .unwrap();
        let a = uc.instantiate(&config.id).await.unwrap();
        let b = uc.instantiate(&config.id).await.unwrap();
        assert!(a.same_backend(&b));
    }

    #[tokio::test]
    async fn invalid_settings_are_rejected() {
        let uc = usecase();
        let config = ProviderConfig::new(
            Identifier::generate(),
            "memory",
            json!({ "zones": { "example.com.": "@ IN BOGUS" } }),
        );
        assert_eq!(uc.create(config).await.unwrap_err().status(), 400);
    }
}
