// ── Check target resolution ──
//
// Turns (scope, target id) into the context a checker runs against.

use std::sync::Arc;

use crate::checker::AutoFill;
use crate::error::{CoreError, EntityKind};
use crate::model::{CheckScope, Domain, Identifier, Record, Zone};
use crate::service::ServiceRegistry;
use crate::store::Storage;

/// What a check target points at.
#[derive(Debug, Clone, Default)]
pub struct ResolvedTarget {
    pub domain: Option<Domain>,
    pub service_id: Option<Identifier>,
    pub subdomain: Option<String>,
    pub service_type: Option<String>,
    pub records: Vec<Record>,
}

impl ResolvedTarget {
    pub fn domain_id(&self) -> Option<&Identifier> {
        self.domain.as_ref().map(|d| &d.id)
    }

    pub fn auto_fill(&self) -> AutoFill {
        AutoFill {
            domain_name: self.domain.as_ref().map(|d| d.domain_name.clone()),
            subdomain: self.subdomain.clone(),
            service_type: self.service_type.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TargetResolver {
    storage: Storage,
    services: Arc<ServiceRegistry>,
}

impl TargetResolver {
    pub fn new(storage: Storage, services: Arc<ServiceRegistry>) -> Self {
        Self { storage, services }
    }

    pub async fn resolve(
        &self,
        scope: CheckScope,
        target: &Identifier,
        owner: &Identifier,
    ) -> Result<ResolvedTarget, CoreError> {
        match scope {
            CheckScope::Domain => self.resolve_domain(target, owner).await,
            CheckScope::Service => self.resolve_service(target, owner).await,
            CheckScope::Instance | CheckScope::User | CheckScope::OnDemand => {
                Ok(ResolvedTarget::default())
            }
        }
    }

    async fn latest_zone(&self, domain: &Domain) -> Result<Option<Zone>, CoreError> {
        match domain.latest_zone() {
            Some(id) => Ok(Some(self.storage.get_zone(id).await?)),
            None => Ok(None),
        }
    }

    async fn resolve_domain(
        &self,
        id: &Identifier,
        owner: &Identifier,
    ) -> Result<ResolvedTarget, CoreError> {
        let domain = self.storage.get_domain(id).await?;
        super::ensure_owner(EntityKind::Domain, id, &domain.owner_id, owner)?;
        let records = match self.latest_zone(&domain).await? {
            Some(zone) => zone.records(&self.services, &domain.domain_name)?,
            None => Vec::new(),
        };
        Ok(ResolvedTarget {
            domain: Some(domain),
            records,
            ..ResolvedTarget::default()
        })
    }

    /// Services are located through the latest zone of the owner's domains.
    async fn resolve_service(
        &self,
        id: &Identifier,
        owner: &Identifier,
    ) -> Result<ResolvedTarget, CoreError> {
        let mut domains = self.storage.list_domains().await?;
        while let Some(domain) = domains.next_valid() {
            if &domain.owner_id != owner {
                continue;
            }
            let Some(zone) = self.latest_zone(&domain).await? else {
                continue;
            };
            let Some((subdomain, service)) = zone.find_service(id) else {
                continue;
            };
            let records = self.services.service_records(
                service,
                subdomain,
                &domain.domain_name,
                zone.default_ttl,
            )?;
            let (subdomain, service_type) = (subdomain.to_owned(), service.service_type.clone());
            return Ok(ResolvedTarget {
                domain: Some(domain),
                service_id: Some(id.clone()),
                subdomain: Some(subdomain),
                service_type: Some(service_type),
                records,
            });
        }
        Err(CoreError::not_found(EntityKind::Service, id))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::net::Ipv4Addr;

    use super::*;
    use crate::service::{Server, make_service};

    async fn seeded() -> (TargetResolver, Domain, Identifier) {
        let storage = Storage::in_memory();
        let services = Arc::new(ServiceRegistry::with_builtin());
        let owner = Identifier::generate();
        let mut domain = Domain::new(owner, Identifier::generate(), "example.com").unwrap();

        let mut zone = Zone::new(domain.owner_id.clone(), 3600);
        let www = make_service(
            &Server::new(vec![Ipv4Addr::new(192, 0, 2, 1)], Vec::new()),
            "www",
            &domain.domain_name,
            None,
        )
        .unwrap();
        let service_id = zone.add_service("www", www);
        storage.put_zone(&mut zone).await.unwrap();
        domain.push_zone(zone.id.clone());
        storage.put_domain(&domain).await.unwrap();

        (TargetResolver::new(storage, services), domain, service_id)
    }

    #[tokio::test]
    async fn services_resolve_with_context() {
        let (resolver, domain, service_id) = seeded().await;
        let target = resolver
            .resolve(CheckScope::Service, &service_id, &domain.owner_id)
            .await
            .unwrap();
        let fill = target.auto_fill();
        assert_eq!(fill.domain_name.as_deref(), Some("example.com."));
        assert_eq!(fill.subdomain.as_deref(), Some("www"));
        assert_eq!(fill.service_type.as_deref(), Some("abstract.Server"));
        assert_eq!(target.records.len(), 1);
        assert_eq!(target.records[0].name, "www.example.com.");
    }

    #[tokio::test]
    async fn domains_resolve_to_their_latest_zone() {
        let (resolver, domain, _) = seeded().await;
        let target = resolver
            .resolve(CheckScope::Domain, &domain.id, &domain.owner_id)
            .await
            .unwrap();
        assert_eq!(target.domain_id(), Some(&domain.id));
        assert_eq!(target.records.len(), 1);
        assert!(target.auto_fill().subdomain.is_none());
    }

    #[tokio::test]
    async fn foreign_targets_are_hidden() {
        let (resolver, domain, service_id) = seeded().await;
        let stranger = Identifier::generate();
        let err = resolver
            .resolve(CheckScope::Domain, &domain.id, &stranger)
            .await
            .unwrap_err();
        assert_eq!(err.status(), 403);
        let err = resolver
            .resolve(CheckScope::Service, &service_id, &stranger)
            .await
            .unwrap_err();
        assert_eq!(err.status(), 404);
    }
}
