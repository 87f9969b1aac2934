// ── Domains and their zone history ──

use chrono::Utc;
use tracing::{info, warn};

use super::schedule::ScheduleUsecase;
use super::{ProviderUsecase, Registries, ensure_owner};
use crate::config::CorrectionOptions;
use crate::correction::{ApplyReport, Correction, apply_corrections, plan_corrections, strip_dnssec};
use crate::error::{CoreError, EntityKind};
use crate::model::{CheckScope, Domain, DomainLog, Identifier, LogLevel, Zone};
use crate::provider::GuardedProvider;
use crate::service::analyze_zone;
use crate::store::Storage;

/// TTL assumed for imported zones.
const DEFAULT_ZONE_TTL: u32 = 3600;

#[derive(Debug, Clone)]
pub struct DomainUsecase {
    storage: Storage,
    registries: Registries,
    corrections: CorrectionOptions,
    schedules: ScheduleUsecase,
    providers: ProviderUsecase,
}

impl DomainUsecase {
    pub fn new(
        storage: Storage,
        registries: Registries,
        corrections: CorrectionOptions,
        schedules: ScheduleUsecase,
        providers: ProviderUsecase,
    ) -> Self {
        Self {
            storage,
            registries,
            corrections,
            schedules,
            providers,
        }
    }

    // ── Domain CRUD ──────────────────────────────────────────────────

    pub async fn create(
        &self,
        owner: &Identifier,
        provider_id: &Identifier,
        name: &str,
    ) -> Result<Domain, CoreError> {
        self.providers.get(owner, provider_id).await?;
        let domain = Domain::new(owner.clone(), provider_id.clone(), name)?;
        if self
            .list(owner)
            .await?
            .iter()
            .any(|d| d.domain_name == domain.domain_name)
        {
            return Err(CoreError::Conflict {
                entity: EntityKind::Domain,
                identifier: domain.domain_name,
            });
        }
        self.storage.put_domain(&domain).await?;
        info!(domain = %domain.domain_name, domain_id = %domain.id, "domain created");
        Ok(domain)
    }

    pub async fn get(&self, owner: &Identifier, id: &Identifier) -> Result<Domain, CoreError> {
        let domain = self.storage.get_domain(id).await?;
        ensure_owner(EntityKind::Domain, id, &domain.owner_id, owner)?;
        Ok(domain)
    }

    pub async fn list(&self, owner: &Identifier) -> Result<Vec<Domain>, CoreError> {
        let mut iter = self.storage.list_domains().await?;
        let mut found = Vec::new();
        while let Some(domain) = iter.next_valid() {
            if &domain.owner_id == owner {
                found.push(domain);
            }
        }
        found.sort_by(|a, b| a.domain_name.cmp(&b.domain_name));
        Ok(found)
    }

    /// Delete a domain with its zones, schedules, results, option
    /// layers and logs.
    pub async fn delete(&self, owner: &Identifier, id: &Identifier) -> Result<(), CoreError> {
        let domain = self.get(owner, id).await?;

        let mut service_ids = Vec::new();
        for zone_id in &domain.zone_history {
            match self.storage.get_zone(zone_id).await {
                Ok(zone) => service_ids.extend(
                    zone.services
                        .values()
                        .flatten()
                        .map(|s| s.id.clone()),
                ),
                Err(e) => warn!(zone_id = %zone_id, error = %e, "zone missing during domain delete"),
            }
            self.storage.delete_zone(zone_id).await?;
        }
        service_ids.sort();
        service_ids.dedup();

        self.forget_target(CheckScope::Domain, id).await?;
        for service_id in &service_ids {
            self.forget_target(CheckScope::Service, service_id).await?;
        }
        self.storage.delete_domain_checker_options(id).await?;
        self.storage.delete_domain_logs(id).await?;
        self.storage.delete_domain(id).await?;
        info!(domain = %domain.domain_name, services = service_ids.len(), "domain deleted");
        Ok(())
    }

    async fn forget_target(&self, scope: CheckScope, target: &Identifier) -> Result<(), CoreError> {
        self.schedules.delete_target_schedules(scope, target).await?;
        self.storage.delete_target_results(scope, target).await?;
        Ok(())
    }

    pub async fn logs(&self, owner: &Identifier, id: &Identifier) -> Result<Vec<DomainLog>, CoreError> {
        self.get(owner, id).await?;
        self.storage.list_domain_logs(id).await
    }

    async fn log(&self, domain: &Domain, author: &Identifier, level: LogLevel, content: String) {
        let entry = DomainLog::new(domain.id.clone(), author.clone(), level, content);
        if let Err(e) = self.storage.put_domain_log(&entry).await {
            warn!(domain = %domain.domain_name, error = %e, "failed to write domain log");
        }
    }

    async fn provider(&self, domain: &Domain) -> Result<GuardedProvider, CoreError> {
        self.providers.instantiate(&domain.provider_id).await
    }

    // ── Zones ────────────────────────────────────────────────────────

    /// A zone from the domain's history.
    pub async fn get_zone(
        &self,
        owner: &Identifier,
        domain_id: &Identifier,
        zone_id: &Identifier,
    ) -> Result<Zone, CoreError> {
        let domain = self.get(owner, domain_id).await?;
        if !domain.zone_history.contains(zone_id) {
            return Err(CoreError::not_found(EntityKind::Zone, zone_id));
        }
        self.storage.get_zone(zone_id).await
    }

    /// Pull the live zone from the provider and append it to the history.
    pub async fn import_zone(&self, owner: &Identifier, domain_id: &Identifier) -> Result<Zone, CoreError> {
        let mut domain = self.get(owner, domain_id).await?;
        let provider = self.provider(&domain).await?;
        let mut records = provider.get_zone_records(&domain.domain_name).await?;
        if self.corrections.skip_dnssec {
            records = strip_dnssec(records, &domain.domain_name);
        }

        let mut zone = analyze_zone(&records, &domain.domain_name, DEFAULT_ZONE_TTL)?;
        zone.author_id = owner.clone();
        for service in zone.services.values_mut().flatten() {
            service.owner_id = owner.clone();
        }
        self.storage.put_zone(&mut zone).await?;
        domain.push_zone(zone.id.clone());
        self.storage.put_domain(&domain).await?;

        let message = format!(
            "Zone imported: {} records in {} services",
            records.len(),
            zone.service_count()
        );
        info!(domain = %domain.domain_name, zone_id = %zone.id, "{message}");
        self.log(&domain, owner, LogLevel::Info, message).await;
        Ok(zone)
    }

    /// Copy a zone of the history into a new editable zone.
    pub async fn derive_zone(
        &self,
        owner: &Identifier,
        domain_id: &Identifier,
        zone_id: &Identifier,
    ) -> Result<Zone, CoreError> {
        let source = self.get_zone(owner, domain_id, zone_id).await?;
        let mut zone = source.derive();
        zone.author_id = owner.clone();
        self.append_zone(owner, domain_id, &mut zone).await?;
        Ok(zone)
    }

    /// Store an edited zone under a fresh id and append it to the history.
    pub async fn update_zone(
        &self,
        owner: &Identifier,
        domain_id: &Identifier,
        mut zone: Zone,
    ) -> Result<Zone, CoreError> {
        self.get(owner, domain_id).await?;
        zone.id = Identifier::empty();
        zone.last_modified = Utc::now();
        self.append_zone(owner, domain_id, &mut zone).await?;
        Ok(zone)
    }

    async fn append_zone(
        &self,
        owner: &Identifier,
        domain_id: &Identifier,
        zone: &mut Zone,
    ) -> Result<(), CoreError> {
        let mut domain = self.get(owner, domain_id).await?;
        self.storage.put_zone(zone).await?;
        domain.push_zone(zone.id.clone());
        self.storage.put_domain(&domain).await
    }

    /// Corrections that would bring the live zone to `zone_id`.
    pub async fn zone_corrections(
        &self,
        owner: &Identifier,
        domain_id: &Identifier,
        zone_id: &Identifier,
    ) -> Result<Vec<Correction>, CoreError> {
        let domain = self.get(owner, domain_id).await?;
        let zone = self.get_zone(owner, domain_id, zone_id).await?;
        let target = zone.records(&self.registries.services, &domain.domain_name)?;
        let provider = self.provider(&domain).await?;
        plan_corrections(&provider, &domain.domain_name, &target, &self.corrections).await
    }

    /// Publish `zone_id` through the provider.
    pub async fn apply_zone(
        &self,
        owner: &Identifier,
        domain_id: &Identifier,
        zone_id: &Identifier,
    ) -> Result<ApplyReport, CoreError> {
        let domain = self.get(owner, domain_id).await?;
        let mut zone = self.get_zone(owner, domain_id, zone_id).await?;
        let target = zone.records(&self.registries.services, &domain.domain_name)?;
        let provider = self.provider(&domain).await?;
        let corrections =
            plan_corrections(&provider, &domain.domain_name, &target, &self.corrections).await?;

        match apply_corrections(&provider, &domain.domain_name, &corrections, &self.corrections).await {
            Ok(report) => {
                zone.published = Some(Utc::now());
                self.storage.put_zone(&mut zone).await?;
                let message = format!("Zone published: {} corrections applied", report.applied);
                info!(domain = %domain.domain_name, zone_id = %zone.id, "{message}");
                self.log(&domain, owner, LogLevel::Info, message).await;
                Ok(report)
            }
            Err(e) => {
                warn!(domain = %domain.domain_name, error = %e, "zone publication failed");
                self.log(&domain, owner, LogLevel::Error, format!("Zone publication failed: {e}"))
                    .await;
                Err(e)
            }
        }
    }
}
