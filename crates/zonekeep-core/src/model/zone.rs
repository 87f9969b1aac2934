// ── Zone snapshots ──
//
// A zone is a versioned snapshot: services indexed by subdomain. Zones
// are never edited in place once stored; an edit derives a new zone and
// the domain's history grows by one id.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::identifier::Identifier;
use super::record::Record;
use super::service::Service;
use crate::error::{CoreError, EntityKind};
use crate::service::ServiceRegistry;

/// Normalize a subdomain key: `@` and the apex name collapse to `""`.
pub fn normalize_subdomain(subdomain: &str) -> String {
    match subdomain.trim().trim_end_matches('.') {
        "@" => String::new(),
        other => other.to_ascii_lowercase(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub id: Identifier,
    /// Zone this one was derived from; empty for a root snapshot.
    #[serde(default)]
    pub parent_zone: Identifier,
    #[serde(default)]
    pub author_id: Identifier,
    pub default_ttl: u32,
    pub last_modified: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit_msg: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published: Option<DateTime<Utc>>,
    /// Services keyed by subdomain, `""` being the apex.
    #[serde(default)]
    pub services: BTreeMap<String, Vec<Service>>,
}

impl Zone {
    /// Fresh root snapshot with a generated id.
    pub fn new(author_id: Identifier, default_ttl: u32) -> Self {
        Self {
            id: Identifier::generate(),
            parent_zone: Identifier::empty(),
            author_id,
            default_ttl,
            last_modified: Utc::now(),
            commit_msg: None,
            published: None,
            services: BTreeMap::new(),
        }
    }

    /// Copy services into a new, not yet stored, zone linked to `self`.
    pub fn derive(&self) -> Self {
        Self {
            id: Identifier::empty(),
            parent_zone: self.id.clone(),
            author_id: self.author_id.clone(),
            default_ttl: self.default_ttl,
            last_modified: Utc::now(),
            commit_msg: None,
            published: None,
            services: self.services.clone(),
        }
    }

    pub fn service_count(&self) -> usize {
        self.services.values().map(Vec::len).sum()
    }

    /// Locate a service anywhere in the zone.
    pub fn find_service(&self, id: &Identifier) -> Option<(&str, &Service)> {
        self.services.iter().find_map(|(sub, list)| {
            list.iter()
                .find(|s| &s.id == id)
                .map(|s| (sub.as_str(), s))
        })
    }

    /// Position of a service within one subdomain.
    pub fn find_subdomain_service(
        &self,
        subdomain: &str,
        id: &Identifier,
    ) -> Option<(usize, &Service)> {
        self.services
            .get(&normalize_subdomain(subdomain))?
            .iter()
            .enumerate()
            .find(|(_, s)| &s.id == id)
    }

    /// Append a service under `subdomain`, assigning an id when it has none.
    pub fn add_service(&mut self, subdomain: &str, mut service: Service) -> Identifier {
        let key = normalize_subdomain(subdomain);
        if service.id.is_empty() {
            service.id = Identifier::generate();
        }
        service.subdomain.clone_from(&key);
        let id = service.id.clone();
        self.services.entry(key).or_default().push(service);
        self.last_modified = Utc::now();
        id
    }

    /// Remove or replace a service in place.
    ///
    /// The origin service can only be replaced, never removed.
    pub fn erase_service(
        &mut self,
        subdomain: &str,
        id: &Identifier,
        replacement: Option<Service>,
    ) -> Result<(), CoreError> {
        let key = normalize_subdomain(subdomain);
        let (idx, existing) = self
            .find_subdomain_service(&key, id)
            .ok_or_else(|| CoreError::not_found(EntityKind::Service, id))?;

        if replacement.is_none() && existing.is_origin() {
            return Err(CoreError::validation(
                "the origin service cannot be deleted, only replaced",
            ));
        }

        let Some(list) = self.services.get_mut(&key) else {
            return Err(CoreError::not_found(EntityKind::Service, id));
        };
        match replacement {
            Some(mut service) => {
                service.subdomain.clone_from(&key);
                list[idx] = service;
            }
            None => {
                list.remove(idx);
                if list.is_empty() {
                    self.services.remove(&key);
                }
            }
        }
        self.last_modified = Utc::now();
        Ok(())
    }

    /// Swap the typed body of a service, keeping its metadata.
    pub fn erase_service_without_meta(
        &mut self,
        subdomain: &str,
        id: &Identifier,
        new_body: Service,
    ) -> Result<(), CoreError> {
        let key = normalize_subdomain(subdomain);
        let (idx, _) = self
            .find_subdomain_service(&key, id)
            .ok_or_else(|| CoreError::not_found(EntityKind::Service, id))?;
        let Some(slot) = self.services.get_mut(&key).and_then(|l| l.get_mut(idx)) else {
            return Err(CoreError::not_found(EntityKind::Service, id));
        };
        slot.service_type = new_body.service_type;
        slot.body = new_body.body;
        slot.nb_resources = new_body.nb_resources;
        self.last_modified = Utc::now();
        Ok(())
    }

    /// Flatten every service into records under `origin`.
    pub fn records(
        &self,
        registry: &ServiceRegistry,
        origin: &str,
    ) -> Result<Vec<Record>, CoreError> {
        let mut records = Vec::new();
        for (sub, list) in &self.services {
            for service in list {
                records.extend(registry.service_records(service, sub, origin, self.default_ttl)?);
            }
        }
        Ok(records)
    }
}
