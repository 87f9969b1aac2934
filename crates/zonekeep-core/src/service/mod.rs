//! Service kinds: typed bodies behind the stored service envelope.
//!
//! Each kind registers a [`ServiceInfo`] in a [`ServiceRegistry`]. The
//! registry is built once at startup and handed to the usecases; there
//! is no process-global table.

mod analyzer;
mod caa;
mod cname;
mod mx;
mod origin;
mod orphan;
mod server;
mod txt;

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{CoreError, EntityKind};
use crate::model::{Identifier, Record, RecordType, Service, Zone};

pub use analyzer::analyze_zone;
pub use caa::{CaaEntry, CaaPolicy};
pub use cname::CnameAlias;
pub use mx::{MailExchange, MailExchangers};
pub use origin::Origin;
pub use orphan::Orphan;
pub use server::Server;
pub use txt::{SpfPolicy, TextRecord};

// ── ServiceBody ─────────────────────────────────────────────────────

/// Behaviour shared by every service kind.
pub trait ServiceBody: Send + Sync + fmt::Debug {
    /// Registered type string, e.g. `abstract.Origin`.
    fn service_type(&self) -> &'static str;

    fn nb_resources(&self) -> usize;

    /// Short human description of the body.
    fn gen_comment(&self, origin: &str) -> String;

    /// Materialize records under `subdomain` of `origin` with `ttl`.
    fn records(&self, subdomain: &str, ttl: u32, origin: &str) -> Result<Vec<Record>, CoreError>;
}

/// Wrap a typed body into a stored envelope with a fresh id.
pub fn make_service<T: ServiceBody + Serialize>(
    body: &T,
    subdomain: &str,
    origin: &str,
    ttl: Option<u32>,
) -> Result<Service, CoreError> {
    Ok(Service {
        service_type: body.service_type().to_owned(),
        id: Identifier::generate(),
        owner_id: Identifier::empty(),
        subdomain: crate::model::normalize_subdomain(subdomain),
        ttl,
        aliases: Vec::new(),
        comment: body.gen_comment(origin),
        user_comment: String::new(),
        nb_resources: body.nb_resources(),
        body: serde_json::to_value(body)?,
    })
}

// ── Restrictions ────────────────────────────────────────────────────

/// Advisory placement rules consulted by validators.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct ServiceRestrictions {
    /// Must be the only service in its subdomain.
    pub alone: bool,
    /// Service types that cannot share the subdomain.
    pub exclusive: Vec<String>,
    /// May hold glue records outside the zone.
    pub glue: bool,
    /// Cannot have subdomains below it.
    pub leaf: bool,
    /// Only coexists with services that are not themselves alone.
    pub near_alone: bool,
    /// Record types that must already exist in the subdomain.
    pub need_types: Vec<RecordType>,
    /// Only valid at the zone apex.
    pub root_only: bool,
    /// At most one instance per subdomain.
    pub single: bool,
}

// ── ServiceInfo ─────────────────────────────────────────────────────

type DecodeFn = fn(serde_json::Value) -> Result<Box<dyn ServiceBody>, serde_json::Error>;

fn decode_as<T: ServiceBody + DeserializeOwned + 'static>(
    value: serde_json::Value,
) -> Result<Box<dyn ServiceBody>, serde_json::Error> {
    let body: T = serde_json::from_value(value)?;
    Ok(Box::new(body))
}

/// Registry entry for one service kind.
#[derive(Clone, Serialize)]
pub struct ServiceInfo {
    pub service_type: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub family: &'static str,
    pub record_types: Vec<RecordType>,
    pub restrictions: ServiceRestrictions,
    #[serde(skip)]
    decode: DecodeFn,
}

impl ServiceInfo {
    pub fn new<T: ServiceBody + DeserializeOwned + 'static>(
        service_type: &'static str,
        name: &'static str,
        description: &'static str,
    ) -> Self {
        Self {
            service_type,
            name,
            description,
            family: "service",
            record_types: Vec::new(),
            restrictions: ServiceRestrictions::default(),
            decode: decode_as::<T>,
        }
    }

    pub fn family(mut self, family: &'static str) -> Self {
        self.family = family;
        self
    }

    pub fn record_types(mut self, types: &[RecordType]) -> Self {
        self.record_types = types.to_vec();
        self
    }

    pub fn restrictions(mut self, restrictions: ServiceRestrictions) -> Self {
        self.restrictions = restrictions;
        self
    }
}

impl fmt::Debug for ServiceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceInfo")
            .field("service_type", &self.service_type)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

// ── ServiceRegistry ─────────────────────────────────────────────────

/// Maps service type strings to their decoders and metadata.
#[derive(Debug, Clone, Default)]
pub struct ServiceRegistry {
    kinds: BTreeMap<&'static str, ServiceInfo>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry populated with every built-in kind.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        for info in [
            origin::info(),
            server::info(),
            cname::info(),
            mx::info(),
            txt::text_info(),
            txt::spf_info(),
            caa::info(),
            orphan::info(),
        ] {
            // Built-in type strings are distinct.
            let _ = registry.register(info);
        }
        registry
    }

    pub fn register(&mut self, info: ServiceInfo) -> Result<(), CoreError> {
        if self.kinds.contains_key(info.service_type) {
            return Err(CoreError::Conflict {
                entity: EntityKind::Service,
                identifier: info.service_type.to_owned(),
            });
        }
        self.kinds.insert(info.service_type, info);
        Ok(())
    }

    pub fn get(&self, service_type: &str) -> Option<&ServiceInfo> {
        self.kinds.get(service_type)
    }

    pub fn list(&self) -> impl Iterator<Item = &ServiceInfo> {
        self.kinds.values()
    }

    /// Decode the payload of a stored service into its typed body.
    pub fn decode(&self, service: &Service) -> Result<Box<dyn ServiceBody>, CoreError> {
        let info = self.get(&service.service_type).ok_or_else(|| {
            CoreError::validation(format!("unknown service type {}", service.service_type))
        })?;
        (info.decode)(service.body.clone()).map_err(|e| {
            CoreError::validation(format!(
                "invalid {} payload for service {}: {e}",
                service.service_type, service.id
            ))
        })
    }

    /// Records of one service; an unset TTL inherits `default_ttl`.
    pub fn service_records(
        &self,
        service: &Service,
        subdomain: &str,
        origin: &str,
        default_ttl: u32,
    ) -> Result<Vec<Record>, CoreError> {
        self.decode(service)?
            .records(subdomain, service.effective_ttl(default_ttl), origin)
    }

    /// Check advisory restrictions for placing `service_type` in `subdomain`.
    ///
    /// `ignore` excludes a service being replaced from the checks.
    pub fn validate_placement(
        &self,
        zone: &Zone,
        subdomain: &str,
        service_type: &str,
        ignore: Option<&Identifier>,
    ) -> Result<(), CoreError> {
        let info = self.get(service_type).ok_or_else(|| {
            CoreError::validation(format!("unknown service type {service_type}"))
        })?;
        let subdomain = crate::model::normalize_subdomain(subdomain);
        let r = &info.restrictions;

        if r.root_only && !subdomain.is_empty() {
            return Err(CoreError::validation(format!(
                "{} can only be placed at the zone apex",
                info.name
            )));
        }

        let neighbours: Vec<&Service> = zone
            .services
            .get(&subdomain)
            .map(|list| {
                list.iter()
                    .filter(|s| Some(&s.id) != ignore)
                    .collect()
            })
            .unwrap_or_default();

        if r.alone && !neighbours.is_empty() {
            return Err(CoreError::validation(format!(
                "{} must be alone in its subdomain",
                info.name
            )));
        }
        if r.single && neighbours.iter().any(|s| s.service_type == service_type) {
            return Err(CoreError::validation(format!(
                "only one {} is allowed per subdomain",
                info.name
            )));
        }
        for other in &neighbours {
            if r.exclusive.iter().any(|t| *t == other.service_type) {
                return Err(CoreError::validation(format!(
                    "{} cannot coexist with {}",
                    info.name, other.service_type
                )));
            }
            let other_alone = self
                .get(&other.service_type)
                .is_some_and(|o| o.restrictions.alone || (o.restrictions.near_alone && r.near_alone));
            if other_alone {
                return Err(CoreError::validation(format!(
                    "{} already occupies this subdomain",
                    other.service_type
                )));
            }
        }
        for needed in &r.need_types {
            let present = neighbours.iter().any(|s| {
                self.get(&s.service_type)
                    .is_some_and(|o| o.record_types.contains(needed))
            });
            if !present {
                return Err(CoreError::validation(format!(
                    "{} requires an existing {needed} record",
                    info.name
                )));
            }
        }
        Ok(())
    }
}
