// ── In-memory provider ──
//
// Holds zones in a concurrent map. Serves offline tooling and tests;
// clones share the same zones.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use super::{Provider, ProviderInfo, SoaUpdater, ZoneLister};
use crate::correction::Correction;
use crate::error::{CoreError, EntityKind};
use crate::model::{Rdata, Record, Soa};
use crate::zonefile::parse_zone;

const PROVIDER_TYPE: &str = "memory";

/// Settings accepted by the memory provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemorySettings {
    /// Zone-file text keyed by domain name.
    #[serde(default)]
    pub zones: BTreeMap<String, String>,
    #[serde(default = "default_ttl")]
    pub default_ttl: u32,
}

fn default_ttl() -> u32 {
    3600
}

#[derive(Debug, Clone, Default)]
pub struct MemoryProvider {
    zones: Arc<DashMap<String, Vec<Record>>>,
}

fn zone_key(domain: &str) -> String {
    domain.trim_end_matches('.').to_ascii_lowercase()
}

impl MemoryProvider {
    pub fn from_settings(settings: &MemorySettings) -> Result<Self, CoreError> {
        let provider = Self::default();
        for (domain, text) in &settings.zones {
            let records = parse_zone(text, Some(domain), settings.default_ttl).map_err(|e| {
                CoreError::ProviderConfig {
                    provider_type: PROVIDER_TYPE.into(),
                    message: format!("zone {domain}: {e}"),
                }
            })?;
            provider.insert_zone(domain, records);
        }
        Ok(provider)
    }

    /// Replace the records of `domain`.
    pub fn insert_zone(&self, domain: &str, records: Vec<Record>) {
        self.zones.insert(zone_key(domain), records);
    }

    /// Snapshot of the records of `domain`.
    pub fn zone(&self, domain: &str) -> Option<Vec<Record>> {
        self.zones.get(&zone_key(domain)).map(|r| r.value().clone())
    }
}

#[async_trait]
impl Provider for MemoryProvider {
    fn provider_type(&self) -> &'static str {
        PROVIDER_TYPE
    }

    async fn validate(&self) -> Result<(), CoreError> {
        Ok(())
    }

    async fn get_zone_records(&self, domain: &str) -> Result<Vec<Record>, CoreError> {
        self.zone(domain)
            .ok_or_else(|| CoreError::not_found(EntityKind::Zone, domain))
    }

    async fn apply_correction(
        &self,
        domain: &str,
        correction: &Correction,
    ) -> Result<(), CoreError> {
        let mut zone = self
            .zones
            .get_mut(&zone_key(domain))
            .ok_or_else(|| CoreError::not_found(EntityKind::Zone, domain))?;
        correction.apply_to(zone.value_mut())
    }

    fn as_zone_lister(&self) -> Option<&dyn ZoneLister> {
        Some(self)
    }

    fn as_soa_updater(&self) -> Option<&dyn SoaUpdater> {
        Some(self)
    }
}

#[async_trait]
impl ZoneLister for MemoryProvider {
    async fn list_zones(&self) -> Result<Vec<String>, CoreError> {
        let mut names: Vec<String> = self.zones.iter().map(|e| format!("{}.", e.key())).collect();
        names.sort();
        Ok(names)
    }
}

#[async_trait]
impl SoaUpdater for MemoryProvider {
    async fn update_soa(
        &self,
        domain: &str,
        soa: &Soa,
        refresh_serial: bool,
    ) -> Result<(), CoreError> {
        let mut zone = self
            .zones
            .get_mut(&zone_key(domain))
            .ok_or_else(|| CoreError::not_found(EntityKind::Zone, domain))?;
        let current = zone
            .value_mut()
            .iter_mut()
            .find_map(|r| match &mut r.rdata {
                Rdata::Soa(existing) => Some(existing),
                _ => None,
            })
            .ok_or_else(|| CoreError::Provider {
                call: "update_soa",
                message: format!("zone {domain} has no SOA"),
            })?;

        let mut next = soa.clone();
        if refresh_serial {
            next.serial = next.serial.max(current.serial.wrapping_add(1));
        }
        *current = next;
        Ok(())
    }
}

fn build(settings: &serde_json::Value) -> Result<Arc<dyn Provider>, CoreError> {
    let settings: MemorySettings =
        serde_json::from_value(settings.clone()).map_err(|e| CoreError::ProviderConfig {
            provider_type: PROVIDER_TYPE.into(),
            message: e.to_string(),
        })?;
    Ok(Arc::new(MemoryProvider::from_settings(&settings)?))
}

pub(super) fn info() -> ProviderInfo {
    ProviderInfo::new(
        PROVIDER_TYPE,
        "In-memory",
        "Zones held in process memory",
        build,
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn provider() -> MemoryProvider {
        let mut zones = BTreeMap::new();
        zones.insert(
            "example.com".to_string(),
            "@ IN SOA ns1 hostmaster 10 7200 3600 1209600 300\n@ IN NS ns1\nwww IN A 192.0.2.1\n"
                .to_string(),
        );
        MemoryProvider::from_settings(&MemorySettings {
            zones,
            default_ttl: 600,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn serves_configured_zones() {
        let p = provider();
        let records = p.get_zone_records("EXAMPLE.com").await.unwrap();
        assert_eq!(records.len(), 3);
        assert!(records.iter().all(|r| r.ttl == 600));
        assert_eq!(p.list_zones().await.unwrap(), vec!["example.com.".to_string()]);
        assert!(p.get_zone_records("example.net").await.is_err());
    }

    #[tokio::test]
    async fn soa_refresh_bumps_serial() {
        let p = provider();
        let soa = Soa {
            mname: "ns1.example.com.".into(),
            rname: "hostmaster.example.com.".into(),
            serial: 5,
            refresh: 7200,
            retry: 3600,
            expire: 1_209_600,
            minimum: 60,
        };
        p.update_soa("example.com", &soa, true).await.unwrap();
        let zone = p.zone("example.com").unwrap();
        let Some(Rdata::Soa(updated)) = zone.iter().map(|r| &r.rdata).find(|d| matches!(d, Rdata::Soa(_))) else {
            panic!("SOA missing");
        };
        assert_eq!(updated.serial, 11);
        assert_eq!(updated.minimum, 60);
    }
}
