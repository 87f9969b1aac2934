use serde::{Deserialize, Serialize};

use super::{ServiceBody, ServiceInfo, ServiceRestrictions};
use crate::error::CoreError;
use crate::model::{ORIGIN_SERVICE, Rdata, Record, RecordType, Soa, fqdn, join_name};

/// Zone apex: the SOA and the authoritative name servers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Origin {
    pub ns: String,
    pub mbox: String,
    pub serial: u32,
    pub refresh: u32,
    pub retry: u32,
    pub expire: u32,
    pub nxttl: u32,
    #[serde(default)]
    pub name_servers: Vec<String>,
    /// TTL of the NS set when it differs from the SOA's; `None` shares it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ns_ttl: Option<u32>,
}

impl Origin {
    pub fn from_soa(soa: &Soa) -> Self {
        Self {
            ns: soa.mname.clone(),
            mbox: soa.rname.clone(),
            serial: soa.serial,
            refresh: soa.refresh,
            retry: soa.retry,
            expire: soa.expire,
            nxttl: soa.minimum,
            name_servers: Vec::new(),
            ns_ttl: None,
        }
    }

    pub fn soa(&self) -> Soa {
        Soa {
            mname: fqdn(&self.ns),
            rname: fqdn(&self.mbox),
            serial: self.serial,
            refresh: self.refresh,
            retry: self.retry,
            expire: self.expire,
            minimum: self.nxttl,
        }
    }
}

impl ServiceBody for Origin {
    fn service_type(&self) -> &'static str {
        ORIGIN_SERVICE
    }

    fn nb_resources(&self) -> usize {
        1 + self.name_servers.len()
    }

    fn gen_comment(&self, _origin: &str) -> String {
        match self.name_servers.len() {
            0 => fqdn(&self.ns),
            n => format!("{} +{n} name servers", fqdn(&self.ns)),
        }
    }

    fn records(&self, subdomain: &str, ttl: u32, origin: &str) -> Result<Vec<Record>, CoreError> {
        let owner = join_name(subdomain, origin);
        let ns_ttl = self.ns_ttl.unwrap_or(ttl);
        let mut records = vec![Record::new(&owner, ttl, Rdata::Soa(self.soa()))];
        records.extend(
            self.name_servers
                .iter()
                .map(|ns| Record::new(&owner, ns_ttl, Rdata::Ns(fqdn(ns)))),
        );
        Ok(records)
    }
}

pub(super) fn info() -> ServiceInfo {
    ServiceInfo::new::<Origin>(ORIGIN_SERVICE, "Origin", "Start of authority and name servers")
        .family("abstract")
        .record_types(&[RecordType::SOA, RecordType::NS])
        .restrictions(ServiceRestrictions {
            root_only: true,
            single: true,
            ..ServiceRestrictions::default()
        })
}
