use serde::{Deserialize, Serialize};

use super::{ServiceBody, ServiceInfo, ServiceRestrictions};
use crate::error::CoreError;
use crate::model::{Rdata, Record, RecordType, fqdn, join_name};

/// An alias pointing at another name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CnameAlias {
    pub target: String,
}

impl CnameAlias {
    pub fn new(target: &str) -> Self {
        Self {
            target: fqdn(target),
        }
    }
}

impl ServiceBody for CnameAlias {
    fn service_type(&self) -> &'static str {
        "svcs.CNAME"
    }

    fn nb_resources(&self) -> usize {
        1
    }

    fn gen_comment(&self, _origin: &str) -> String {
        format!("-> {}", fqdn(&self.target))
    }

    fn records(&self, subdomain: &str, ttl: u32, origin: &str) -> Result<Vec<Record>, CoreError> {
        if subdomain.is_empty() || subdomain == "@" {
            return Err(CoreError::validation("a CNAME cannot be placed at the zone apex"));
        }
        Ok(vec![Record::new(
            &join_name(subdomain, origin),
            ttl,
            Rdata::Cname(fqdn(&self.target)),
        )])
    }
}

pub(super) fn info() -> ServiceInfo {
    ServiceInfo::new::<CnameAlias>("svcs.CNAME", "Alias", "Canonical name pointing elsewhere")
        .record_types(&[RecordType::CNAME])
        .restrictions(ServiceRestrictions {
            alone: true,
            single: true,
            ..ServiceRestrictions::default()
        })
}
