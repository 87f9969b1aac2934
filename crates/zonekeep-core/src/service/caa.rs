use serde::{Deserialize, Serialize};

use super::{ServiceBody, ServiceInfo, ServiceRestrictions};
use crate::error::CoreError;
use crate::model::{Rdata, Record, RecordType, join_name};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaaEntry {
    #[serde(default)]
    pub flags: u8,
    pub tag: String,
    pub value: String,
}

/// Certification authorities allowed to issue for a name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaaPolicy {
    pub entries: Vec<CaaEntry>,
}

impl ServiceBody for CaaPolicy {
    fn service_type(&self) -> &'static str {
        "svcs.CAA"
    }

    fn nb_resources(&self) -> usize {
        self.entries.len()
    }

    fn gen_comment(&self, _origin: &str) -> String {
        let issuers: Vec<&str> = self
            .entries
            .iter()
            .filter(|e| e.tag.eq_ignore_ascii_case("issue"))
            .map(|e| e.value.as_str())
            .collect();
        if issuers.is_empty() {
            "no issuer allowed".into()
        } else {
            issuers.join(", ")
        }
    }

    fn records(&self, subdomain: &str, ttl: u32, origin: &str) -> Result<Vec<Record>, CoreError> {
        let owner = join_name(subdomain, origin);
        self.entries
            .iter()
            .map(|e| {
                if e.tag.is_empty() || !e.tag.bytes().all(|b| b.is_ascii_alphanumeric()) {
                    return Err(CoreError::validation(format!("invalid CAA tag {:?}", e.tag)));
                }
                Ok(Record::new(
                    &owner,
                    ttl,
                    Rdata::Caa {
                        flags: e.flags,
                        tag: e.tag.clone(),
                        value: e.value.clone(),
                    },
                ))
            })
            .collect()
    }
}

pub(super) fn info() -> ServiceInfo {
    ServiceInfo::new::<CaaPolicy>(
        "svcs.CAA",
        "Certification Authority Authorization",
        "Restricts which CAs may issue certificates",
    )
    .record_types(&[RecordType::CAA])
    .restrictions(ServiceRestrictions {
        single: true,
        ..ServiceRestrictions::default()
    })
}
