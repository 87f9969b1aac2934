use serde::{Deserialize, Serialize};

use super::{ServiceBody, ServiceInfo, ServiceRestrictions};
use crate::error::CoreError;
use crate::model::{Rdata, Record, RecordType, join_name};

/// Free-form text record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextRecord {
    pub txt: String,
}

impl ServiceBody for TextRecord {
    fn service_type(&self) -> &'static str {
        "svcs.TXT"
    }

    fn nb_resources(&self) -> usize {
        1
    }

    fn gen_comment(&self, _origin: &str) -> String {
        const PREVIEW: usize = 32;
        match self.txt.char_indices().nth(PREVIEW) {
            Some((cut, _)) => format!("{}…", &self.txt[..cut]),
            None => self.txt.clone(),
        }
    }

    fn records(&self, subdomain: &str, ttl: u32, origin: &str) -> Result<Vec<Record>, CoreError> {
        Ok(vec![Record::new(
            &join_name(subdomain, origin),
            ttl,
            Rdata::Txt(self.txt.clone()),
        )])
    }
}

/// Sender Policy Framework policy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpfPolicy {
    pub policy: String,
    /// Publish under the obsolete SPF type instead of TXT.
    #[serde(default)]
    pub legacy_type: bool,
}

impl SpfPolicy {
    pub fn is_spf(txt: &str) -> bool {
        txt.get(..6).is_some_and(|p| p.eq_ignore_ascii_case("v=spf1"))
            && matches!(txt.as_bytes().get(6), None | Some(b' '))
    }

    /// Mechanisms after the version tag.
    pub fn directives(&self) -> impl Iterator<Item = &str> {
        self.policy.split_whitespace().skip(1)
    }
}

impl ServiceBody for SpfPolicy {
    fn service_type(&self) -> &'static str {
        "svcs.SPF"
    }

    fn nb_resources(&self) -> usize {
        1
    }

    fn gen_comment(&self, _origin: &str) -> String {
        self.directives().collect::<Vec<_>>().join(" ")
    }

    fn records(&self, subdomain: &str, ttl: u32, origin: &str) -> Result<Vec<Record>, CoreError> {
        if !Self::is_spf(&self.policy) {
            return Err(CoreError::validation(
                "SPF policy must start with the v=spf1 version tag",
            ));
        }
        let rdata = if self.legacy_type {
            Rdata::Spf(self.policy.clone())
        } else {
            Rdata::Txt(self.policy.clone())
        };
        Ok(vec![Record::new(&join_name(subdomain, origin), ttl, rdata)])
    }
}

pub(super) fn text_info() -> ServiceInfo {
    ServiceInfo::new::<TextRecord>("svcs.TXT", "Text record", "Arbitrary text attached to a name")
        .record_types(&[RecordType::TXT])
}

pub(super) fn spf_info() -> ServiceInfo {
    ServiceInfo::new::<SpfPolicy>("svcs.SPF", "SPF", "Sender Policy Framework policy")
        .record_types(&[RecordType::TXT, RecordType::SPF])
        .restrictions(ServiceRestrictions {
            single: true,
            ..ServiceRestrictions::default()
        })
}
