use serde::{Deserialize, Serialize};

use super::{ServiceBody, ServiceInfo};
use crate::error::CoreError;
use crate::model::{Record, RecordType, join_name};

/// A single record no other service claims, kept in presentation form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Orphan {
    #[serde(rename = "type")]
    pub rtype: RecordType,
    pub rdata: String,
}

impl Orphan {
    pub fn from_record(record: &Record) -> Self {
        Self {
            rtype: record.rtype(),
            rdata: record.rdata.to_string(),
        }
    }
}

impl ServiceBody for Orphan {
    fn service_type(&self) -> &'static str {
        "svcs.Orphan"
    }

    fn nb_resources(&self) -> usize {
        1
    }

    fn gen_comment(&self, _origin: &str) -> String {
        format!("{} {}", self.rtype, self.rdata)
    }

    fn records(&self, subdomain: &str, ttl: u32, origin: &str) -> Result<Vec<Record>, CoreError> {
        let line = format!(
            "{} {ttl} IN {} {}",
            join_name(subdomain, origin),
            self.rtype,
            self.rdata
        );
        Ok(vec![line.parse()?])
    }
}

pub(super) fn info() -> ServiceInfo {
    ServiceInfo::new::<Orphan>("svcs.Orphan", "Orphan record", "Record without a dedicated service")
        .family("hidden")
}
