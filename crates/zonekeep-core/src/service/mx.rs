use serde::{Deserialize, Serialize};

use super::{ServiceBody, ServiceInfo, ServiceRestrictions};
use crate::error::CoreError;
use crate::model::{Rdata, Record, RecordType, fqdn, join_name};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailExchange {
    pub preference: u16,
    pub target: String,
}

/// The mail servers accepting mail for a name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailExchangers {
    pub mx: Vec<MailExchange>,
}

impl ServiceBody for MailExchangers {
    fn service_type(&self) -> &'static str {
        "svcs.MXs"
    }

    fn nb_resources(&self) -> usize {
        self.mx.len()
    }

    fn gen_comment(&self, origin: &str) -> String {
        let origin = fqdn(origin);
        self.mx
            .iter()
            .map(|m| {
                let target = fqdn(&m.target);
                target
                    .strip_suffix(&format!(".{origin}"))
                    .map_or_else(|| target.clone(), str::to_owned)
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn records(&self, subdomain: &str, ttl: u32, origin: &str) -> Result<Vec<Record>, CoreError> {
        let owner = join_name(subdomain, origin);
        Ok(self
            .mx
            .iter()
            .map(|m| {
                Record::new(
                    &owner,
                    ttl,
                    Rdata::Mx {
                        preference: m.preference,
                        exchange: fqdn(&m.target),
                    },
                )
            })
            .collect())
    }
}

pub(super) fn info() -> ServiceInfo {
    ServiceInfo::new::<MailExchangers>("svcs.MXs", "E-Mail servers", "Mail exchangers for the domain")
        .record_types(&[RecordType::MX])
        .restrictions(ServiceRestrictions {
            single: true,
            ..ServiceRestrictions::default()
        })
}
