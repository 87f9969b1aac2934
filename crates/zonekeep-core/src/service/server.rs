use std::net::{Ipv4Addr, Ipv6Addr};

use serde::{Deserialize, Serialize};

use super::{ServiceBody, ServiceInfo};
use crate::error::CoreError;
use crate::model::{Rdata, Record, RecordType, join_name};

/// A host reachable at a set of addresses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Server {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub a: Vec<Ipv4Addr>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aaaa: Vec<Ipv6Addr>,
}

impl Server {
    pub fn new(a: Vec<Ipv4Addr>, aaaa: Vec<Ipv6Addr>) -> Self {
        Self { a, aaaa }
    }
}

impl ServiceBody for Server {
    fn service_type(&self) -> &'static str {
        "abstract.Server"
    }

    fn nb_resources(&self) -> usize {
        self.a.len() + self.aaaa.len()
    }

    fn gen_comment(&self, _origin: &str) -> String {
        self.a
            .iter()
            .map(ToString::to_string)
            .chain(self.aaaa.iter().map(ToString::to_string))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn records(&self, subdomain: &str, ttl: u32, origin: &str) -> Result<Vec<Record>, CoreError> {
        let owner = join_name(subdomain, origin);
        Ok(self
            .a
            .iter()
            .map(|ip| Record::new(&owner, ttl, Rdata::A(*ip)))
            .chain(
                self.aaaa
                    .iter()
                    .map(|ip| Record::new(&owner, ttl, Rdata::Aaaa(*ip))),
            )
            .collect())
    }
}

pub(super) fn info() -> ServiceInfo {
    ServiceInfo::new::<Server>("abstract.Server", "Server", "IPv4 and IPv6 addresses of a host")
        .family("abstract")
        .record_types(&[RecordType::A, RecordType::AAAA])
}
