// ── Zone analyzer ──
//
// Turns a flat record set, as returned by a provider, into services
// grouped per subdomain. Every record ends up in exactly one service and
// materializing the services again yields the same record set.

use std::collections::BTreeMap;

use serde::Serialize;

use super::{
    CaaEntry, CaaPolicy, CnameAlias, MailExchange, MailExchangers, Origin, Orphan, Server,
    ServiceBody, SpfPolicy, TextRecord, make_service,
};
use crate::error::CoreError;
use crate::model::{Identifier, Rdata, Record, Zone, fqdn, relative_name};

/// Group `records` into a fresh zone rooted at `origin`.
pub fn analyze_zone(records: &[Record], origin: &str, default_ttl: u32) -> Result<Zone, CoreError> {
    let origin = fqdn(origin);
    let mut by_subdomain: BTreeMap<String, Vec<&Record>> = BTreeMap::new();
    for record in records {
        let sub = relative_name(&record.name, &origin).ok_or_else(|| {
            CoreError::validation(format!("record {record} lies outside zone {origin}"))
        })?;
        by_subdomain.entry(sub).or_default().push(record);
    }

    let mut zone = Zone::new(Identifier::empty(), default_ttl);
    for (sub, list) in by_subdomain {
        SubdomainAnalyzer::new(&mut zone, &sub, &origin).run(&list)?;
    }
    tracing::debug!(
        origin = %origin,
        records = records.len(),
        services = zone.service_count(),
        "zone analyzed"
    );
    Ok(zone)
}

struct SubdomainAnalyzer<'a> {
    zone: &'a mut Zone,
    sub: &'a str,
    origin: &'a str,
}

impl<'a> SubdomainAnalyzer<'a> {
    fn new(zone: &'a mut Zone, sub: &'a str, origin: &'a str) -> Self {
        Self { zone, sub, origin }
    }

    fn push<T: ServiceBody + Serialize>(&mut self, body: &T, ttl: u32) -> Result<(), CoreError> {
        let stored_ttl = (ttl != self.zone.default_ttl).then_some(ttl);
        let service = make_service(body, self.sub, self.origin, stored_ttl)?;
        self.zone.add_service(self.sub, service);
        Ok(())
    }

    fn run(mut self, records: &[&Record]) -> Result<(), CoreError> {
        let mut orphans: Vec<&Record> = Vec::new();
        let mut servers: BTreeMap<u32, Server> = BTreeMap::new();
        let mut mxs: BTreeMap<u32, MailExchangers> = BTreeMap::new();
        let mut caas: BTreeMap<u32, CaaPolicy> = BTreeMap::new();
        let mut cnames = Vec::new();
        let mut texts = Vec::new();
        let mut spfs = Vec::new();

        let apex = self.sub.is_empty();
        let soa = records
            .iter()
            .copied()
            .filter(|_| apex)
            .find_map(|r| match &r.rdata {
                Rdata::Soa(soa) => Some((r, soa)),
                _ => None,
            });
        let mut origin_body = soa.map(|(record, soa)| (record.ttl, Origin::from_soa(soa)));

        for &record in records {
            match &record.rdata {
                Rdata::Soa(_) if soa.is_some_and(|(r, _)| std::ptr::eq(r, record)) => {}
                Rdata::Ns(target) if origin_body.is_some() => {
                    let Some((soa_ttl, body)) = origin_body.as_mut() else {
                        continue;
                    };
                    let shared = if body.name_servers.is_empty() {
                        body.ns_ttl = (record.ttl != *soa_ttl).then_some(record.ttl);
                        true
                    } else {
                        record.ttl == body.ns_ttl.unwrap_or(*soa_ttl)
                    };
                    if shared {
                        body.name_servers.push(target.clone());
                    } else {
                        orphans.push(record);
                    }
                }
                Rdata::A(ip) => servers.entry(record.ttl).or_default().a.push(*ip),
                Rdata::Aaaa(ip) => servers.entry(record.ttl).or_default().aaaa.push(*ip),
                Rdata::Mx {
                    preference,
                    exchange,
                } => mxs.entry(record.ttl).or_default().mx.push(MailExchange {
                    preference: *preference,
                    target: exchange.clone(),
                }),
                Rdata::Caa { flags, tag, value } => {
                    caas.entry(record.ttl).or_default().entries.push(CaaEntry {
                        flags: *flags,
                        tag: tag.clone(),
                        value: value.clone(),
                    });
                }
                Rdata::Cname(target) if !apex => cnames.push((record.ttl, CnameAlias::new(target))),
                Rdata::Txt(txt) if SpfPolicy::is_spf(txt) => spfs.push((
                    record.ttl,
                    SpfPolicy {
                        policy: txt.clone(),
                        legacy_type: false,
                    },
                )),
                Rdata::Txt(txt) => texts.push((record.ttl, TextRecord { txt: txt.clone() })),
                Rdata::Spf(txt) if SpfPolicy::is_spf(txt) => spfs.push((
                    record.ttl,
                    SpfPolicy {
                        policy: txt.clone(),
                        legacy_type: true,
                    },
                )),
                _ => orphans.push(record),
            }
        }

        if let Some((ttl, body)) = origin_body {
            self.push(&body, ttl)?;
        }
        for (ttl, body) in servers {
            self.push(&body, ttl)?;
        }
        for (ttl, body) in mxs {
            self.push(&body, ttl)?;
        }
        for (ttl, body) in cnames {
            self.push(&body, ttl)?;
        }
        for (ttl, body) in texts {
            self.push(&body, ttl)?;
        }
        for (ttl, body) in spfs {
            self.push(&body, ttl)?;
        }
        for (ttl, body) in caas {
            self.push(&body, ttl)?;
        }
        for record in orphans {
            self.push(&Orphan::from_record(record), record.ttl)?;
        }
        Ok(())
    }
}
