//! `zonekeep import`: group a zone file's records into services.

use tabled::Tabled;

use zonekeep_core::{Service, analyze_zone};

use super::read_zone;
use crate::cli::{GlobalOpts, ImportArgs};
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct ServiceRow {
    #[tabled(rename = "Subdomain")]
    subdomain: String,
    #[tabled(rename = "Type")]
    service_type: String,
    #[tabled(rename = "TTL")]
    ttl: String,
    #[tabled(rename = "Records")]
    records: usize,
    #[tabled(rename = "Comment")]
    comment: String,
}

impl From<&Service> for ServiceRow {
    fn from(s: &Service) -> Self {
        Self {
            subdomain: if s.subdomain.is_empty() {
                "@".into()
            } else {
                s.subdomain.clone()
            },
            service_type: s.service_type.clone(),
            ttl: s.ttl.map_or_else(|| "default".into(), |ttl| ttl.to_string()),
            records: s.nb_resources,
            comment: s.comment.clone(),
        }
    }
}

pub fn handle(args: &ImportArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let records = read_zone(&args.file, &args.zone)?;
    let zone = analyze_zone(&records, &args.zone.origin, args.zone.default_ttl)?;
    let services: Vec<Service> = zone.services.into_values().flatten().collect();
    tracing::debug!(records = records.len(), services = services.len(), "zone analyzed");

    let out = output::render_list(global.output, &services, |s| ServiceRow::from(s), |s| {
        format!("{}\t{}", s.subdomain, s.service_type)
    })?;
    output::print_output(&out, global.quiet);
    Ok(())
}
