//! `zonekeep apply`: enact corrections against a live zone file.

use serde::Serialize;

use zonekeep_config::Config;
use zonekeep_core::zonefile::write_zone;
use zonekeep_core::{Correction, apply_corrections, plan_corrections};

use super::diff::{correction_options, render_corrections};
use super::{memory_provider, read_zone, read_zone_text};
use crate::cli::{ApplyArgs, GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output;

#[derive(Debug, Serialize)]
struct ApplyOutcome {
    applied: usize,
    total: usize,
    soa_updated: bool,
    corrections: Vec<Correction>,
    zone: String,
}

pub async fn handle(args: ApplyArgs, config: &Config, global: &GlobalOpts) -> Result<(), CliError> {
    let origin = &args.zone.origin;
    let provider = memory_provider(&args.zone, &read_zone_text(&args.live)?)?;
    let target = read_zone(&args.target, &args.zone)?;
    let mut options = correction_options(config, args.keep_dnssec);
    if args.keep_serial {
        options.refresh_soa_serial = false;
    }

    let corrections = plan_corrections(&provider, origin, &target, &options).await?;
    let report = apply_corrections(&provider, origin, &corrections, &options).await?;
    tracing::info!(
        applied = report.applied,
        total = report.total,
        soa_updated = report.soa_updated,
        "corrections applied"
    );

    let zone = write_zone(&provider.get_zone_records(origin).await?, origin);
    if args.write {
        std::fs::write(&args.live, &zone)?;
    }

    let outcome = ApplyOutcome {
        applied: report.applied,
        total: report.total,
        soa_updated: report.soa_updated,
        corrections,
        zone,
    };
    let out = match global.output {
        OutputFormat::Table => format!(
            "{}\n\nApplied {} of {} corrections{}.\n\n{}",
            render_corrections(OutputFormat::Table, &outcome.corrections)?,
            outcome.applied,
            outcome.total,
            if outcome.soa_updated { ", SOA serial refreshed" } else { "" },
            outcome.zone.trim_end()
        ),
        OutputFormat::Plain => outcome.zone.trim_end().to_owned(),
        format => output::render_single(format, &outcome, |_| String::new(), |o| o.zone.clone())?,
    };
    output::print_output(&out, global.quiet);
    Ok(())
}
