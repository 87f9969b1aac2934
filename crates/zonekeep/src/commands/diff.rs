//! `zonekeep diff`: corrections from a live zone file to a target.

use tabled::Tabled;

use zonekeep_config::Config;
use zonekeep_core::{Correction, CorrectionOptions, plan_corrections};

use super::{memory_provider, read_zone, read_zone_text};
use crate::cli::{DiffArgs, GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
pub(crate) struct CorrectionRow {
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Change")]
    change: String,
}

impl From<&Correction> for CorrectionRow {
    fn from(c: &Correction) -> Self {
        Self {
            kind: c.kind().to_string(),
            change: c.msg.clone(),
        }
    }
}

pub(crate) fn correction_options(config: &Config, keep_dnssec: bool) -> CorrectionOptions {
    let mut options = config.to_correction_options();
    if keep_dnssec {
        options.skip_dnssec = false;
    }
    options
}

/// Render corrections; an empty table reads better as a sentence.
pub(crate) fn render_corrections(
    format: OutputFormat,
    corrections: &[Correction],
) -> Result<String, CliError> {
    if corrections.is_empty() && matches!(format, OutputFormat::Table) {
        return Ok("Zones already match.".into());
    }
    output::render_list(format, corrections, |c| CorrectionRow::from(c), |c| c.msg.clone())
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(args: DiffArgs, config: &Config, global: &GlobalOpts) -> Result<(), CliError> {
    let provider = memory_provider(&args.zone, &read_zone_text(&args.live)?)?;
    let target = read_zone(&args.target, &args.zone)?;
    let options = correction_options(config, args.keep_dnssec);

    let corrections = plan_corrections(&provider, &args.zone.origin, &target, &options).await?;
    tracing::debug!(count = corrections.len(), "corrections planned");

    let out = render_corrections(global.output, &corrections)?;
    output::print_output(&out, global.quiet);
    Ok(())
}
