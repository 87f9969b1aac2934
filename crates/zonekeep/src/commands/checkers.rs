//! `zonekeep checkers`: registered checkers and their options.

use serde::Serialize;
use tabled::Tabled;

use zonekeep_core::CheckerRegistry;
use zonekeep_core::checker::OptionDoc;

use crate::cli::{CheckersArgs, CheckersCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct CheckerSummary {
    id: &'static str,
    name: &'static str,
    domain: bool,
    service: bool,
    limit_to_services: Vec<String>,
    has_html_report: bool,
}

#[derive(Tabled)]
struct CheckerRow {
    #[tabled(rename = "ID")]
    id: &'static str,
    #[tabled(rename = "Name")]
    name: &'static str,
    #[tabled(rename = "Applies to")]
    scopes: String,
}

impl From<&CheckerSummary> for CheckerRow {
    fn from(c: &CheckerSummary) -> Self {
        let mut scopes = Vec::new();
        if c.domain {
            scopes.push("domain".to_owned());
        }
        if c.service {
            if c.limit_to_services.is_empty() {
                scopes.push("service".to_owned());
            } else {
                scopes.push(format!("service ({})", c.limit_to_services.join(", ")));
            }
        }
        Self {
            id: c.id,
            name: c.name,
            scopes: scopes.join(", "),
        }
    }
}

#[derive(Debug, Serialize)]
struct OptionEntry {
    layer: &'static str,
    #[serde(flatten)]
    doc: OptionDoc,
}

#[derive(Tabled)]
struct OptionRow {
    #[tabled(rename = "Layer")]
    layer: &'static str,
    #[tabled(rename = "Option")]
    id: String,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Default")]
    default: String,
    #[tabled(rename = "Description")]
    description: String,
}

impl From<&OptionEntry> for OptionRow {
    fn from(e: &OptionEntry) -> Self {
        Self {
            layer: e.layer,
            id: e.doc.id.clone(),
            kind: e.doc.kind.to_string(),
            default: e
                .doc
                .default
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default(),
            description: if e.doc.description.is_empty() {
                e.doc.label.clone()
            } else {
                e.doc.description.clone()
            },
        }
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: CheckersArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let registry = CheckerRegistry::with_builtin();
    let out = match args.command {
        CheckersCommand::List => {
            let checkers: Vec<CheckerSummary> = registry
                .list()
                .map(|c| {
                    let availability = c.availability();
                    CheckerSummary {
                        id: c.id(),
                        name: c.name(),
                        domain: availability.apply_to_domain,
                        service: availability.apply_to_service,
                        limit_to_services: availability.limit_to_services,
                        has_html_report: c.as_html_reporter().is_some(),
                    }
                })
                .collect();
            output::render_list(global.output, &checkers, |c| CheckerRow::from(c), |c| {
                c.id.to_owned()
            })?
        }
        CheckersCommand::Options { checker } => {
            let docs = registry.get(&checker)?.options();
            let entries: Vec<OptionEntry> = docs
                .all()
                .map(|(layer, doc)| OptionEntry {
                    layer,
                    doc: doc.clone(),
                })
                .collect();
            output::render_list(global.output, &entries, |e| OptionRow::from(e), |e| {
                e.doc.id.clone()
            })?
        }
    };
    output::print_output(&out, global.quiet);
    Ok(())
}
