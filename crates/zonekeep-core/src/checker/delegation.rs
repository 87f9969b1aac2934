// ── zone.delegation ──

use std::fmt::Write as _;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{
    Availability, CheckMeta, CheckOutcome, Checker, HtmlReporter, OptionsDocumentation,
    html_escape,
};
use crate::error::CoreError;
use crate::model::{CheckStatus, CheckerOptions, Rdata, names_equal};

/// Counts the name servers published at the apex.
#[derive(Debug, Clone, Copy, Default)]
pub struct DelegationChecker;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct DelegationReport {
    name_servers: Vec<String>,
}

#[async_trait]
impl Checker for DelegationChecker {
    fn id(&self) -> &'static str {
        "zone.delegation"
    }

    fn name(&self) -> &'static str {
        "Apex delegation"
    }

    fn availability(&self) -> Availability {
        Availability {
            apply_to_domain: true,
            ..Availability::default()
        }
    }

    fn options(&self) -> OptionsDocumentation {
        OptionsDocumentation::builder()
    }

    async fn run_check(
        &self,
        _options: &CheckerOptions,
        meta: &CheckMeta,
    ) -> Result<CheckOutcome, CoreError> {
        let apex = meta.domain_name.as_deref().ok_or_else(|| CoreError::CheckFailed {
            checker: self.id().to_owned(),
            message: "no domain in execution context".into(),
        })?;

        let mut name_servers: Vec<String> = meta
            .records
            .iter()
            .filter(|r| names_equal(&r.name, apex))
            .filter_map(|r| match &r.rdata {
                Rdata::Ns(ns) => Some(ns.to_ascii_lowercase()),
                _ => None,
            })
            .collect();
        name_servers.sort();
        name_servers.dedup();

        let (status, status_line) = match name_servers.len() {
            0 => (CheckStatus::Critical, format!("{apex} publishes no name server")),
            1 => (
                CheckStatus::Warn,
                format!("{apex} relies on a single name server"),
            ),
            n => (CheckStatus::Ok, format!("{apex} is served by {n} name servers")),
        };
        Ok(CheckOutcome {
            status,
            status_line,
            report: serde_json::to_value(DelegationReport { name_servers })?,
        })
    }

    fn as_html_reporter(&self) -> Option<&dyn HtmlReporter> {
        Some(self)
    }
}

impl HtmlReporter for DelegationChecker {
    fn html_report(&self, raw: &[u8]) -> Result<String, CoreError> {
        let report: DelegationReport = serde_json::from_slice(raw)?;
        let mut html = String::from("<h2>Name servers</h2>\n<ul>\n");
        for ns in &report.name_servers {
            let _ = writeln!(html, "<li><code>{}</code></li>", html_escape(ns));
        }
        html.push_str("</ul>\n");
        Ok(html)
    }
}
