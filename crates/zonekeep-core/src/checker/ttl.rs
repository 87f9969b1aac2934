// ── zone.ttl ──
//
// Flags records whose TTL is low enough to hurt resolver caching.

use std::fmt::Write as _;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{
    Availability, CheckMeta, CheckOutcome, Checker, HtmlReporter, OptionDoc, OptionsDocumentation,
    html_escape, option_u64,
};
use crate::error::CoreError;
use crate::model::{CheckStatus, CheckerOptions};

const ID: &str = "zone.ttl";

#[derive(Debug, Clone, Copy, Default)]
pub struct TtlChecker;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct LowTtl {
    record: String,
    ttl: u32,
    critical: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct TtlReport {
    checked: usize,
    min_ttl: u64,
    critical_ttl: u64,
    offending: Vec<LowTtl>,
}

#[async_trait]
impl Checker for TtlChecker {
    fn id(&self) -> &'static str {
        ID
    }

    fn name(&self) -> &'static str {
        "Record TTLs"
    }

    fn availability(&self) -> Availability {
        Availability {
            apply_to_domain: true,
            apply_to_service: true,
            ..Availability::default()
        }
    }

    fn options(&self) -> OptionsDocumentation {
        let min = OptionDoc::new("min_ttl", "Minimum TTL")
            .number()
            .default_value(json!(300))
            .describe("Records below this TTL raise a warning");
        let critical = OptionDoc::new("critical_ttl", "Critical TTL")
            .number()
            .default_value(json!(60))
            .describe("Records below this TTL are critical");
        OptionsDocumentation::builder()
            .domain(min.clone())
            .domain(critical.clone())
            .service(min)
            .service(critical)
    }

    async fn run_check(
        &self,
        options: &CheckerOptions,
        meta: &CheckMeta,
    ) -> Result<CheckOutcome, CoreError> {
        let min_ttl = option_u64(options, "min_ttl", ID)?;
        let critical_ttl = option_u64(options, "critical_ttl", ID)?;
        if meta.records.is_empty() {
            return Ok(CheckOutcome {
                status: CheckStatus::Unknown,
                status_line: "No records to inspect".into(),
                report: serde_json::Value::Null,
            });
        }

        let offending: Vec<LowTtl> = meta
            .records
            .iter()
            .filter(|r| u64::from(r.ttl) < min_ttl)
            .map(|r| LowTtl {
                record: r.to_string(),
                ttl: r.ttl,
                critical: u64::from(r.ttl) < critical_ttl,
            })
            .collect();

        let criticals = offending.iter().filter(|o| o.critical).count();
        let (status, status_line) = match (offending.len(), criticals) {
            (0, _) => (
                CheckStatus::Ok,
                format!("All {} records have a TTL of at least {min_ttl}s", meta.records.len()),
            ),
            (_, 0) => (
                CheckStatus::Warn,
                format!("{} records have a TTL below {min_ttl}s", offending.len()),
            ),
            (_, n) => (
                CheckStatus::Critical,
                format!("{n} records have a TTL below {critical_ttl}s"),
            ),
        };

        let report = TtlReport {
            checked: meta.records.len(),
            min_ttl,
            critical_ttl,
            offending,
        };
        Ok(CheckOutcome {
            status,
            status_line,
            report: serde_json::to_value(report)?,
        })
    }

    fn as_html_reporter(&self) -> Option<&dyn HtmlReporter> {
        Some(self)
    }
}

impl HtmlReporter for TtlChecker {
    fn html_report(&self, raw: &[u8]) -> Result<String, CoreError> {
        let report: TtlReport = serde_json::from_slice(raw)?;
        let mut html = format!(
            "<h2>TTL check</h2>\n<p>{} records checked, warning below {}s, critical below {}s.</p>\n",
            report.checked, report.min_ttl, report.critical_ttl
        );
        if report.offending.is_empty() {
            html.push_str("<p>No record below the minimum TTL.</p>\n");
            return Ok(html);
        }
        html.push_str("<table>\n<tr><th>Record</th><th>TTL</th><th>Level</th></tr>\n");
        for o in &report.offending {
            let level = if o.critical { "critical" } else { "warning" };
            let _ = writeln!(
                html,
                "<tr class=\"{level}\"><td><code>{}</code></td><td>{}</td><td>{level}</td></tr>",
                html_escape(&o.record),
                o.ttl
            );
        }
        html.push_str("</table>\n");
        Ok(html)
    }
}
