//! Correction engine: diff a live zone against a target and enact the
//! resulting changes through a provider.

mod apply;
mod diff;

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::config::CorrectionOptions;
use crate::error::CoreError;
use crate::model::{Record, RecordType};
use crate::provider::GuardedProvider;

pub use apply::{ApplyReport, apply_corrections};
pub use diff::{compute_corrections, strip_dnssec};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum CorrectionKind {
    Addition,
    Update,
    Deletion,
    Other,
}

/// The record-level effect of a correction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum Change {
    Add { record: Record },
    Delete { record: Record },
    Update { old: Record, new: Record },
    /// Informational message with no record effect.
    Report,
}

/// An atomic intent to mutate the live zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Correction {
    pub msg: String,
    #[serde(flatten)]
    pub change: Change,
}

impl Correction {
    pub fn add(record: Record) -> Self {
        Self {
            msg: format!("+ {record}"),
            change: Change::Add { record },
        }
    }

    pub fn delete(record: Record) -> Self {
        Self {
            msg: format!("- {record}"),
            change: Change::Delete { record },
        }
    }

    pub fn update(old: Record, new: Record) -> Self {
        let msg = if old.ttl == new.ttl {
            format!("± {old} => {}", new.rdata)
        } else {
            format!("± {old} => {} {}", new.ttl, new.rdata)
        };
        Self {
            msg,
            change: Change::Update { old, new },
        }
    }

    pub fn report(msg: impl Into<String>) -> Self {
        Self {
            msg: msg.into(),
            change: Change::Report,
        }
    }

    pub fn kind(&self) -> CorrectionKind {
        match self.change {
            Change::Add { .. } => CorrectionKind::Addition,
            Change::Delete { .. } => CorrectionKind::Deletion,
            Change::Update { .. } => CorrectionKind::Update,
            Change::Report => CorrectionKind::Other,
        }
    }

    /// Record type touched by this correction, if any.
    pub fn rtype(&self) -> Option<RecordType> {
        match &self.change {
            Change::Add { record } | Change::Delete { record } => Some(record.rtype()),
            Change::Update { new, .. } => Some(new.rtype()),
            Change::Report => None,
        }
    }

    pub fn touches_soa(&self) -> bool {
        self.rtype() == Some(RecordType::SOA)
    }

    /// Apply to an in-memory record set. Used by providers without a
    /// native change API and by tests.
    pub fn apply_to(&self, records: &mut Vec<Record>) -> Result<(), CoreError> {
        match &self.change {
            Change::Add { record } => records.push(record.clone()),
            Change::Delete { record } => {
                let idx = position(records, record)?;
                records.remove(idx);
            }
            Change::Update { old, new } => {
                let idx = position(records, old)?;
                records[idx] = new.clone();
            }
            Change::Report => {}
        }
        Ok(())
    }
}

fn position(records: &[Record], wanted: &Record) -> Result<usize, CoreError> {
    records
        .iter()
        .position(|r| r.is_canonically_equal(wanted))
        .ok_or_else(|| CoreError::Provider {
            call: "apply_correction",
            message: format!("record not present in live zone: {wanted}"),
        })
}

impl fmt::Display for Correction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.msg)
    }
}

/// Import the live zone and compute the corrections reaching `target`.
///
/// Corrections supplied by the provider win; otherwise the engine diffs.
pub async fn plan_corrections(
    provider: &GuardedProvider,
    domain: &str,
    target: &[Record],
    options: &CorrectionOptions,
) -> Result<Vec<Correction>, CoreError> {
    let mut live = provider.get_zone_records(domain).await?;
    let mut target = target.to_vec();
    if options.skip_dnssec {
        live = strip_dnssec(live, domain);
        target = strip_dnssec(target, domain);
    }

    if let Some(corrections) = provider.zone_corrections(domain, &target, &live).await? {
        tracing::debug!(domain, count = corrections.len(), "provider supplied corrections");
        return Ok(corrections);
    }
    Ok(compute_corrections(&live, &target, domain, options.skip_dnssec))
}
