// ── Applying corrections ──

use serde::Serialize;
use tracing::{debug, info, warn};

use super::{Change, Correction};
use crate::config::CorrectionOptions;
use crate::error::CoreError;
use crate::model::{Rdata, Soa};
use crate::provider::GuardedProvider;

/// Outcome of a successful apply.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ApplyReport {
    pub applied: usize,
    pub total: usize,
    /// The SOA went through the provider's dedicated update call.
    pub soa_updated: bool,
}

/// Enact `corrections` in order against `domain`.
///
/// When the provider has a dedicated SOA update, SOA corrections are
/// held back and sent once at the end. Any failure aborts with
/// [`CoreError::PartialApply`] carrying how many corrections went through.
pub async fn apply_corrections(
    provider: &GuardedProvider,
    domain: &str,
    corrections: &[Correction],
    options: &CorrectionOptions,
) -> Result<ApplyReport, CoreError> {
    let total = corrections.len();
    let defer_soa = provider.supports_soa_update();
    let mut deferred: Option<Soa> = None;
    let mut applied = 0;

    for correction in corrections {
        if defer_soa && correction.touches_soa() {
            match target_soa(correction) {
                Some(soa) => deferred = Some(soa),
                None => applied += 1,
            }
            continue;
        }
        if let Change::Report = correction.change {
            info!(domain, "{}", correction.msg);
        } else {
            debug!(domain, correction = %correction, "applying correction");
            provider
                .apply_correction(domain, correction)
                .await
                .map_err(|source| partial(applied, total, source))?;
        }
        applied += 1;
    }

    let mut soa_updated = false;
    if let Some(soa) = deferred {
        provider
            .update_soa(domain, &soa, options.refresh_soa_serial)
            .await
            .map_err(|source| partial(applied, total, source))?;
        soa_updated = true;
        applied = total;
    }

    info!(domain, applied, total, "corrections applied");
    Ok(ApplyReport {
        applied,
        total,
        soa_updated,
    })
}

fn target_soa(correction: &Correction) -> Option<Soa> {
    match &correction.change {
        Change::Add { record } | Change::Update { new: record, .. } => match &record.rdata {
            Rdata::Soa(soa) => Some(soa.clone()),
            _ => None,
        },
        // Deleting the SOA is never forwarded; the provider owns its existence.
        Change::Delete { .. } | Change::Report => None,
    }
}

fn partial(applied: usize, total: usize, source: CoreError) -> CoreError {
    warn!(applied, total, error = %source, "apply aborted");
    CoreError::PartialApply {
        applied,
        total,
        source: Box::new(source),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::correction::compute_corrections;
    use crate::model::Record;
    use crate::provider::{MemoryProvider, Provider};

    fn recs(lines: &[&str]) -> Vec<Record> {
        lines.iter().map(|l| l.parse().unwrap()).collect()
    }

    fn sorted(records: &[Record]) -> Vec<String> {
        let mut out: Vec<String> = records.iter().map(Record::canonical).collect();
        out.sort();
        out
    }

    const LIVE: &[&str] = &[
        "example.com. 3600 IN SOA ns1.example.com. hostmaster.example.com. 1 7200 3600 1209600 300",
        "example.com. 3600 IN NS ns1.example.com.",
        "www.example.com. 300 IN A 192.0.2.1",
        "old.example.com. 300 IN A 192.0.2.2",
    ];

    const TARGET: &[&str] = &[
        "example.com. 3600 IN SOA ns1.example.com. hostmaster.example.com. 2 7200 3600 1209600 300",
        "example.com. 3600 IN NS ns1.example.com.",
        "www.example.com. 300 IN A 192.0.2.10",
        "new.example.com. 300 IN A 192.0.2.3",
    ];

    /// Memory provider that fails every apply after a budget is spent.
    #[derive(Debug)]
    struct Flaky {
        inner: MemoryProvider,
        budget: AtomicUsize,
    }

    #[async_trait]
    impl Provider for Flaky {
        fn provider_type(&self) -> &'static str {
            "flaky"
        }

        async fn validate(&self) -> Result<(), CoreError> {
            Ok(())
        }

        async fn get_zone_records(&self, domain: &str) -> Result<Vec<Record>, CoreError> {
            self.inner.get_zone_records(domain).await
        }

        async fn apply_correction(
            &self,
            domain: &str,
            correction: &Correction,
        ) -> Result<(), CoreError> {
            let left = self.budget.load(Ordering::SeqCst);
            if left == 0 {
                return Err(CoreError::Provider {
                    call: "apply_correction",
                    message: "rate limited".into(),
                });
            }
            self.budget.store(left - 1, Ordering::SeqCst);
            self.inner.apply_correction(domain, correction).await
        }
    }

    #[tokio::test]
    async fn soa_goes_through_dedicated_update() {
        let memory = MemoryProvider::default();
        memory.insert_zone("example.com", recs(LIVE));
        let provider = GuardedProvider::new(Arc::new(memory.clone()));

        let live = provider.get_zone_records("example.com.").await.unwrap();
        let corrections = compute_corrections(&live, &recs(TARGET), "example.com.", true);
        let report = apply_corrections(
            &provider,
            "example.com.",
            &corrections,
            &CorrectionOptions::default(),
        )
        .await
        .unwrap();

        assert!(report.soa_updated);
        assert_eq!(report.applied, report.total);
        let after = memory.zone("example.com").unwrap();
        assert_eq!(sorted(&after), sorted(&recs(TARGET)));
    }

    #[tokio::test]
    async fn partial_failure_reports_progress_and_rerun_converges() {
        let memory = MemoryProvider::default();
        memory.insert_zone("example.com", recs(LIVE));
        let flaky = Arc::new(Flaky {
            inner: memory.clone(),
            budget: AtomicUsize::new(1),
        });
        let provider = GuardedProvider::new(flaky.clone());
        let target = recs(TARGET);
        let options = CorrectionOptions::default();

        let live = provider.get_zone_records("example.com.").await.unwrap();
        let first = compute_corrections(&live, &target, "example.com.", true);
        let err = apply_corrections(&provider, "example.com.", &first, &options)
            .await
            .unwrap_err();
        let CoreError::PartialApply { applied, total, .. } = err else {
            panic!("expected partial apply, got {err}");
        };
        assert_eq!(applied, 1);
        assert_eq!(total, first.len());

        flaky.budget.store(usize::MAX, Ordering::SeqCst);
        let live = provider.get_zone_records("example.com.").await.unwrap();
        let second = compute_corrections(&live, &target, "example.com.", true);
        assert!(second.len() <= total - applied);
        apply_corrections(&provider, "example.com.", &second, &options)
            .await
            .unwrap();
        assert_eq!(sorted(&memory.zone("example.com").unwrap()), sorted(&target));
    }
}
