// ── Provider call boundary ──
//
// Every provider call runs inside `guarded`: a panic in adapter code
// becomes `CoreError::Panic` and plain failures are tagged with the call
// they came from. Nothing raised by an adapter escapes unclassified.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use tracing::error;

use super::Provider;
use crate::correction::Correction;
use crate::error::{CoreError, panic_message};
use crate::model::{Record, Soa};

/// A provider behind the panic and error boundary.
#[derive(Debug, Clone)]
pub struct GuardedProvider {
    inner: Arc<dyn Provider>,
}

impl GuardedProvider {
    pub fn new(inner: Arc<dyn Provider>) -> Self {
        Self { inner }
    }

    pub fn provider_type(&self) -> &'static str {
        self.inner.provider_type()
    }

    /// Whether both guards wrap the same provider instance.
    pub fn same_backend(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn supports_zone_listing(&self) -> bool {
        self.inner.as_zone_lister().is_some()
    }

    pub fn supports_soa_update(&self) -> bool {
        self.inner.as_soa_updater().is_some()
    }

    pub async fn validate(&self) -> Result<(), CoreError> {
        guarded("validate", self.inner.validate()).await
    }

    /// Live records of the zone named `fqdn`.
    pub async fn get_zone_records(&self, fqdn: &str) -> Result<Vec<Record>, CoreError> {
        guarded("get_zone_records", self.inner.get_zone_records(bare(fqdn))).await
    }

    pub async fn zone_corrections(
        &self,
        fqdn: &str,
        target: &[Record],
        live: &[Record],
    ) -> Result<Option<Vec<Correction>>, CoreError> {
        guarded(
            "zone_corrections",
            self.inner.zone_corrections(bare(fqdn), target, live),
        )
        .await
    }

    pub async fn apply_correction(
        &self,
        fqdn: &str,
        correction: &Correction,
    ) -> Result<(), CoreError> {
        guarded(
            "apply_correction",
            self.inner.apply_correction(bare(fqdn), correction),
        )
        .await
    }

    pub async fn list_zones(&self) -> Result<Vec<String>, CoreError> {
        let lister = self.inner.as_zone_lister().ok_or_else(|| CoreError::Unsupported {
            operation: format!("list_zones on {}", self.provider_type()),
        })?;
        guarded("list_zones", lister.list_zones()).await
    }

    pub async fn update_soa(
        &self,
        fqdn: &str,
        soa: &Soa,
        refresh_serial: bool,
    ) -> Result<(), CoreError> {
        let updater = self.inner.as_soa_updater().ok_or_else(|| CoreError::Unsupported {
            operation: format!("update_soa on {}", self.provider_type()),
        })?;
        guarded("update_soa", updater.update_soa(bare(fqdn), soa, refresh_serial)).await
    }
}

fn bare(fqdn: &str) -> &str {
    fqdn.strip_suffix('.').unwrap_or(fqdn)
}

async fn guarded<T, F>(call: &'static str, fut: F) -> Result<T, CoreError>
where
    F: Future<Output = Result<T, CoreError>>,
{
    match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(wrap(call, err)),
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            error!(call, panic = %message, "provider panicked");
            Err(CoreError::Panic {
                call: format!("provider {call}"),
                message,
            })
        }
    }
}

/// Keep classified errors, tag everything else with the call site.
fn wrap(call: &'static str, err: CoreError) -> CoreError {
    match err {
        CoreError::ProviderAuth { .. }
        | CoreError::ProviderConfig { .. }
        | CoreError::Provider { .. }
        | CoreError::Unsupported { .. }
        | CoreError::Timeout { .. }
        | CoreError::NotFound { .. }
        | CoreError::ValidationFailed { .. } => err,
        other => CoreError::Provider {
            call,
            message: other.to_string(),
        },
    }
}
