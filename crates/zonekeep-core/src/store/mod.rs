// ── Typed storage ──
//
// JSON-encoded entities over a `KvBackend`. Ownership is not enforced
// here; usecases filter by owner.
//
// Key layout:
//   domain-{id}                                   Domain
//   domain.zone-{id}                              Zone
//   domain.log|{domain}|{id}                      DomainLog
//   provider-{id}                                 ProviderConfig
//   chckrsch-{id}                                 CheckerSchedule
//   chckrexec-{id}                                CheckExecution
//   chckrst|{scope}|{target}|{checker}|{id}       CheckResult
//   chckropts|{checker}|{user}|{domain}|{service} CheckerOptions ("-" when unset)

mod backend;
mod iter;

use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{CoreError, EntityKind};
use crate::model::{
    CheckExecution, CheckResult, CheckScope, CheckerOptions, CheckerSchedule, Domain, DomainLog,
    Identifier, Zone,
};
use crate::provider::ProviderConfig;

pub use backend::{KvBackend, MemoryBackend};
pub use iter::ScanIter;

const DOMAIN: &str = "domain-";
const ZONE: &str = "domain.zone-";
const DOMAIN_LOG: &str = "domain.log|";
const PROVIDER: &str = "provider-";
const SCHEDULE: &str = "chckrsch-";
const EXECUTION: &str = "chckrexec-";
const RESULT: &str = "chckrst|";
const OPTIONS: &str = "chckropts|";

/// Placeholder for an unset segment in option keys.
const UNSET: &str = "-";

/// Read-modify-write attempts before giving up on a contended key.
const CAS_ATTEMPTS: usize = 16;

fn opt_segment(id: Option<&Identifier>) -> String {
    id.map_or_else(|| UNSET.to_owned(), ToString::to_string)
}

fn result_prefix(scope: CheckScope, target: &Identifier) -> String {
    format!("{RESULT}{scope}|{target}|")
}

fn encode<T: Serialize>(value: &T) -> Result<Bytes, CoreError> {
    Ok(Bytes::from(serde_json::to_vec(value)?))
}

/// One stored option layer together with the key it lives under.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredOptions {
    pub checker: String,
    pub user_id: Option<Identifier>,
    pub domain_id: Option<Identifier>,
    pub service_id: Option<Identifier>,
    pub options: CheckerOptions,
}

#[derive(Debug, Clone)]
pub struct Storage {
    backend: Arc<dyn KvBackend>,
}

impl Storage {
    pub fn new(backend: Arc<dyn KvBackend>) -> Self {
        Self { backend }
    }

    /// Storage over a fresh in-memory backend.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryBackend::new()))
    }

    pub fn backend(&self) -> &Arc<dyn KvBackend> {
        &self.backend
    }

    // ── Generic helpers ──────────────────────────────────────────────

    async fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, CoreError> {
        match self.backend.get(key).await? {
            Some(raw) => Ok(Some(serde_json::from_slice(&raw)?)),
            None => Ok(None),
        }
    }

    async fn load_required<T: DeserializeOwned>(
        &self,
        key: &str,
        entity: EntityKind,
        id: &Identifier,
    ) -> Result<T, CoreError> {
        self.load(key)
            .await?
            .ok_or_else(|| CoreError::not_found(entity, id))
    }

    async fn save<T: Serialize + Sync>(&self, key: &str, value: &T) -> Result<(), CoreError> {
        self.backend.put(key, encode(value)?).await
    }

    pub async fn scan<T: DeserializeOwned>(&self, prefix: &str) -> Result<ScanIter<T>, CoreError> {
        let entries = self.backend.scan_prefix(prefix).await?;
        Ok(ScanIter::new(Arc::clone(&self.backend), entries))
    }

    /// Read, modify and compare-and-swap `key` until the write lands.
    /// `apply` returns `false` to leave the entity untouched, in which
    /// case `None` is returned.
    async fn update_with<T, F>(
        &self,
        key: &str,
        entity: EntityKind,
        id: &Identifier,
        mut apply: F,
    ) -> Result<Option<T>, CoreError>
    where
        T: Serialize + DeserializeOwned + Send,
        F: FnMut(&mut T) -> Result<bool, CoreError> + Send,
    {
        for _ in 0..CAS_ATTEMPTS {
            let raw = self
                .backend
                .get(key)
                .await?
                .ok_or_else(|| CoreError::not_found(entity, id))?;
            let mut value: T = serde_json::from_slice(&raw)?;
            if !apply(&mut value)? {
                return Ok(None);
            }
            let next = encode(&value)?;
            if self.backend.compare_and_swap(key, Some(&raw), next).await? {
                return Ok(Some(value));
            }
        }
        Err(CoreError::storage(format!("gave up updating {key} after {CAS_ATTEMPTS} conflicting writes")))
    }

    // ── Domains ──────────────────────────────────────────────────────

    pub async fn get_domain(&self, id: &Identifier) -> Result<Domain, CoreError> {
        self.load_required(&format!("{DOMAIN}{id}"), EntityKind::Domain, id)
            .await
    }

    pub async fn put_domain(&self, domain: &Domain) -> Result<(), CoreError> {
        self.save(&format!("{DOMAIN}{}", domain.id), domain).await
    }

    pub async fn delete_domain(&self, id: &Identifier) -> Result<(), CoreError> {
        self.backend.delete(&format!("{DOMAIN}{id}")).await?;
        Ok(())
    }

    pub async fn list_domains(&self) -> Result<ScanIter<Domain>, CoreError> {
        self.scan(DOMAIN).await
    }

    // ── Zones ────────────────────────────────────────────────────────

    pub async fn get_zone(&self, id: &Identifier) -> Result<Zone, CoreError> {
        self.load_required(&format!("{ZONE}{id}"), EntityKind::Zone, id)
            .await
    }

    /// Store a zone, assigning an id to freshly derived ones.
    pub async fn put_zone(&self, zone: &mut Zone) -> Result<(), CoreError> {
        if zone.id.is_empty() {
            zone.id = Identifier::generate();
        }
        self.save(&format!("{ZONE}{}", zone.id), zone).await
    }

    pub async fn delete_zone(&self, id: &Identifier) -> Result<(), CoreError> {
        self.backend.delete(&format!("{ZONE}{id}")).await?;
        Ok(())
    }

    // ── Domain logs ──────────────────────────────────────────────────

    pub async fn put_domain_log(&self, log: &DomainLog) -> Result<(), CoreError> {
        self.save(&format!("{DOMAIN_LOG}{}|{}", log.domain_id, log.id), log)
            .await
    }

    /// Logs of one domain, oldest first.
    pub async fn list_domain_logs(&self, domain_id: &Identifier) -> Result<Vec<DomainLog>, CoreError> {
        let mut logs: Vec<DomainLog> = self
            .scan(&format!("{DOMAIN_LOG}{domain_id}|"))
            .await?
            .collect::<Result<_, _>>()?;
        logs.sort_by(|a, b| a.date.cmp(&b.date));
        Ok(logs)
    }

    pub async fn delete_domain_logs(&self, domain_id: &Identifier) -> Result<usize, CoreError> {
        self.delete_prefix(&format!("{DOMAIN_LOG}{domain_id}|")).await
    }

    // ── Providers ────────────────────────────────────────────────────

    pub async fn get_provider(&self, id: &Identifier) -> Result<ProviderConfig, CoreError> {
        self.load_required(&format!("{PROVIDER}{id}"), EntityKind::Provider, id)
            .await
    }

    pub async fn put_provider(&self, provider: &ProviderConfig) -> Result<(), CoreError> {
        self.save(&format!("{PROVIDER}{}", provider.id), provider)
            .await
    }

    pub async fn delete_provider(&self, id: &Identifier) -> Result<(), CoreError> {
        self.backend.delete(&format!("{PROVIDER}{id}")).await?;
        Ok(())
    }

    pub async fn list_providers(&self) -> Result<ScanIter<ProviderConfig>, CoreError> {
        self.scan(PROVIDER).await
    }

    // ── Schedules ────────────────────────────────────────────────────

    pub async fn get_schedule(&self, id: &Identifier) -> Result<CheckerSchedule, CoreError> {
        self.load_required(&format!("{SCHEDULE}{id}"), EntityKind::CheckSchedule, id)
            .await
    }

    pub async fn put_schedule(&self, schedule: &CheckerSchedule) -> Result<(), CoreError> {
        self.save(&format!("{SCHEDULE}{}", schedule.id), schedule)
            .await
    }

    pub async fn delete_schedule(&self, id: &Identifier) -> Result<bool, CoreError> {
        self.backend.delete(&format!("{SCHEDULE}{id}")).await
    }

    pub async fn list_schedules(&self) -> Result<ScanIter<CheckerSchedule>, CoreError> {
        self.scan(SCHEDULE).await
    }

    /// Atomically advance a due schedule. `None` when it is no longer
    /// due (another writer advanced or disabled it first).
    pub async fn advance_schedule(
        &self,
        id: &Identifier,
        now: DateTime<Utc>,
    ) -> Result<Option<CheckerSchedule>, CoreError> {
        self.update_with(
            &format!("{SCHEDULE}{id}"),
            EntityKind::CheckSchedule,
            id,
            |s: &mut CheckerSchedule| {
                if !s.is_due(now) {
                    return Ok(false);
                }
                s.advance(now);
                Ok(true)
            },
        )
        .await
    }

    // ── Executions ───────────────────────────────────────────────────

    pub async fn get_execution(&self, id: &Identifier) -> Result<CheckExecution, CoreError> {
        self.load_required(&format!("{EXECUTION}{id}"), EntityKind::CheckExecution, id)
            .await
    }

    pub async fn put_execution(&self, execution: &CheckExecution) -> Result<(), CoreError> {
        self.save(&format!("{EXECUTION}{}", execution.id), execution)
            .await
    }

    pub async fn delete_execution(&self, id: &Identifier) -> Result<bool, CoreError> {
        self.backend.delete(&format!("{EXECUTION}{id}")).await
    }

    pub async fn list_executions(&self) -> Result<ScanIter<CheckExecution>, CoreError> {
        self.scan(EXECUTION).await
    }

    /// Compare-and-swap update of one execution.
    pub async fn update_execution<F>(
        &self,
        id: &Identifier,
        mut apply: F,
    ) -> Result<CheckExecution, CoreError>
    where
        F: FnMut(&mut CheckExecution) -> Result<(), CoreError> + Send,
    {
        self.update_with(
            &format!("{EXECUTION}{id}"),
            EntityKind::CheckExecution,
            id,
            |e: &mut CheckExecution| apply(e).map(|()| true),
        )
        .await?
        .ok_or_else(|| CoreError::Internal(format!("execution {id} update was skipped")))
    }

    // ── Results ──────────────────────────────────────────────────────

    fn result_key(result: &CheckResult) -> String {
        format!(
            "{}{}|{}",
            result_prefix(result.check_type, &result.target_id),
            result.checker_name,
            result.id
        )
    }

    pub async fn put_result(&self, result: &CheckResult) -> Result<(), CoreError> {
        self.save(&Self::result_key(result), result).await
    }

    pub async fn delete_result(&self, result: &CheckResult) -> Result<bool, CoreError> {
        self.backend.delete(&Self::result_key(result)).await
    }

    pub async fn get_result(
        &self,
        scope: CheckScope,
        target: &Identifier,
        checker: &str,
        id: &Identifier,
    ) -> Result<CheckResult, CoreError> {
        let key = format!("{}{checker}|{id}", result_prefix(scope, target));
        self.load_required(&key, EntityKind::CheckResult, id).await
    }

    /// Results of one checker on one target, newest first.
    pub async fn list_results(
        &self,
        checker: &str,
        scope: CheckScope,
        target: &Identifier,
    ) -> Result<Vec<CheckResult>, CoreError> {
        let prefix = format!("{}{checker}|", result_prefix(scope, target));
        let mut iter = self.scan::<CheckResult>(&prefix).await?;
        let mut results = Vec::with_capacity(iter.remaining());
        while let Some(result) = iter.next_valid() {
            results.push(result);
        }
        sort_newest_first(&mut results);
        Ok(results)
    }

    /// Every result on one target, across checkers.
    pub async fn scan_target_results(
        &self,
        scope: CheckScope,
        target: &Identifier,
    ) -> Result<ScanIter<CheckResult>, CoreError> {
        self.scan(&result_prefix(scope, target)).await
    }

    /// Every result for targets of one scope.
    pub async fn scan_scope_results(&self, scope: CheckScope) -> Result<ScanIter<CheckResult>, CoreError> {
        self.scan(&format!("{RESULT}{scope}|")).await
    }

    pub async fn delete_target_results(
        &self,
        scope: CheckScope,
        target: &Identifier,
    ) -> Result<usize, CoreError> {
        self.delete_prefix(&result_prefix(scope, target)).await
    }

    // ── Checker option layers ────────────────────────────────────────

    fn options_key(
        checker: &str,
        user: Option<&Identifier>,
        domain: Option<&Identifier>,
        service: Option<&Identifier>,
    ) -> String {
        format!(
            "{OPTIONS}{checker}|{}|{}|{}",
            opt_segment(user),
            opt_segment(domain),
            opt_segment(service)
        )
    }

    pub async fn get_checker_options(
        &self,
        checker: &str,
        user: Option<&Identifier>,
        domain: Option<&Identifier>,
        service: Option<&Identifier>,
    ) -> Result<Option<CheckerOptions>, CoreError> {
        self.load(&Self::options_key(checker, user, domain, service))
            .await
    }

    pub async fn put_checker_options(
        &self,
        checker: &str,
        user: Option<&Identifier>,
        domain: Option<&Identifier>,
        service: Option<&Identifier>,
        options: &CheckerOptions,
    ) -> Result<(), CoreError> {
        self.save(&Self::options_key(checker, user, domain, service), options)
            .await
    }

    pub async fn delete_checker_options(
        &self,
        checker: &str,
        user: Option<&Identifier>,
        domain: Option<&Identifier>,
        service: Option<&Identifier>,
    ) -> Result<bool, CoreError> {
        self.backend
            .delete(&Self::options_key(checker, user, domain, service))
            .await
    }

    /// Every stored option layer, with its key decoded.
    pub async fn list_checker_options(&self) -> Result<Vec<StoredOptions>, CoreError> {
        let mut iter = self.scan::<CheckerOptions>(OPTIONS).await?;
        let mut layers = Vec::new();
        while let Some(options) = iter.next_valid() {
            let Some(key) = iter.key() else { continue };
            if let Some(layer) = parse_options_key(key, options) {
                layers.push(layer);
            }
        }
        Ok(layers)
    }

    /// Remove every option layer attached to a domain.
    pub async fn delete_domain_checker_options(&self, domain_id: &Identifier) -> Result<usize, CoreError> {
        let mut removed = 0;
        for layer in self.list_checker_options().await? {
            if layer.domain_id.as_ref() == Some(domain_id) {
                self.delete_checker_options(
                    &layer.checker,
                    layer.user_id.as_ref(),
                    layer.domain_id.as_ref(),
                    layer.service_id.as_ref(),
                )
                .await?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    // ── Bulk ─────────────────────────────────────────────────────────

    async fn delete_prefix(&self, prefix: &str) -> Result<usize, CoreError> {
        let entries = self.backend.scan_prefix(prefix).await?;
        for (key, _) in &entries {
            self.backend.delete(key).await?;
        }
        Ok(entries.len())
    }
}

pub(crate) fn sort_newest_first(results: &mut [CheckResult]) {
    results.sort_by(|a, b| {
        b.executed_at
            .cmp(&a.executed_at)
            .then_with(|| b.id.cmp(&a.id))
    });
}

fn parse_options_key(key: &str, options: CheckerOptions) -> Option<StoredOptions> {
    let mut parts = key.strip_prefix(OPTIONS)?.split('|');
    let checker = parts.next()?.to_owned();
    let mut segment = || -> Option<Option<Identifier>> {
        match parts.next()? {
            UNSET => Some(None),
            s => s.parse().ok().map(Some),
        }
    };
    let user_id = segment()?;
    let domain_id = segment()?;
    let service_id = segment()?;
    Some(StoredOptions {
        checker,
        user_id,
        domain_id,
        service_id,
        options,
    })
}
