// ── Check results ──
//
// Retention is enforced right after each write: only the newest
// `retention` results per (checker, scope, target) survive.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tracing::debug;

use super::ensure_owner;
use crate::checker::CheckerRegistry;
use crate::error::{CoreError, EntityKind};
use crate::model::{CheckResult, CheckScope, CheckStatus, Identifier};
use crate::store::{Storage, sort_newest_first};

#[derive(Debug, Clone)]
pub struct CheckResultUsecase {
    storage: Storage,
    checkers: Arc<CheckerRegistry>,
    retention: usize,
}

impl CheckResultUsecase {
    pub fn new(storage: Storage, checkers: Arc<CheckerRegistry>, retention: usize) -> Self {
        Self {
            storage,
            checkers,
            retention: retention.max(1),
        }
    }

    pub fn retention(&self) -> usize {
        self.retention
    }

    /// Store a result, then trim its history down to the retention cap.
    pub async fn create(&self, result: &CheckResult) -> Result<(), CoreError> {
        self.storage.put_result(result).await?;
        let history = self
            .storage
            .list_results(&result.checker_name, result.check_type, &result.target_id)
            .await?;
        for stale in history.iter().skip(self.retention) {
            self.storage.delete_result(stale).await?;
        }
        if history.len() > self.retention {
            debug!(
                checker = %result.checker_name,
                target = %result.target_id,
                dropped = history.len() - self.retention,
                "applied result retention"
            );
        }
        Ok(())
    }

    pub async fn get(
        &self,
        owner: &Identifier,
        scope: CheckScope,
        target: &Identifier,
        checker: &str,
        id: &Identifier,
    ) -> Result<CheckResult, CoreError> {
        let result = self.storage.get_result(scope, target, checker, id).await?;
        ensure_owner(EntityKind::CheckResult, id, &result.owner_id, owner)?;
        Ok(result)
    }

    /// Results of one checker on one target, newest first.
    pub async fn list_by_target(
        &self,
        checker: &str,
        scope: CheckScope,
        target: &Identifier,
        limit: usize,
    ) -> Result<Vec<CheckResult>, CoreError> {
        let mut results = self.storage.list_results(checker, scope, target).await?;
        results.truncate(limit);
        Ok(results)
    }

    /// Results of every checker on one target owned by `owner`, newest first.
    pub async fn list_all_by_target(
        &self,
        scope: CheckScope,
        target: &Identifier,
        owner: &Identifier,
        limit: usize,
    ) -> Result<Vec<CheckResult>, CoreError> {
        let mut iter = self.storage.scan_target_results(scope, target).await?;
        let mut results = Vec::new();
        while let Some(result) = iter.next_valid() {
            if &result.owner_id == owner {
                results.push(result);
            }
        }
        sort_newest_first(&mut results);
        results.truncate(limit);
        Ok(results)
    }

    /// Worst status across the latest result of each checker on a target.
    pub async fn worst_status(
        &self,
        scope: CheckScope,
        target: &Identifier,
        owner: &Identifier,
    ) -> Result<Option<CheckStatus>, CoreError> {
        let mut iter = self.storage.scan_target_results(scope, target).await?;
        let mut latest: HashMap<String, CheckResult> = HashMap::new();
        while let Some(result) = iter.next_valid() {
            if &result.owner_id == owner {
                keep_latest(&mut latest, result.checker_name.clone(), result);
            }
        }
        Ok(latest.values().map(|r| r.status).max())
    }

    /// Worst status per target of one scope, in a single scan.
    pub async fn worst_status_by_user(
        &self,
        scope: CheckScope,
        owner: &Identifier,
    ) -> Result<BTreeMap<String, CheckStatus>, CoreError> {
        let mut iter = self.storage.scan_scope_results(scope).await?;
        let mut latest: HashMap<(Identifier, String), CheckResult> = HashMap::new();
        while let Some(result) = iter.next_valid() {
            if &result.owner_id == owner {
                let key = (result.target_id.clone(), result.checker_name.clone());
                keep_latest(&mut latest, key, result);
            }
        }

        let mut worst: BTreeMap<String, CheckStatus> = BTreeMap::new();
        for ((target, _), result) in latest {
            worst
                .entry(target.to_string())
                .and_modify(|s| *s = (*s).max(result.status))
                .or_insert(result.status);
        }
        Ok(worst)
    }

    /// Remove every result on a target.
    pub async fn delete_target_results(
        &self,
        scope: CheckScope,
        target: &Identifier,
    ) -> Result<usize, CoreError> {
        self.storage.delete_target_results(scope, target).await
    }

    /// Render a result through its checker's HTML reporter.
    pub fn html_report(&self, result: &CheckResult) -> Result<String, CoreError> {
        let checker = self.checkers.get(&result.checker_name)?;
        let reporter = checker.as_html_reporter().ok_or_else(|| CoreError::Unsupported {
            operation: format!("HTML reports for {}", result.checker_name),
        })?;
        let raw = serde_json::to_vec(&result.report)?;
        reporter.html_report(&raw)
    }
}

fn keep_latest<K: std::hash::Hash + Eq>(
    latest: &mut HashMap<K, CheckResult>,
    key: K,
    result: CheckResult,
) {
    match latest.get(&key) {
        Some(seen) if seen.executed_at >= result.executed_at => {}
        _ => {
            latest.insert(key, result);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use chrono::{DateTime, Utc};

    use super::*;
    use crate::model::CheckerOptions;
    use pretty_assertions::assert_eq;

    struct Fixture {
        uc: CheckResultUsecase,
        owner: Identifier,
        target: Identifier,
        t0: DateTime<Utc>,
    }

    impl Fixture {
        fn new(retention: usize) -> Self {
            Self {
                uc: CheckResultUsecase::new(
                    Storage::in_memory(),
                    Arc::new(CheckerRegistry::with_builtin()),
                    retention,
                ),
                owner: Identifier::generate(),
                target: Identifier::generate(),
                t0: Utc::now(),
            }
        }

        fn result(&self, checker: &str, status: CheckStatus, at: i64) -> CheckResult {
            CheckResult {
                id: Identifier::generate(),
                checker_name: checker.into(),
                check_type: CheckScope::Domain,
                target_id: self.target.clone(),
                owner_id: self.owner.clone(),
                executed_at: self.t0 + chrono::Duration::seconds(at),
                scheduled_check: true,
                options: CheckerOptions::new(),
                status,
                status_line: String::new(),
                report: serde_json::Value::Null,
                duration: Duration::from_millis(1),
                error: None,
            }
        }

        async fn add(&self, checker: &str, status: CheckStatus, at: i64) {
            self.uc.create(&self.result(checker, status, at)).await.unwrap();
        }

        async fn worst(&self) -> Option<CheckStatus> {
            self.uc
                .worst_status(CheckScope::Domain, &self.target, &self.owner)
                .await
                .unwrap()
        }
    }

    #[tokio::test]
    async fn worst_status_uses_latest_result_per_checker() {
        let f = Fixture::new(10);
        f.add("x", CheckStatus::Warn, 1).await;
        f.add("y", CheckStatus::Critical, 2).await;
        assert_eq!(f.worst().await, Some(CheckStatus::Critical));

        f.add("x", CheckStatus::Ok, 3).await;
        assert_eq!(f.worst().await, Some(CheckStatus::Critical));

        f.add("y", CheckStatus::Info, 4).await;
        assert_eq!(f.worst().await, Some(CheckStatus::Info));
    }

    #[tokio::test]
    async fn worst_status_never_drops_below_a_fresh_result() {
        let f = Fixture::new(10);
        for (i, status) in [CheckStatus::Ok, CheckStatus::Unknown, CheckStatus::Warn, CheckStatus::Info]
            .into_iter()
            .enumerate()
        {
            let at = i64::try_from(i).unwrap();
            f.add(&format!("c{}", i % 2), status, at).await;
            assert!(f.worst().await.unwrap() >= status);
        }
    }

    #[tokio::test]
    async fn other_owners_are_invisible() {
        let f = Fixture::new(10);
        let mut foreign = f.result("x", CheckStatus::Critical, 1);
        foreign.owner_id = Identifier::generate();
        f.uc.create(&foreign).await.unwrap();
        f.add("x", CheckStatus::Ok, 0).await;

        assert_eq!(f.worst().await, Some(CheckStatus::Ok));
        let listed = f
            .uc
            .list_all_by_target(CheckScope::Domain, &f.target, &f.owner, 10)
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);
        assert!(f.uc.get(&f.owner, CheckScope::Domain, &f.target, "x", &foreign.id).await.is_err());
    }

    #[tokio::test]
    async fn retention_caps_history_per_checker() {
        let f = Fixture::new(3);
        for at in 0..5 {
            f.add("x", CheckStatus::Ok, at).await;
            let count = f
                .uc
                .list_by_target("x", CheckScope::Domain, &f.target, usize::MAX)
                .await
                .unwrap()
                .len();
            assert!(count <= 3);
        }
        f.add("y", CheckStatus::Ok, 9).await;

        let kept = f
            .uc
            .list_by_target("x", CheckScope::Domain, &f.target, 10)
            .await
            .unwrap();
        let ages: Vec<i64> = kept.iter().map(|r| (r.executed_at - f.t0).num_seconds()).collect();
        assert_eq!(ages, vec![4, 3, 2]);
    }

    #[tokio::test]
    async fn worst_status_by_user_groups_targets() {
        let f = Fixture::new(10);
        f.add("x", CheckStatus::Warn, 1).await;
        f.add("y", CheckStatus::Ok, 1).await;

        let other_target = Identifier::generate();
        let mut r = f.result("x", CheckStatus::Critical, 1);
        r.target_id = other_target.clone();
        f.uc.create(&r).await.unwrap();
        let mut newer = f.result("x", CheckStatus::Ok, 2);
        newer.target_id = other_target.clone();
        f.uc.create(&newer).await.unwrap();

        let map = f
            .uc
            .worst_status_by_user(CheckScope::Domain, &f.owner)
            .await
            .unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map[&f.target.to_string()], CheckStatus::Warn);
        assert_eq!(map[&other_target.to_string()], CheckStatus::Ok);
    }

    #[tokio::test]
    async fn html_reports_come_from_the_checker() {
        let f = Fixture::new(10);
        let mut r = f.result("zone.delegation", CheckStatus::Ok, 0);
        r.report = serde_json::json!({ "name_servers": ["ns1.example.net."] });
        assert!(f.uc.html_report(&r).unwrap().contains("ns1.example.net."));

        let unknown = f.result("nope", CheckStatus::Ok, 0);
        assert_eq!(f.uc.html_report(&unknown).unwrap_err().status(), 404);
    }
}
