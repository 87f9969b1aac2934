// ── Checker schedules ──
//
// Every write that can move a fire time notifies the dispatcher.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::Notify;
use tracing::debug;

use super::ensure_owner;
use crate::checker::CheckerRegistry;
use crate::error::{CoreError, EntityKind};
use crate::model::{CheckScope, CheckerOptions, CheckerSchedule, Identifier};
use crate::store::Storage;

/// Input for creating a schedule.
#[derive(Debug, Clone)]
pub struct NewSchedule {
    pub checker_name: String,
    pub owner_id: Identifier,
    pub target_type: CheckScope,
    pub target_id: Identifier,
    pub interval: Duration,
    pub enabled: bool,
    /// First fire time; `None` means due immediately.
    pub start_at: Option<DateTime<Utc>>,
    pub options: CheckerOptions,
}

impl NewSchedule {
    pub fn new(
        checker_name: &str,
        owner_id: Identifier,
        target_type: CheckScope,
        target_id: Identifier,
        interval: Duration,
    ) -> Self {
        Self {
            checker_name: checker_name.to_owned(),
            owner_id,
            target_type,
            target_id,
            interval,
            enabled: true,
            start_at: None,
            options: CheckerOptions::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScheduleUsecase {
    storage: Storage,
    checkers: Arc<CheckerRegistry>,
    min_interval: Duration,
    wake: Arc<Notify>,
}

impl ScheduleUsecase {
    pub fn new(
        storage: Storage,
        checkers: Arc<CheckerRegistry>,
        min_interval: Duration,
        wake: Arc<Notify>,
    ) -> Self {
        Self {
            storage,
            checkers,
            min_interval,
            wake,
        }
    }

    /// Signal fired after any write that may change the next fire time.
    pub fn wake_signal(&self) -> Arc<Notify> {
        Arc::clone(&self.wake)
    }

    fn validate(
        &self,
        checker_name: &str,
        target_type: CheckScope,
        target_id: &Identifier,
        interval: Duration,
    ) -> Result<(), CoreError> {
        let checker = self.checkers.get(checker_name)?;
        if target_id.is_empty() {
            return Err(CoreError::validation("schedule has no target"));
        }
        // Service type limits are enforced when the target is resolved.
        let availability = checker.availability();
        let applies = match target_type {
            CheckScope::Domain => availability.apply_to_domain,
            CheckScope::Service => availability.apply_to_service,
            CheckScope::Instance | CheckScope::User | CheckScope::OnDemand => {
                return Err(CoreError::validation(format!(
                    "schedules cannot target scope {target_type}"
                )));
            }
        };
        if !applies {
            return Err(CoreError::validation(format!(
                "checker {checker_name} does not apply to {target_type} targets"
            )));
        }
        if interval < self.min_interval {
            return Err(CoreError::validation(format!(
                "interval {}s is below the minimum of {}s",
                interval.as_secs(),
                self.min_interval.as_secs()
            )));
        }
        Ok(())
    }

    pub async fn create(&self, draft: NewSchedule) -> Result<CheckerSchedule, CoreError> {
        self.validate(
            &draft.checker_name,
            draft.target_type,
            &draft.target_id,
            draft.interval,
        )?;
        let schedule = CheckerSchedule {
            id: Identifier::generate(),
            checker_name: draft.checker_name,
            owner_id: draft.owner_id,
            target_type: draft.target_type,
            target_id: draft.target_id,
            interval: draft.interval,
            enabled: draft.enabled,
            last_run: None,
            next_run: draft.start_at.unwrap_or_else(Utc::now),
            options: draft.options,
        };
        self.storage.put_schedule(&schedule).await?;
        debug!(schedule_id = %schedule.id, checker = %schedule.checker_name, "schedule created");
        self.wake.notify_one();
        Ok(schedule)
    }

    pub async fn get(&self, owner: &Identifier, id: &Identifier) -> Result<CheckerSchedule, CoreError> {
        let schedule = self.storage.get_schedule(id).await?;
        ensure_owner(EntityKind::CheckSchedule, id, &schedule.owner_id, owner)?;
        Ok(schedule)
    }

    pub async fn list_by_owner(&self, owner: &Identifier) -> Result<Vec<CheckerSchedule>, CoreError> {
        self.collect(|s| &s.owner_id == owner).await
    }

    pub async fn list_by_target(
        &self,
        scope: CheckScope,
        target: &Identifier,
    ) -> Result<Vec<CheckerSchedule>, CoreError> {
        self.collect(|s| s.target_type == scope && &s.target_id == target)
            .await
    }

    /// Enabled schedules ordered by next fire time.
    pub async fn list_enabled(&self) -> Result<Vec<CheckerSchedule>, CoreError> {
        let mut enabled = self.collect(|s| s.enabled).await?;
        enabled.sort_by(|a, b| a.next_run.cmp(&b.next_run));
        Ok(enabled)
    }

    /// Replace the mutable fields of a schedule; run history is kept.
    pub async fn update(
        &self,
        owner: &Identifier,
        schedule: CheckerSchedule,
    ) -> Result<CheckerSchedule, CoreError> {
        let current = self.get(owner, &schedule.id).await?;
        self.validate(
            &schedule.checker_name,
            schedule.target_type,
            &schedule.target_id,
            schedule.interval,
        )?;
        let updated = CheckerSchedule {
            owner_id: current.owner_id,
            last_run: current.last_run,
            ..schedule
        };
        self.storage.put_schedule(&updated).await?;
        self.wake.notify_one();
        Ok(updated)
    }

    pub async fn set_enabled(
        &self,
        owner: &Identifier,
        id: &Identifier,
        enabled: bool,
    ) -> Result<CheckerSchedule, CoreError> {
        let mut schedule = self.get(owner, id).await?;
        schedule.enabled = enabled;
        self.storage.put_schedule(&schedule).await?;
        self.wake.notify_one();
        Ok(schedule)
    }

    pub async fn delete(&self, owner: &Identifier, id: &Identifier) -> Result<(), CoreError> {
        self.get(owner, id).await?;
        self.storage.delete_schedule(id).await?;
        self.wake.notify_one();
        Ok(())
    }

    /// Remove every schedule on a target, regardless of owner.
    pub async fn delete_target_schedules(
        &self,
        scope: CheckScope,
        target: &Identifier,
    ) -> Result<usize, CoreError> {
        let doomed = self.list_by_target(scope, target).await?;
        for schedule in &doomed {
            self.storage.delete_schedule(&schedule.id).await?;
        }
        if !doomed.is_empty() {
            self.wake.notify_one();
        }
        Ok(doomed.len())
    }

    /// Earliest fire time across enabled schedules.
    pub async fn next_fire(&self) -> Result<Option<DateTime<Utc>>, CoreError> {
        Ok(self.list_enabled().await?.first().map(|s| s.next_run))
    }

    async fn collect<F>(&self, keep: F) -> Result<Vec<CheckerSchedule>, CoreError>
    where
        F: Fn(&CheckerSchedule) -> bool + Send,
    {
        let mut iter = self.storage.list_schedules().await?;
        let mut found = Vec::new();
        while let Some(schedule) = iter.next_valid() {
            if keep(&schedule) {
                found.push(schedule);
            }
        }
        Ok(found)
    }
}
