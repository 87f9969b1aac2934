// ── Checker scheduling and results ──

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use strum::{AsRefStr, Display, EnumString};

use super::identifier::Identifier;
use crate::error::CoreError;

/// Option values keyed by option id.
pub type CheckerOptions = BTreeMap<String, serde_json::Value>;

// ── CheckScope ──────────────────────────────────────────────────────

/// What a check or option layer applies to.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum CheckScope {
    Instance,
    User,
    Domain,
    Service,
    OnDemand,
}

// ── ExecutionStatus ─────────────────────────────────────────────────

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ExecutionStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl ExecutionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Forward-only transitions; terminal states never move.
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Running | Self::Failed)
                | (Self::Running, Self::Completed | Self::Failed)
        )
    }
}

// ── CheckStatus ─────────────────────────────────────────────────────

/// Outcome of a check. Serialized as its numeric code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum CheckStatus {
    #[default]
    Unknown = 0,
    Critical = 1,
    Warn = 2,
    Info = 3,
    Ok = 4,
}

impl CheckStatus {
    #[allow(clippy::as_conversions)]
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Unknown),
            1 => Some(Self::Critical),
            2 => Some(Self::Warn),
            3 => Some(Self::Info),
            4 => Some(Self::Ok),
            _ => None,
        }
    }

    fn severity(self) -> u8 {
        match self {
            Self::Unknown => 0,
            Self::Ok => 1,
            Self::Info => 2,
            Self::Warn => 3,
            Self::Critical => 4,
        }
    }
}

/// Ordered by severity: critical > warn > info > ok > unknown.
impl Ord for CheckStatus {
    fn cmp(&self, other: &Self) -> Ordering {
        self.severity().cmp(&other.severity())
    }
}

impl PartialOrd for CheckStatus {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Serialize for CheckStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.code())
    }
}

impl<'de> Deserialize<'de> for CheckStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = u8::deserialize(deserializer)?;
        Self::from_code(code)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown check status {code}")))
    }
}

// ── Duration encodings ──────────────────────────────────────────────

pub(crate) mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_secs)
    }
}

pub(crate) mod duration_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

// ── CheckerSchedule ─────────────────────────────────────────────────

/// A recurring check of one target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckerSchedule {
    pub id: Identifier,
    pub checker_name: String,
    pub owner_id: Identifier,
    pub target_type: CheckScope,
    pub target_id: Identifier,
    #[serde(with = "duration_secs")]
    pub interval: Duration,
    pub enabled: bool,
    #[serde(default)]
    pub last_run: Option<DateTime<Utc>>,
    pub next_run: DateTime<Utc>,
    #[serde(default)]
    pub options: CheckerOptions,
}

impl CheckerSchedule {
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.enabled && self.next_run <= now
    }

    /// Record a run at `now` and move the next fire time one interval on.
    pub fn advance(&mut self, now: DateTime<Utc>) {
        self.last_run = Some(now);
        let step = chrono::Duration::from_std(self.interval)
            .unwrap_or_else(|_| chrono::Duration::days(365 * 100));
        self.next_run = now + step;
    }
}

// ── CheckExecution ──────────────────────────────────────────────────

/// One run of a checker, scheduled or on demand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckExecution {
    pub id: Identifier,
    #[serde(default)]
    pub schedule_id: Option<Identifier>,
    pub checker_name: String,
    pub owner_id: Identifier,
    pub target_type: CheckScope,
    pub target_id: Identifier,
    pub status: ExecutionStatus,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub result_id: Option<Identifier>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub options: CheckerOptions,
}

impl CheckExecution {
    /// A pending execution; `schedule` is `None` for on-demand runs.
    pub fn pending(
        schedule: Option<&CheckerSchedule>,
        checker_name: &str,
        owner_id: Identifier,
        target_type: CheckScope,
        target_id: Identifier,
        options: CheckerOptions,
    ) -> Self {
        Self {
            id: Identifier::generate(),
            schedule_id: schedule.map(|s| s.id.clone()),
            checker_name: checker_name.to_owned(),
            owner_id,
            target_type,
            target_id,
            status: ExecutionStatus::Pending,
            started_at: Utc::now(),
            completed_at: None,
            result_id: None,
            error: None,
            options,
        }
    }

    pub fn is_scheduled(&self) -> bool {
        self.schedule_id.is_some()
    }

    /// Move to `next`, stamping completion time on terminal states.
    pub fn transition(&mut self, next: ExecutionStatus) -> Result<(), CoreError> {
        if !self.status.can_transition_to(next) {
            return Err(CoreError::validation(format!(
                "execution {} cannot move from {} to {next}",
                self.id, self.status
            )));
        }
        self.status = next;
        if next.is_terminal() {
            self.completed_at = Some(Utc::now());
        }
        Ok(())
    }
}

// ── CheckResult ─────────────────────────────────────────────────────

/// Persisted outcome of a completed execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckResult {
    pub id: Identifier,
    pub checker_name: String,
    pub check_type: CheckScope,
    pub target_id: Identifier,
    pub owner_id: Identifier,
    pub executed_at: DateTime<Utc>,
    pub scheduled_check: bool,
    #[serde(default)]
    pub options: CheckerOptions,
    pub status: CheckStatus,
    #[serde(default)]
    pub status_line: String,
    #[serde(default)]
    pub report: serde_json::Value,
    #[serde(with = "duration_millis")]
    pub duration: Duration,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn scopes_use_stable_strings() {
        assert_eq!(serde_json::to_string(&CheckScope::OnDemand).unwrap(), "\"ondemand\"");
        assert_eq!("service".parse::<CheckScope>().unwrap(), CheckScope::Service);
        assert_eq!(ExecutionStatus::Completed.to_string(), "completed");
    }

    #[test]
    fn status_serializes_as_number() {
        assert_eq!(serde_json::to_string(&CheckStatus::Warn).unwrap(), "2");
        let back: CheckStatus = serde_json::from_str("4").unwrap();
        assert_eq!(back, CheckStatus::Ok);
        assert!(serde_json::from_str::<CheckStatus>("9").is_err());
    }

    #[test]
    fn status_orders_by_severity() {
        let mut all = vec![
            CheckStatus::Ok,
            CheckStatus::Critical,
            CheckStatus::Unknown,
            CheckStatus::Warn,
            CheckStatus::Info,
        ];
        all.sort();
        assert_eq!(
            all,
            vec![
                CheckStatus::Unknown,
                CheckStatus::Ok,
                CheckStatus::Info,
                CheckStatus::Warn,
                CheckStatus::Critical,
            ]
        );
    }

    #[test]
    fn execution_state_machine_is_forward_only() {
        use ExecutionStatus::{Completed, Failed, Pending, Running};
        assert!(Pending.can_transition_to(Running));
        assert!(Pending.can_transition_to(Failed));
        assert!(Running.can_transition_to(Completed));
        assert!(!Pending.can_transition_to(Completed));
        assert!(!Completed.can_transition_to(Failed));
        assert!(!Failed.can_transition_to(Running));
        assert!(!Running.can_transition_to(Pending));
    }

    #[test]
    fn transition_stamps_completion() {
        let mut exec = CheckExecution::pending(
            None,
            "zone.ttl",
            Identifier::generate(),
            CheckScope::Domain,
            Identifier::generate(),
            CheckerOptions::new(),
        );
        assert!(!exec.is_scheduled());
        exec.transition(ExecutionStatus::Running).unwrap();
        assert!(exec.completed_at.is_none());
        exec.transition(ExecutionStatus::Completed).unwrap();
        assert!(exec.completed_at.is_some());
        assert!(exec.transition(ExecutionStatus::Failed).is_err());
    }

    #[test]
    fn schedule_advances_by_interval() {
        let now = Utc::now();
        let mut schedule = CheckerSchedule {
            id: Identifier::generate(),
            checker_name: "zone.ttl".into(),
            owner_id: Identifier::generate(),
            target_type: CheckScope::Domain,
            target_id: Identifier::generate(),
            interval: Duration::from_secs(3600),
            enabled: true,
            last_run: None,
            next_run: now,
            options: CheckerOptions::new(),
        };
        assert!(schedule.is_due(now));
        schedule.advance(now);
        assert_eq!(schedule.last_run, Some(now));
        assert_eq!(schedule.next_run, now + chrono::Duration::hours(1));
        assert!(!schedule.is_due(now));

        let json = serde_json::to_value(&schedule).unwrap();
        assert_eq!(json["interval"], 3600);
    }
}
