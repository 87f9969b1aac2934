//! Checkers: trusted in-process health checks run by the scheduler.

mod delegation;
pub mod options;
mod ttl;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::error::{CoreError, EntityKind};
use crate::model::{CheckScope, CheckStatus, CheckerOptions, Identifier, Record};

pub use delegation::DelegationChecker;
pub use options::{
    AutoFill, OptionDoc, OptionKind, OptionLayers, OptionsDocumentation, merge_options,
    stored_options_no_default,
};
pub use ttl::TtlChecker;

/// Which targets a checker accepts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Availability {
    pub apply_to_domain: bool,
    pub apply_to_service: bool,
    /// Provider types the checker is limited to; empty means any.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub limit_to_providers: Vec<String>,
    /// Service types the checker is limited to; empty means any.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub limit_to_services: Vec<String>,
}

impl Availability {
    pub fn accepts(&self, scope: CheckScope, service_type: Option<&str>) -> bool {
        match scope {
            CheckScope::Domain => self.apply_to_domain,
            CheckScope::Service => {
                self.apply_to_service
                    && (self.limit_to_services.is_empty()
                        || service_type.is_some_and(|t| self.limit_to_services.iter().any(|s| s == t)))
            }
            CheckScope::Instance | CheckScope::User | CheckScope::OnDemand => false,
        }
    }
}

/// Context handed to a running check.
#[derive(Debug, Clone)]
pub struct CheckMeta {
    pub execution_id: Identifier,
    pub scope: CheckScope,
    pub target_id: Identifier,
    pub owner_id: Identifier,
    pub domain_name: Option<String>,
    pub subdomain: Option<String>,
    pub service_type: Option<String>,
    /// Records of the target as currently stored.
    pub records: Vec<Record>,
    /// Fires when the execution times out or the scheduler shuts down.
    pub cancel: CancellationToken,
}

/// What a checker reports back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckOutcome {
    pub status: CheckStatus,
    pub status_line: String,
    #[serde(default)]
    pub report: serde_json::Value,
}

#[async_trait]
pub trait Checker: Send + Sync {
    fn id(&self) -> &'static str;

    fn name(&self) -> &'static str;

    fn availability(&self) -> Availability;

    fn options(&self) -> OptionsDocumentation;

    /// Deadline overriding the scheduler default.
    fn timeout(&self) -> Option<Duration> {
        None
    }

    async fn run_check(
        &self,
        options: &CheckerOptions,
        meta: &CheckMeta,
    ) -> Result<CheckOutcome, CoreError>;

    fn as_html_reporter(&self) -> Option<&dyn HtmlReporter> {
        None
    }
}

/// Checkers that can render their raw report as HTML.
pub trait HtmlReporter: Send + Sync {
    fn html_report(&self, raw: &[u8]) -> Result<String, CoreError>;
}

// ── Registry ────────────────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct CheckerRegistry {
    checkers: BTreeMap<&'static str, Arc<dyn Checker>>,
}

impl std::fmt::Debug for CheckerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.checkers.keys()).finish()
    }
}

impl CheckerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        let _ = registry.register(Arc::new(TtlChecker));
        let _ = registry.register(Arc::new(DelegationChecker));
        registry
    }

    pub fn register(&mut self, checker: Arc<dyn Checker>) -> Result<(), CoreError> {
        let id = checker.id();
        if self.checkers.contains_key(id) {
            return Err(CoreError::Conflict {
                entity: EntityKind::Checker,
                identifier: id.to_owned(),
            });
        }
        self.checkers.insert(id, checker);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Result<Arc<dyn Checker>, CoreError> {
        self.checkers
            .get(id)
            .cloned()
            .ok_or_else(|| CoreError::not_found(EntityKind::Checker, id))
    }

    pub fn list(&self) -> impl Iterator<Item = &Arc<dyn Checker>> {
        self.checkers.values()
    }
}

/// Escape text for inclusion in HTML reports.
pub(crate) fn html_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

/// Read a non-negative integer option.
pub(crate) fn option_u64(options: &CheckerOptions, key: &str, checker: &str) -> Result<u64, CoreError> {
    let value = options.get(key).ok_or_else(|| CoreError::CheckFailed {
        checker: checker.to_owned(),
        message: format!("option {key} is not set"),
    })?;
    value
        .as_u64()
        .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
        .ok_or_else(|| CoreError::CheckFailed {
            checker: checker.to_owned(),
            message: format!("option {key} must be a non-negative integer, got {value}"),
        })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn builtin_checkers_are_registered() {
        let registry = CheckerRegistry::with_builtin();
        let ids: Vec<&str> = registry.list().map(|c| c.id()).collect();
        assert_eq!(ids, vec!["zone.delegation", "zone.ttl"]);
        assert!(registry.get("zone.ttl").is_ok());
        assert_eq!(registry.get("nope").err().map(|e| e.status()), Some(404));
    }

    #[test]
    fn duplicate_ids_conflict() {
        let mut registry = CheckerRegistry::with_builtin();
        assert!(registry.register(Arc::new(TtlChecker)).is_err());
    }

    #[test]
    fn availability_filters_scope_and_service_type() {
        let a = Availability {
            apply_to_domain: false,
            apply_to_service: true,
            limit_to_services: vec!["svcs.MXs".into()],
            ..Availability::default()
        };
        assert!(!a.accepts(CheckScope::Domain, None));
        assert!(a.accepts(CheckScope::Service, Some("svcs.MXs")));
        assert!(!a.accepts(CheckScope::Service, Some("svcs.TXT")));
    }

    #[test]
    fn escapes_markup() {
        assert_eq!(html_escape("<a href=\"x\">&"), "&lt;a href=&quot;x&quot;&gt;&amp;");
    }

    #[test]
    fn integer_options_accept_strings() {
        let mut opts = CheckerOptions::new();
        opts.insert("n".into(), serde_json::json!("42"));
        assert_eq!(option_u64(&opts, "n", "t").unwrap(), 42);
        opts.insert("n".into(), serde_json::json!(-1));
        assert!(option_u64(&opts, "n", "t").is_err());
    }
}
