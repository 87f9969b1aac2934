// ── Core error types ──
//
// Every failure that leaves zonekeep-core is a `CoreError`. Provider and
// checker failures are wrapped at their call site; adapter types never
// cross the crate boundary. Each variant classifies into an `ErrorKind`
// that carries the HTTP status hint used by front ends.

use std::any::Any;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use thiserror::Error;

/// Entity families that can be reported as missing or forbidden.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
pub enum EntityKind {
    AuthUser,
    User,
    Session,
    Domain,
    DomainLog,
    Provider,
    Zone,
    Service,
    Checker,
    CheckExecution,
    CheckResult,
    CheckSchedule,
}

/// Classification of a [`CoreError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Input rejected by policy.
    Validation,
    /// Caller does not own the target.
    Forbidden,
    /// Entity absent.
    NotFound,
    /// Uniqueness violation.
    Conflict,
    /// Transient capacity problem; the caller may retry.
    ResourceExhausted,
    /// Unexpected failure, including captured panics.
    Internal,
    /// Caller-supplied status.
    Custom(u16),
}

impl ErrorKind {
    /// HTTP status hint for the API layer.
    pub fn status(self) -> u16 {
        match self {
            Self::Validation => 400,
            Self::Forbidden => 403,
            Self::NotFound => 404,
            Self::Conflict => 409,
            Self::ResourceExhausted => 503,
            Self::Internal => 500,
            Self::Custom(status) => status,
        }
    }
}

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Input errors ─────────────────────────────────────────────────
    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    #[error("Access denied to {entity} {identifier}")]
    Forbidden {
        entity: EntityKind,
        identifier: String,
    },

    #[error("{entity} not found: {identifier}")]
    NotFound {
        entity: EntityKind,
        identifier: String,
    },

    #[error("{entity} already exists: {identifier}")]
    Conflict {
        entity: EntityKind,
        identifier: String,
    },

    // ── Capacity ─────────────────────────────────────────────────────
    #[error("Check queue is full ({capacity} executions waiting)")]
    QueueFull { capacity: usize },

    // ── Provider errors ──────────────────────────────────────────────
    #[error("Invalid settings for provider {provider_type}: {message}")]
    ProviderConfig {
        provider_type: String,
        message: String,
    },

    #[error("Provider authentication failed: {message}")]
    ProviderAuth { message: String },

    #[error("Provider call {call} failed: {message}")]
    Provider { call: &'static str, message: String },

    #[error("Operation not supported: {operation}")]
    Unsupported { operation: String },

    #[error("Applied {applied} of {total} corrections before failing: {source}")]
    PartialApply {
        applied: usize,
        total: usize,
        #[source]
        source: Box<CoreError>,
    },

    // ── Check errors ─────────────────────────────────────────────────
    #[error("Checker {checker} failed: {message}")]
    CheckFailed { checker: String, message: String },

    #[error("Operation timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("{call} panicked: {message}")]
    Panic { call: String, message: String },

    #[error("Storage error: {message}")]
    Storage { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{message}")]
    Custom {
        status: u16,
        message: String,
        link: Option<String>,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationFailed {
            message: message.into(),
        }
    }

    pub fn not_found(entity: EntityKind, identifier: impl ToString) -> Self {
        Self::NotFound {
            entity,
            identifier: identifier.to_string(),
        }
    }

    pub fn forbidden(entity: EntityKind, identifier: impl ToString) -> Self {
        Self::Forbidden {
            entity,
            identifier: identifier.to_string(),
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ValidationFailed { .. } | Self::ProviderConfig { .. } => ErrorKind::Validation,
            Self::Forbidden { .. } | Self::ProviderAuth { .. } => ErrorKind::Forbidden,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Conflict { .. } => ErrorKind::Conflict,
            Self::QueueFull { .. } => ErrorKind::ResourceExhausted,
            Self::Unsupported { .. } => ErrorKind::Custom(501),
            Self::Timeout { .. } => ErrorKind::Custom(504),
            Self::PartialApply { source, .. } => source.kind(),
            Self::Custom { status, .. } => ErrorKind::Custom(*status),
            Self::Provider { .. }
            | Self::CheckFailed { .. }
            | Self::Panic { .. }
            | Self::Storage { .. }
            | Self::Serialization(_)
            | Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// HTTP status hint.
    pub fn status(&self) -> u16 {
        self.kind().status()
    }

    /// Whether retrying the same call later may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self.kind(), ErrorKind::ResourceExhausted)
    }

    /// Message suitable for end users. Internal details stay in logs.
    pub fn user_message(&self) -> String {
        match self {
            Self::Panic { call, .. } => {
                format!("An unexpected error occurred while running {call}")
            }
            Self::Storage { .. } | Self::Serialization(_) | Self::Internal(_) => {
                "An internal error occurred".into()
            }
            Self::QueueFull { .. } => {
                "Too many checks are waiting to run; try again in a moment".into()
            }
            other => other.to_string(),
        }
    }

    /// Optional documentation link supplied with the error.
    pub fn help_link(&self) -> Option<&str> {
        match self {
            Self::Custom { link, .. } => link.as_deref(),
            Self::PartialApply { source, .. } => source.help_link(),
            _ => None,
        }
    }
}

/// Text of a captured panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_map_to_status_hints() {
        assert_eq!(CoreError::validation("bad").status(), 400);
        assert_eq!(
            CoreError::forbidden(EntityKind::Domain, "abc").status(),
            403
        );
        assert_eq!(CoreError::not_found(EntityKind::Zone, "abc").status(), 404);
        assert_eq!(CoreError::QueueFull { capacity: 4 }.status(), 503);
        assert_eq!(CoreError::Internal("boom".into()).status(), 500);
        assert_eq!(
            CoreError::Custom {
                status: 418,
                message: "teapot".into(),
                link: None
            }
            .status(),
            418
        );
    }

    #[test]
    fn partial_apply_inherits_kind_of_cause() {
        let err = CoreError::PartialApply {
            applied: 2,
            total: 5,
            source: Box::new(CoreError::ProviderAuth {
                message: "token revoked".into(),
            }),
        };
        assert_eq!(err.kind(), ErrorKind::Forbidden);
        assert!(err.to_string().contains("2 of 5"));
    }

    #[test]
    fn queue_full_is_transient() {
        assert!(CoreError::QueueFull { capacity: 1 }.is_transient());
        assert!(!CoreError::validation("x").is_transient());
    }

    #[test]
    fn internal_details_are_hidden_from_users() {
        let err = CoreError::Panic {
            call: "checker zone.ttl".into(),
            message: "index out of bounds".into(),
        };
        assert!(!err.user_message().contains("index out of bounds"));
        assert_eq!(err.kind(), ErrorKind::Internal);
    }

    #[test]
    fn not_found_display_names_entity() {
        let err = CoreError::not_found(EntityKind::CheckSchedule, "xyz");
        assert_eq!(err.to_string(), "CheckSchedule not found: xyz");
    }
}
