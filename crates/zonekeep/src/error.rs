//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and stable exit codes.

use miette::Diagnostic;
use thiserror::Error;

use zonekeep_config::ConfigError;
use zonekeep_core::{CoreError, ErrorKind};

/// Process exit codes.
pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const VALIDATION: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const FORBIDDEN: i32 = 5;
    pub const CONFLICT: i32 = 6;
    pub const UNAVAILABLE: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Input ────────────────────────────────────────────────────────
    #[error("Cannot read zone file {path}")]
    #[diagnostic(code(zonekeep::zone_file), help("Check the path and permissions."))]
    ZoneFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(zonekeep::validation))]
    Validation { field: String, reason: String },

    // ── Resources ────────────────────────────────────────────────────
    #[error("{message}")]
    #[diagnostic(code(zonekeep::not_found), help("{hint}"))]
    NotFound { message: String, hint: String },

    #[error("{message}")]
    #[diagnostic(code(zonekeep::forbidden))]
    Forbidden { message: String },

    #[error("{message}")]
    #[diagnostic(code(zonekeep::conflict))]
    Conflict { message: String },

    // ── Capacity / time ──────────────────────────────────────────────
    #[error("{message}")]
    #[diagnostic(
        code(zonekeep::unavailable),
        help("The check queue is full. Retry shortly or raise scheduler.queue_depth.")
    )]
    Unavailable { message: String },

    #[error("Timed out after {seconds}s")]
    #[diagnostic(
        code(zonekeep::timeout),
        help("Raise scheduler.default_check_timeout or pass --wait.")
    )]
    Timeout { seconds: u64 },

    // ── Checks ───────────────────────────────────────────────────────
    #[error("Checker {checker} failed: {error}")]
    #[diagnostic(code(zonekeep::check_failed), help("Run with -v for the worker log."))]
    CheckFailed { checker: String, error: String },

    // ── Core ─────────────────────────────────────────────────────────
    #[error("{message}")]
    #[diagnostic(code(zonekeep::core))]
    Core {
        message: String,
        #[help]
        link: Option<String>,
        #[source]
        source: CoreError,
    },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Configuration file already exists")]
    #[diagnostic(
        code(zonekeep::config_exists),
        help("Use --force to overwrite {path}")
    )]
    ConfigExists { path: String },

    #[error(transparent)]
    #[diagnostic(code(zonekeep::config))]
    Config(#[from] ConfigError),

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON value: {0}")]
    #[diagnostic(code(zonekeep::json))]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Validation { .. } | Self::Config(ConfigError::Validation { .. }) => {
                exit_code::VALIDATION
            }
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Forbidden { .. } => exit_code::FORBIDDEN,
            Self::Conflict { .. } | Self::ConfigExists { .. } => exit_code::CONFLICT,
            Self::Unavailable { .. } => exit_code::UNAVAILABLE,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        if let CoreError::Timeout { timeout_secs } = err {
            return Self::Timeout {
                seconds: timeout_secs,
            };
        }
        let message = err.user_message();
        match err.kind() {
            ErrorKind::Validation => Self::Validation {
                field: "input".into(),
                reason: message,
            },
            ErrorKind::NotFound => Self::NotFound {
                message,
                hint: "Run: zonekeep checkers list".into(),
            },
            ErrorKind::Forbidden => Self::Forbidden { message },
            ErrorKind::Conflict => Self::Conflict { message },
            ErrorKind::ResourceExhausted => Self::Unavailable { message },
            ErrorKind::Internal | ErrorKind::Custom(_) => Self::Core {
                message,
                link: err.help_link().map(str::to_owned),
                source: err,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_errors_map_to_exit_codes() {
        let cases = [
            (CoreError::validation("bad"), exit_code::VALIDATION),
            (
                CoreError::not_found(zonekeep_core::EntityKind::Checker, "nope"),
                exit_code::NOT_FOUND,
            ),
            (CoreError::QueueFull { capacity: 1 }, exit_code::UNAVAILABLE),
            (CoreError::Timeout { timeout_secs: 5 }, exit_code::TIMEOUT),
            (CoreError::Internal("boom".into()), exit_code::GENERAL),
        ];
        for (err, code) in cases {
            assert_eq!(CliError::from(err).exit_code(), code);
        }
    }
}
