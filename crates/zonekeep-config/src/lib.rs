//! Configuration for zonekeep.
//!
//! TOML file plus `ZONEKEEP_*` environment overrides, and translation to
//! the runtime types in `zonekeep_core::config`. The core crate never
//! reads configuration itself.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use zonekeep_core::{CorrectionOptions, SchedulerConfig};

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        field: field.into(),
        reason: reason.into(),
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub scheduler: SchedulerSection,

    #[serde(default)]
    pub corrections: CorrectionSection,

    #[serde(default)]
    pub log: LogSection,
}

/// `[scheduler]`. Durations are human strings such as `"90s"` or `"5m"`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct SchedulerSection {
    pub enabled: bool,
    pub worker_count: usize,
    pub queue_depth: usize,
    pub retention_per_checker: usize,
    pub default_check_timeout: String,
    pub shutdown_grace: String,
    pub min_interval: String,
    pub idle_poll: String,
    pub next_schedules_preview: usize,
}

impl Default for SchedulerSection {
    fn default() -> Self {
        let core = SchedulerConfig::default();
        Self {
            enabled: core.enabled,
            worker_count: core.worker_count,
            queue_depth: core.queue_depth,
            retention_per_checker: core.retention_per_checker,
            default_check_timeout: humantime::format_duration(core.default_check_timeout)
                .to_string(),
            shutdown_grace: humantime::format_duration(core.shutdown_grace).to_string(),
            min_interval: humantime::format_duration(core.min_interval).to_string(),
            idle_poll: humantime::format_duration(core.idle_poll).to_string(),
            next_schedules_preview: core.next_schedules_preview,
        }
    }
}

/// `[corrections]`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct CorrectionSection {
    pub skip_dnssec: bool,
    pub refresh_soa_serial: bool,
}

impl Default for CorrectionSection {
    fn default() -> Self {
        let core = CorrectionOptions::default();
        Self {
            skip_dnssec: core.skip_dnssec,
            refresh_soa_serial: core.refresh_soa_serial,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// `[log]`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct LogSection {
    /// `EnvFilter` directive used when `RUST_LOG` and `-v` are absent.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LogSection {
    fn default() -> Self {
        Self {
            level: "warn".into(),
            format: LogFormat::Text,
        }
    }
}

// ── Translation ─────────────────────────────────────────────────────

fn parse_duration(field: &str, value: &str) -> Result<Duration, ConfigError> {
    humantime::parse_duration(value.trim()).map_err(|e| invalid(field, format!("{value:?}: {e}")))
}

fn at_least_one(field: &str, value: usize) -> Result<usize, ConfigError> {
    if value == 0 {
        return Err(invalid(field, "must be at least 1"));
    }
    Ok(value)
}

impl Config {
    /// Validated scheduler settings.
    pub fn to_scheduler_config(&self) -> Result<SchedulerConfig, ConfigError> {
        let s = &self.scheduler;
        let default_check_timeout =
            parse_duration("scheduler.default_check_timeout", &s.default_check_timeout)?;
        if default_check_timeout.is_zero() {
            return Err(invalid("scheduler.default_check_timeout", "must be non-zero"));
        }
        let idle_poll = parse_duration("scheduler.idle_poll", &s.idle_poll)?;
        if idle_poll.is_zero() {
            return Err(invalid("scheduler.idle_poll", "must be non-zero"));
        }

        Ok(SchedulerConfig {
            enabled: s.enabled,
            worker_count: at_least_one("scheduler.worker_count", s.worker_count)?,
            queue_depth: at_least_one("scheduler.queue_depth", s.queue_depth)?,
            retention_per_checker: at_least_one(
                "scheduler.retention_per_checker",
                s.retention_per_checker,
            )?,
            default_check_timeout,
            shutdown_grace: parse_duration("scheduler.shutdown_grace", &s.shutdown_grace)?,
            min_interval: parse_duration("scheduler.min_interval", &s.min_interval)?,
            idle_poll,
            next_schedules_preview: s.next_schedules_preview,
        })
    }

    pub fn to_correction_options(&self) -> CorrectionOptions {
        CorrectionOptions {
            skip_dnssec: self.corrections.skip_dnssec,
            refresh_soa_serial: self.corrections.refresh_soa_serial,
        }
    }

    /// Check every section without building anything.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.to_scheduler_config()?;
        if self.log.level.trim().is_empty() {
            return Err(invalid("log.level", "must not be empty"));
        }
        Ok(())
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("dev", "zonekeep", "zonekeep").map_or_else(
        || dirs_fallback().join("config.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("zonekeep");
    p
}

// ── Config loading ──────────────────────────────────────────────────

fn figment(path: &Path) -> Figment {
    Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("ZONEKEEP_").split("__"))
}

/// Load from an explicit file (or the default path) plus the environment.
/// A missing file is not an error.
pub fn load_config_from(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.map_or_else(config_path, Path::to_path_buf);
    let config: Config = figment(&path).extract()?;
    config.validate()?;
    Ok(config)
}

pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(None)
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write it, creating the parent directory.
pub fn save_config(cfg: &Config, path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    let path = path.map_or_else(config_path, Path::to_path_buf);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(&path, toml_str)?;
    Ok(path)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use figment::Jail;
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn defaults_match_core_runtime_defaults() {
        let config = Config::default();
        assert_eq!(config.to_scheduler_config().unwrap(), SchedulerConfig::default());
        assert_eq!(config.to_correction_options(), CorrectionOptions::default());
        assert_eq!(config.log.format, LogFormat::Text);
    }

    #[test]
    fn file_then_environment_layering() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "zonekeep.toml",
                r#"
                [scheduler]
                worker_count = 4
                default_check_timeout = "90s"

                [corrections]
                skip_dnssec = false

                [log]
                format = "json"
                "#,
            )?;
            jail.set_env("ZONEKEEP_SCHEDULER__QUEUE_DEPTH", "16");

            let config = load_config_from(Some(Path::new("zonekeep.toml"))).unwrap();
            let scheduler = config.to_scheduler_config().unwrap();
            assert_eq!(scheduler.worker_count, 4);
            assert_eq!(scheduler.queue_depth, 16);
            assert_eq!(scheduler.default_check_timeout, Duration::from_secs(90));
            assert_eq!(scheduler.min_interval, Duration::from_secs(300));
            assert!(!config.to_correction_options().skip_dnssec);
            assert_eq!(config.log.format, LogFormat::Json);
            Ok(())
        });
    }

    #[test]
    fn zero_workers_are_rejected() {
        Jail::expect_with(|jail| {
            jail.set_env("ZONEKEEP_SCHEDULER__WORKER_COUNT", "0");
            let err = load_config_from(Some(Path::new("missing.toml"))).unwrap_err();
            assert!(matches!(
                err,
                ConfigError::Validation { ref field, .. } if field == "scheduler.worker_count"
            ));
            Ok(())
        });
    }

    #[test]
    fn unparsable_durations_name_their_field() {
        let mut config = Config::default();
        config.scheduler.shutdown_grace = "soon".into();
        let err = config.to_scheduler_config().unwrap_err();
        assert!(err.to_string().contains("scheduler.shutdown_grace"));
    }

    #[test]
    fn saved_config_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = Config::default();
        config.scheduler.retention_per_checker = 3;
        config.log.level = "debug".into();

        let written = save_config(&config, Some(&path)).unwrap();
        assert_eq!(written, path);
        let text = std::fs::read_to_string(&path).unwrap();
        let loaded: Config = toml::from_str(&text).unwrap();
        assert_eq!(loaded, config);
    }
}
