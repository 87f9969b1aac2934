// ── Runtime configuration ──
//
// These types describe how the scheduler and correction engine behave.
// They never touch disk: the config crate or the CLI builds them and
// hands them in.

use std::time::Duration;

/// Check scheduler tuning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Master switch; a disabled scheduler starts no tasks.
    pub enabled: bool,
    /// Worker tasks draining the execution queue (at least 1).
    pub worker_count: usize,
    /// Bounded queue capacity.
    pub queue_depth: usize,
    /// Results kept per (checker, target).
    pub retention_per_checker: usize,
    /// Deadline for one execution unless the checker sets its own.
    pub default_check_timeout: Duration,
    /// Maximum wait for workers on close.
    pub shutdown_grace: Duration,
    /// Shortest interval a schedule may use.
    pub min_interval: Duration,
    /// Upper bound on the dispatcher's sleep when nothing is due.
    pub idle_poll: Duration,
    /// Number of upcoming schedules reported by `status()`.
    pub next_schedules_preview: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            worker_count: 2,
            queue_depth: 64,
            retention_per_checker: 10,
            default_check_timeout: Duration::from_secs(60),
            shutdown_grace: Duration::from_secs(30),
            min_interval: Duration::from_secs(5 * 60),
            idle_poll: Duration::from_secs(60),
            next_schedules_preview: 5,
        }
    }
}

/// Correction engine switches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrectionOptions {
    /// Leave DNSSEC-maintenance records out of the diff.
    pub skip_dnssec: bool,
    /// Ask the provider to bump the SOA serial on update.
    pub refresh_soa_serial: bool,
}

impl Default for CorrectionOptions {
    fn default() -> Self {
        Self {
            skip_dnssec: true,
            refresh_soa_serial: true,
        }
    }
}
