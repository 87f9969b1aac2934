//! Zone model, correction engine, and check scheduler for zonekeep.
//!
//! - **Service model** ([`service`]) groups raw DNS records into typed
//!   services. [`analyze_zone`] turns a provider's flat record set into a
//!   [`Zone`]; [`Zone::records`] flattens it back.
//!
//! - **Corrections** ([`correction`]) diff the records a zone wants against
//!   what the [`Provider`] serves and apply the result in order, bumping
//!   the SOA serial once at the end.
//!
//! - **[`Scheduler`]** runs checkers against domains and services, either
//!   on a schedule or on demand, with a bounded queue, a fixed worker
//!   pool, per-run timeouts, and at most one run in flight per schedule.
//!
//! - **[`Storage`]** persists everything as JSON over a [`KvBackend`];
//!   [`Usecases`] bundle the business operations on top of it.

pub mod checker;
pub mod config;
pub mod correction;
pub mod error;
pub mod model;
pub mod provider;
pub mod scheduler;
pub mod service;
pub mod store;
pub mod usecase;
pub mod zonefile;

// ── Primary re-exports ──────────────────────────────────────────────
pub use checker::{Checker, CheckerRegistry};
pub use config::{CorrectionOptions, SchedulerConfig};
pub use correction::{ApplyReport, Correction, CorrectionKind, apply_corrections, plan_corrections};
pub use error::{CoreError, EntityKind, ErrorKind};
pub use provider::{GuardedProvider, Provider, ProviderConfig, ProviderRegistry};
pub use scheduler::{ExecutionEvent, Scheduler, SchedulerStatus};
pub use service::{ServiceRegistry, analyze_zone};
pub use store::{KvBackend, MemoryBackend, Storage};
pub use usecase::{Registries, Usecases};

// Model types at the crate root for ergonomics.
pub use model::{
    CheckExecution, CheckResult, CheckScope, CheckStatus, CheckerOptions, CheckerSchedule, Domain,
    DomainLog, ExecutionStatus, Identifier, Record, RecordType, Service, Zone,
};
