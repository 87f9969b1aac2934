// ── Domain model ──
//
// Plain data types shared by the correction engine and the check
// scheduler. Nothing here talks to providers or storage.

pub mod check;
pub mod domain;
pub mod identifier;
pub(crate) mod presentation;
pub mod record;
pub mod service;
pub mod zone;

pub use check::{
    CheckExecution, CheckResult, CheckScope, CheckStatus, CheckerOptions, CheckerSchedule,
    ExecutionStatus,
};
pub use domain::{Domain, DomainLog, LogLevel, validate_domain_name};
pub use identifier::{HexBlob, Identifier};
pub use record::{
    Rdata, Record, RecordClass, RecordType, Soa, fqdn, join_name, join_txt_segments, names_equal,
    relative_name, txt_segments,
};
pub use service::{ORIGIN_SERVICE, Service};
pub use zone::{Zone, normalize_subdomain};
