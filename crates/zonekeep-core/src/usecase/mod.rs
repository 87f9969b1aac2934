// ── Usecases ──
//
// Business operations over `Storage`. Each usecase is cheaply
// cloneable and receives the registries it needs explicitly.

mod domain;
mod execution;
mod options;
mod provider;
mod result;
mod schedule;
mod target;

use std::sync::Arc;

use tokio::sync::Notify;

use crate::checker::CheckerRegistry;
use crate::config::{CorrectionOptions, SchedulerConfig};
use crate::error::{CoreError, EntityKind};
use crate::model::Identifier;
use crate::provider::ProviderRegistry;
use crate::service::ServiceRegistry;
use crate::store::Storage;

pub use domain::DomainUsecase;
pub use execution::ExecutionUsecase;
pub use options::CheckerOptionsUsecase;
pub use provider::ProviderUsecase;
pub use result::CheckResultUsecase;
pub use schedule::{NewSchedule, ScheduleUsecase};
pub use target::{ResolvedTarget, TargetResolver};

/// Kind registries, populated once at startup.
#[derive(Debug, Clone)]
pub struct Registries {
    pub services: Arc<ServiceRegistry>,
    pub providers: Arc<ProviderRegistry>,
    pub checkers: Arc<CheckerRegistry>,
}

impl Registries {
    pub fn builtin() -> Self {
        Self {
            services: Arc::new(ServiceRegistry::with_builtin()),
            providers: Arc::new(ProviderRegistry::with_builtin()),
            checkers: Arc::new(CheckerRegistry::with_builtin()),
        }
    }
}

/// Every usecase wired to one storage.
#[derive(Debug, Clone)]
pub struct Usecases {
    pub storage: Storage,
    pub registries: Registries,
    pub domains: DomainUsecase,
    pub providers: ProviderUsecase,
    pub schedules: ScheduleUsecase,
    pub executions: ExecutionUsecase,
    pub results: CheckResultUsecase,
    pub options: CheckerOptionsUsecase,
    pub targets: TargetResolver,
}

impl Usecases {
    pub fn new(
        storage: Storage,
        registries: Registries,
        scheduler: &SchedulerConfig,
        corrections: CorrectionOptions,
    ) -> Self {
        let wake = Arc::new(Notify::new());
        let schedules = ScheduleUsecase::new(
            storage.clone(),
            Arc::clone(&registries.checkers),
            scheduler.min_interval,
            wake,
        );
        let results = CheckResultUsecase::new(
            storage.clone(),
            Arc::clone(&registries.checkers),
            scheduler.retention_per_checker,
        );
        let providers = ProviderUsecase::new(storage.clone(), Arc::clone(&registries.providers));
        let domains = DomainUsecase::new(
            storage.clone(),
            registries.clone(),
            corrections,
            schedules.clone(),
            providers.clone(),
        );
        Self {
            providers,
            executions: ExecutionUsecase::new(storage.clone()),
            options: CheckerOptionsUsecase::new(storage.clone(), Arc::clone(&registries.checkers)),
            targets: TargetResolver::new(storage.clone(), Arc::clone(&registries.services)),
            storage,
            registries,
            domains,
            schedules,
            results,
        }
    }
}

/// Reject access to an entity owned by someone else.
pub(crate) fn ensure_owner(
    entity: EntityKind,
    id: &Identifier,
    owner: &Identifier,
    caller: &Identifier,
) -> Result<(), CoreError> {
    if owner == caller {
        Ok(())
    } else {
        Err(CoreError::forbidden(entity, id))
    }
}
