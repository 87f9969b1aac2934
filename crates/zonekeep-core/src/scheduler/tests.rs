#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use pretty_assertions::assert_eq;
use serde_json::json;
use tokio::sync::Semaphore;

use super::*;
use crate::checker::{
    Availability, CheckMeta, CheckOutcome, Checker, CheckerRegistry, OptionsDocumentation,
};
use crate::config::CorrectionOptions;
use crate::model::{Domain, ExecutionStatus};
use crate::provider::{ProviderConfig, ProviderRegistry};
use crate::service::ServiceRegistry;
use crate::store::Storage;
use crate::usecase::{NewSchedule, Registries};

const LIVE: &str = "\
$TTL 3600
@    IN SOA ns1.example.net. hostmaster.example.com. 1 7200 3600 1209600 300
@    IN NS  ns1.example.net.
@    IN NS  ns2.example.net.
www  IN A   192.0.2.1
";

const WAIT: Duration = Duration::from_secs(5);

// ── Test checkers ───────────────────────────────────────────────────

fn domain_only() -> Availability {
    Availability {
        apply_to_domain: true,
        ..Availability::default()
    }
}

fn ok_outcome() -> CheckOutcome {
    CheckOutcome {
        status: CheckStatus::Ok,
        status_line: "fine".into(),
        report: json!({}),
    }
}

/// Blocks until the test hands out a permit.
struct GateChecker {
    gate: Arc<Semaphore>,
}

#[async_trait]
impl Checker for GateChecker {
    fn id(&self) -> &'static str {
        "test.gate"
    }
    fn name(&self) -> &'static str {
        "Gate"
    }
    fn availability(&self) -> Availability {
        domain_only()
    }
    fn options(&self) -> OptionsDocumentation {
        OptionsDocumentation::builder()
    }
    fn timeout(&self) -> Option<Duration> {
        Some(Duration::from_secs(3600))
    }
    async fn run_check(
        &self,
        _options: &CheckerOptions,
        meta: &CheckMeta,
    ) -> Result<CheckOutcome, CoreError> {
        tokio::select! {
            permit = self.gate.acquire() => permit.unwrap().forget(),
            () = meta.cancel.cancelled() => {}
        }
        Ok(ok_outcome())
    }
}

/// Never finishes on its own.
struct StallChecker;

#[async_trait]
impl Checker for StallChecker {
    fn id(&self) -> &'static str {
        "test.stall"
    }
    fn name(&self) -> &'static str {
        "Stall"
    }
    fn availability(&self) -> Availability {
        domain_only()
    }
    fn options(&self) -> OptionsDocumentation {
        OptionsDocumentation::builder()
    }
    fn timeout(&self) -> Option<Duration> {
        Some(Duration::from_millis(50))
    }
    async fn run_check(
        &self,
        _options: &CheckerOptions,
        _meta: &CheckMeta,
    ) -> Result<CheckOutcome, CoreError> {
        std::future::pending::<()>().await;
        Ok(ok_outcome())
    }
}

struct PanicChecker;

#[async_trait]
impl Checker for PanicChecker {
    fn id(&self) -> &'static str {
        "test.panic"
    }
    fn name(&self) -> &'static str {
        "Panic"
    }
    fn availability(&self) -> Availability {
        domain_only()
    }
    fn options(&self) -> OptionsDocumentation {
        OptionsDocumentation::builder()
    }
    async fn run_check(
        &self,
        _options: &CheckerOptions,
        _meta: &CheckMeta,
    ) -> Result<CheckOutcome, CoreError> {
        panic!("checker exploded");
    }
}

// ── Fixture ─────────────────────────────────────────────────────────

struct Fixture {
    scheduler: Scheduler,
    owner: Identifier,
    domain: Domain,
    gate: Arc<Semaphore>,
}

fn test_config() -> SchedulerConfig {
    SchedulerConfig {
        worker_count: 2,
        queue_depth: 8,
        min_interval: Duration::from_secs(1),
        shutdown_grace: Duration::from_secs(2),
        ..SchedulerConfig::default()
    }
}

async fn fixture(config: SchedulerConfig) -> Fixture {
    let gate = Arc::new(Semaphore::new(0));
    let mut checkers = CheckerRegistry::with_builtin();
    checkers
        .register(Arc::new(GateChecker {
            gate: Arc::clone(&gate),
        }))
        .unwrap();
    checkers.register(Arc::new(StallChecker)).unwrap();
    checkers.register(Arc::new(PanicChecker)).unwrap();
    let registries = Registries {
        services: Arc::new(ServiceRegistry::with_builtin()),
        providers: Arc::new(ProviderRegistry::with_builtin()),
        checkers: Arc::new(checkers),
    };

    let usecases = Usecases::new(
        Storage::in_memory(),
        registries,
        &config,
        CorrectionOptions::default(),
    );
    let owner = Identifier::generate();
    let provider = usecases
        .providers
        .create(ProviderConfig::new(
            owner.clone(),
            "memory",
            json!({ "zones": { "example.com.": LIVE } }),
        ))
        .await
        .unwrap();
    let domain = usecases
        .domains
        .create(&owner, &provider.id, "example.com")
        .await
        .unwrap();
    usecases.domains.import_zone(&owner, &domain.id).await.unwrap();

    Fixture {
        scheduler: Scheduler::new(config, usecases),
        owner,
        domain,
        gate,
    }
}

impl Fixture {
    async fn trigger(&self, checker: &str) -> Result<Identifier, CoreError> {
        self.scheduler
            .trigger_on_demand_check(
                checker,
                CheckScope::Domain,
                &self.domain.id,
                &self.owner,
                CheckerOptions::new(),
            )
            .await
    }

    async fn wait_started(
        events: &mut broadcast::Receiver<ExecutionEvent>,
        id: &Identifier,
    ) {
        tokio::time::timeout(WAIT, async {
            loop {
                if let ExecutionEvent::Started { execution_id } = events.recv().await.unwrap() {
                    if &execution_id == id {
                        break;
                    }
                }
            }
        })
        .await
        .unwrap();
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[tokio::test]
async fn on_demand_check_stores_a_result() {
    let f = fixture(test_config()).await;
    f.scheduler.start().await;
    let triggered_at = Utc::now();

    let id = f.trigger("zone.delegation").await.unwrap();
    let execution = f.scheduler.wait_for_execution(&id, WAIT).await.unwrap();
    assert_eq!(execution.status, ExecutionStatus::Completed);
    assert!(execution.schedule_id.is_none());

    let result_id = execution.result_id.unwrap();
    let result = f
        .scheduler
        .usecases()
        .results
        .get(&f.owner, CheckScope::Domain, &f.domain.id, "zone.delegation", &result_id)
        .await
        .unwrap();
    assert!(!result.scheduled_check);
    assert!(result.executed_at >= triggered_at);
    assert_eq!(result.status, CheckStatus::Ok);
    assert_eq!(result.options.get("domain_name"), Some(&json!("example.com.")));

    f.scheduler.close().await;
}

#[tokio::test]
async fn due_schedules_run_and_advance() {
    let f = fixture(test_config()).await;
    let uc = f.scheduler.usecases().clone();
    let schedule = uc
        .schedules
        .create(NewSchedule::new(
            "zone.ttl",
            f.owner.clone(),
            CheckScope::Domain,
            f.domain.id.clone(),
            Duration::from_secs(600),
        ))
        .await
        .unwrap();

    let mut events = f.scheduler.events();
    f.scheduler.start().await;
    let completed = tokio::time::timeout(WAIT, async {
        loop {
            if let ExecutionEvent::Completed { execution_id, .. } = events.recv().await.unwrap() {
                break execution_id;
            }
        }
    })
    .await
    .unwrap();

    let execution = uc.executions.get(&completed).await.unwrap();
    assert_eq!(execution.schedule_id.as_ref(), Some(&schedule.id));

    let results = uc
        .results
        .list_by_target("zone.ttl", CheckScope::Domain, &f.domain.id, 10)
        .await
        .unwrap();
    assert_eq!(results.len(), 1);
    assert!(results[0].scheduled_check);

    let advanced = uc.schedules.get(&f.owner, &schedule.id).await.unwrap();
    assert!(advanced.last_run.is_some());
    assert!(advanced.next_run > Utc::now());

    f.scheduler.close().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn schedules_never_overlap_their_own_runs() {
    let f = fixture(test_config()).await;
    let uc = f.scheduler.usecases().clone();
    let schedule = uc
        .schedules
        .create(NewSchedule::new(
            "test.gate",
            f.owner.clone(),
            CheckScope::Domain,
            f.domain.id.clone(),
            Duration::from_secs(1),
        ))
        .await
        .unwrap();

    f.scheduler.start().await;
    // Long enough for the schedule to come due at least twice more.
    tokio::time::sleep(Duration::from_millis(2500)).await;

    let runs: Vec<CheckExecution> = uc
        .executions
        .list_by_owner(&f.owner)
        .await
        .unwrap()
        .into_iter()
        .filter(|e| e.schedule_id.as_ref() == Some(&schedule.id))
        .collect();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].status, ExecutionStatus::Running);

    let advanced = uc.schedules.get(&f.owner, &schedule.id).await.unwrap();
    assert!(advanced.last_run.unwrap() > runs[0].started_at);

    f.gate.add_permits(1);
    let done = f.scheduler.wait_for_execution(&runs[0].id, WAIT).await.unwrap();
    assert_eq!(done.status, ExecutionStatus::Completed);

    f.scheduler.close().await;
}

#[tokio::test(start_paused = true)]
async fn stalled_checks_time_out() {
    let f = fixture(test_config()).await;
    f.scheduler.start().await;

    let id = f.trigger("test.stall").await.unwrap();
    let execution = f.scheduler.wait_for_execution(&id, WAIT).await.unwrap();
    assert_eq!(execution.status, ExecutionStatus::Failed);
    assert_eq!(execution.error.as_deref(), Some("timeout"));
    assert!(execution.result_id.is_none());

    f.scheduler.close().await;
}

#[tokio::test]
async fn panicking_checkers_fail_their_execution() {
    let f = fixture(test_config()).await;
    f.scheduler.start().await;

    let id = f.trigger("test.panic").await.unwrap();
    let execution = f.scheduler.wait_for_execution(&id, WAIT).await.unwrap();
    assert_eq!(execution.status, ExecutionStatus::Failed);
    assert!(execution.error.unwrap().contains("checker exploded"));

    // The worker survives the panic.
    let id = f.trigger("zone.delegation").await.unwrap();
    let execution = f.scheduler.wait_for_execution(&id, WAIT).await.unwrap();
    assert_eq!(execution.status, ExecutionStatus::Completed);

    f.scheduler.close().await;
}

#[tokio::test]
async fn full_queue_rejects_then_shutdown_fails_the_rest() {
    let f = fixture(SchedulerConfig {
        worker_count: 1,
        queue_depth: 1,
        ..test_config()
    })
    .await;
    let uc = f.scheduler.usecases().clone();
    let mut events = f.scheduler.events();
    f.scheduler.start().await;

    let running = f.trigger("test.gate").await.unwrap();
    Fixture::wait_started(&mut events, &running).await;
    let queued = f.trigger("test.gate").await.unwrap();

    let err = f.trigger("test.gate").await.unwrap_err();
    assert!(matches!(err, CoreError::QueueFull { capacity: 1 }));
    assert_eq!(err.status(), 503);
    assert_eq!(uc.executions.list_by_owner(&f.owner).await.unwrap().len(), 2);

    let status = f.scheduler.status().await.unwrap();
    assert_eq!(status.queue_size, 1);
    assert_eq!(status.active_count, 1);

    f.scheduler.close().await;
    for id in [&running, &queued] {
        let execution = uc.executions.get(id).await.unwrap();
        assert_eq!(execution.status, ExecutionStatus::Failed);
        assert_eq!(execution.error.as_deref(), Some("shutdown"));
    }
    assert!(!f.scheduler.is_running());
}

#[tokio::test]
async fn full_queue_drops_due_schedule_without_readvancing() {
    let f = fixture(SchedulerConfig {
        worker_count: 1,
        queue_depth: 1,
        ..test_config()
    })
    .await;
    let uc = f.scheduler.usecases().clone();
    let mut events = f.scheduler.events();
    f.scheduler.start().await;

    // One run holds the only worker, the next fills the queue.
    let running = f.trigger("test.gate").await.unwrap();
    Fixture::wait_started(&mut events, &running).await;
    f.trigger("test.gate").await.unwrap();

    let interval = Duration::from_secs(600);
    let schedule = uc
        .schedules
        .create(NewSchedule::new(
            "zone.ttl",
            f.owner.clone(),
            CheckScope::Domain,
            f.domain.id.clone(),
            interval,
        ))
        .await
        .unwrap();

    let advanced = tokio::time::timeout(WAIT, async {
        loop {
            let current = uc.schedules.get(&f.owner, &schedule.id).await.unwrap();
            if current.last_run.is_some() && !f.scheduler.inner.in_flight.contains_key(&schedule.id)
            {
                break current;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();
    let last_run = advanced.last_run.unwrap();
    assert_eq!(
        advanced.next_run,
        last_run + chrono::Duration::from_std(interval).unwrap()
    );

    // Another dispatch pass must leave the schedule alone.
    f.scheduler.set_runtime_enabled(true);
    tokio::time::sleep(Duration::from_millis(100)).await;
    let again = uc.schedules.get(&f.owner, &schedule.id).await.unwrap();
    assert_eq!(again.last_run, Some(last_run));
    assert_eq!(again.next_run, advanced.next_run);

    assert!(!f.scheduler.inner.in_flight.contains_key(&schedule.id));
    let scheduled_runs = uc
        .executions
        .list_by_owner(&f.owner)
        .await
        .unwrap()
        .into_iter()
        .filter(|e| e.schedule_id.as_ref() == Some(&schedule.id))
        .count();
    assert_eq!(scheduled_runs, 0);
    assert_eq!(f.scheduler.status().await.unwrap().queue_size, 1);

    f.scheduler.close().await;
}

#[tokio::test]
async fn status_reflects_lifecycle_and_runtime_switch() {
    let f = fixture(test_config()).await;
    let later = Utc::now() + chrono::Duration::hours(1);
    let mut draft = NewSchedule::new(
        "zone.ttl",
        f.owner.clone(),
        CheckScope::Domain,
        f.domain.id.clone(),
        Duration::from_secs(600),
    );
    draft.start_at = Some(later);
    f.scheduler.usecases().schedules.create(draft).await.unwrap();

    let status = f.scheduler.status().await.unwrap();
    assert!(status.config_enabled);
    assert!(!status.running);
    assert_eq!(status.next_schedules.len(), 1);
    assert_eq!(status.next_schedules[0].next_run, later);

    let err = f.trigger("zone.ttl").await.unwrap_err();
    assert_eq!(err.status(), 501);

    f.scheduler.start().await;
    f.scheduler.set_runtime_enabled(false);
    let status = f.scheduler.status().await.unwrap();
    assert!(status.running);
    assert!(!status.runtime_enabled);
    assert_eq!(status.worker_count, 2);

    // Workers still serve on-demand runs while the dispatcher is paused.
    let id = f.trigger("zone.ttl").await.unwrap();
    let execution = f.scheduler.wait_for_execution(&id, WAIT).await.unwrap();
    assert_eq!(execution.status, ExecutionStatus::Completed);

    f.scheduler.close().await;
}

#[tokio::test]
async fn disabled_scheduler_starts_nothing() {
    let f = fixture(SchedulerConfig {
        enabled: false,
        ..test_config()
    })
    .await;
    f.scheduler.start().await;
    assert!(!f.scheduler.is_running());
    assert!(!f.scheduler.status().await.unwrap().config_enabled);
}
