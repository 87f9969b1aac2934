// ── Check scheduler ──
//
// One dispatcher task turns due schedules into pending executions and
// pushes their ids onto a bounded queue; a fixed pool of workers drains
// it. At most one execution per schedule is in flight at any time.

mod dispatch;
mod worker;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use futures_util::future::join_all;
use serde::Serialize;
use tokio::sync::{Mutex, Notify, broadcast};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::SchedulerConfig;
use crate::error::CoreError;
use crate::model::{CheckExecution, CheckScope, CheckStatus, CheckerOptions, Identifier};
use crate::usecase::Usecases;

const EVENT_CHANNEL_SIZE: usize = 256;

// ── Events and status ───────────────────────────────────────────────

/// Lifecycle notifications for executions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum ExecutionEvent {
    Queued {
        execution_id: Identifier,
    },
    Started {
        execution_id: Identifier,
    },
    Completed {
        execution_id: Identifier,
        result_id: Identifier,
        status: CheckStatus,
    },
    Failed {
        execution_id: Identifier,
        error: String,
    },
}

impl ExecutionEvent {
    pub fn execution_id(&self) -> &Identifier {
        match self {
            Self::Queued { execution_id }
            | Self::Started { execution_id }
            | Self::Completed { execution_id, .. }
            | Self::Failed { execution_id, .. } => execution_id,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed { .. } | Self::Failed { .. })
    }
}

/// Upcoming fire time of one schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpcomingSchedule {
    pub schedule_id: Identifier,
    pub checker_name: String,
    pub target_type: CheckScope,
    pub target_id: Identifier,
    pub next_run: DateTime<Utc>,
}

/// Point-in-time view of the scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchedulerStatus {
    pub config_enabled: bool,
    pub runtime_enabled: bool,
    pub running: bool,
    pub worker_count: usize,
    pub queue_size: usize,
    pub active_count: usize,
    pub next_schedules: Vec<UpcomingSchedule>,
}

// ── Scheduler ───────────────────────────────────────────────────────

/// Cheaply cloneable handle on the scheduler tasks.
#[derive(Clone)]
pub struct Scheduler {
    inner: Arc<SchedulerInner>,
}

struct SchedulerInner {
    config: SchedulerConfig,
    usecases: Usecases,
    queue_tx: flume::Sender<Identifier>,
    queue_rx: flume::Receiver<Identifier>,
    wake: Arc<Notify>,
    events: broadcast::Sender<ExecutionEvent>,
    /// schedule id -> execution id, for schedules with a run in flight.
    in_flight: DashMap<Identifier, Identifier>,
    /// execution id -> cancellation token, for runs a worker holds.
    running: DashMap<Identifier, CancellationToken>,
    runtime_enabled: AtomicBool,
    started: AtomicBool,
    cancel: CancellationToken,
    /// Child token for the current run of the tasks, replaced on restart.
    cancel_child: Mutex<CancellationToken>,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Scheduler {
    pub fn new(config: SchedulerConfig, usecases: Usecases) -> Self {
        let (queue_tx, queue_rx) = flume::bounded(config.queue_depth.max(1));
        let (events, _) = broadcast::channel(EVENT_CHANNEL_SIZE);
        let cancel = CancellationToken::new();
        let cancel_child = cancel.child_token();
        let wake = usecases.schedules.wake_signal();

        Self {
            inner: Arc::new(SchedulerInner {
                config,
                usecases,
                queue_tx,
                queue_rx,
                wake,
                events,
                in_flight: DashMap::new(),
                running: DashMap::new(),
                runtime_enabled: AtomicBool::new(true),
                started: AtomicBool::new(false),
                cancel,
                cancel_child: Mutex::new(cancel_child),
                task_handles: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.inner.config
    }

    pub fn usecases(&self) -> &Usecases {
        &self.inner.usecases
    }

    /// Subscribe to execution lifecycle events.
    pub fn events(&self) -> broadcast::Receiver<ExecutionEvent> {
        self.inner.events.subscribe()
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Spawn the dispatcher and workers. No-op when disabled by
    /// configuration or already started.
    pub async fn start(&self) {
        if !self.inner.config.enabled {
            info!("check scheduler disabled by configuration");
            return;
        }
        if self.inner.started.swap(true, Ordering::SeqCst) {
            return;
        }

        let child = self.inner.cancel.child_token();
        *self.inner.cancel_child.lock().await = child.clone();

        let workers = self.inner.config.worker_count.max(1);
        let mut handles = self.inner.task_handles.lock().await;
        handles.push(tokio::spawn(dispatch::dispatcher_task(
            Arc::clone(&self.inner),
            child.clone(),
        )));
        for worker_id in 0..workers {
            handles.push(tokio::spawn(worker::worker_task(
                Arc::clone(&self.inner),
                worker_id,
                child.clone(),
            )));
        }
        info!(workers, queue_depth = self.inner.config.queue_depth, "check scheduler started");
    }

    /// Stop every task. Running checks are cancelled and given up to
    /// the shutdown grace to finish; queued executions are failed with
    /// `"shutdown"` without running.
    pub async fn close(&self) {
        if !self.inner.started.swap(false, Ordering::SeqCst) {
            return;
        }
        self.inner.cancel_child.lock().await.cancel();

        let handles: Vec<JoinHandle<()>> = self.inner.task_handles.lock().await.drain(..).collect();
        let aborts: Vec<_> = handles.iter().map(JoinHandle::abort_handle).collect();
        let grace = self.inner.config.shutdown_grace;
        if tokio::time::timeout(grace, join_all(handles)).await.is_err() {
            warn!(grace_secs = grace.as_secs(), "workers did not stop in time; aborting");
            for handle in aborts {
                handle.abort();
            }
        }

        let mut drained = 0;
        while let Ok(id) = self.inner.queue_rx.try_recv() {
            self.inner.fail_quietly(&id, "shutdown").await;
            drained += 1;
        }
        let stranded: Vec<Identifier> = self.inner.running.iter().map(|e| e.key().clone()).collect();
        for id in &stranded {
            self.inner.fail_quietly(id, "shutdown").await;
        }
        self.inner.running.clear();
        self.inner.in_flight.clear();
        info!(drained, stranded = stranded.len(), "check scheduler stopped");
    }

    /// Pause or resume the dispatcher. Workers keep serving on-demand runs.
    pub fn set_runtime_enabled(&self, enabled: bool) {
        self.inner.runtime_enabled.store(enabled, Ordering::SeqCst);
        self.inner.wake.notify_one();
        debug!(enabled, "dispatcher runtime switch");
    }

    pub fn is_running(&self) -> bool {
        self.inner.started.load(Ordering::SeqCst)
    }

    // ── Operations ───────────────────────────────────────────────────

    /// Queue a one-off run and return its execution id.
    pub async fn trigger_on_demand_check(
        &self,
        checker_name: &str,
        target_type: CheckScope,
        target_id: &Identifier,
        owner: &Identifier,
        run_opts: CheckerOptions,
    ) -> Result<Identifier, CoreError> {
        if !self.is_running() {
            return Err(CoreError::Unsupported {
                operation: "on-demand checks while the scheduler is stopped".into(),
            });
        }
        let checker = self.inner.usecases.registries.checkers.get(checker_name)?;
        let availability = checker.availability();
        let applies = match target_type {
            CheckScope::Domain => availability.apply_to_domain,
            CheckScope::Service => availability.apply_to_service,
            CheckScope::Instance | CheckScope::User | CheckScope::OnDemand => false,
        };
        if !applies {
            return Err(CoreError::validation(format!(
                "checker {checker_name} does not apply to {target_type} targets"
            )));
        }

        let execution = CheckExecution::pending(
            None,
            checker_name,
            owner.clone(),
            target_type,
            target_id.clone(),
            run_opts,
        );
        self.inner.usecases.executions.create(&execution).await?;
        if let Err(e) = self.inner.enqueue(&execution.id) {
            self.inner.usecases.executions.discard(&execution.id).await?;
            return Err(e);
        }
        self.inner.wake.notify_one();
        debug!(execution_id = %execution.id, checker = checker_name, "on-demand check queued");
        Ok(execution.id)
    }

    /// Wait until an execution reaches a terminal state.
    pub async fn wait_for_execution(
        &self,
        id: &Identifier,
        limit: Duration,
    ) -> Result<CheckExecution, CoreError> {
        tokio::time::timeout(limit, self.await_terminal(id))
            .await
            .map_err(|_| CoreError::Timeout {
                timeout_secs: limit.as_secs(),
            })?
    }

    async fn await_terminal(&self, id: &Identifier) -> Result<CheckExecution, CoreError> {
        // Subscribe before reading so a transition in between is not missed.
        let mut events = self.events();
        loop {
            let execution = self.inner.usecases.executions.get(id).await?;
            if execution.status.is_terminal() {
                return Ok(execution);
            }
            loop {
                match events.recv().await {
                    Ok(event) if event.is_terminal() && event.execution_id() == id => break,
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(_)) => break,
                    Err(broadcast::error::RecvError::Closed) => {
                        return Err(CoreError::Internal("event channel closed".into()));
                    }
                }
            }
        }
    }

    /// Delete terminal executions older than `older_than`.
    pub async fn prune_executions(&self, older_than: Duration) -> Result<usize, CoreError> {
        let age = chrono::Duration::from_std(older_than)
            .map_err(|e| CoreError::validation(format!("retention too large: {e}")))?;
        self.inner.usecases.executions.prune(Utc::now() - age).await
    }

    pub async fn status(&self) -> Result<SchedulerStatus, CoreError> {
        let next_schedules = self
            .inner
            .usecases
            .schedules
            .list_enabled()
            .await?
            .into_iter()
            .take(self.inner.config.next_schedules_preview)
            .map(|s| UpcomingSchedule {
                schedule_id: s.id,
                checker_name: s.checker_name,
                target_type: s.target_type,
                target_id: s.target_id,
                next_run: s.next_run,
            })
            .collect();
        Ok(SchedulerStatus {
            config_enabled: self.inner.config.enabled,
            runtime_enabled: self.inner.runtime_enabled.load(Ordering::SeqCst),
            running: self.is_running(),
            worker_count: self.inner.config.worker_count.max(1),
            queue_size: self.inner.queue_tx.len(),
            active_count: self.inner.running.len(),
            next_schedules,
        })
    }
}

impl SchedulerInner {
    fn emit(&self, event: ExecutionEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn enqueue(&self, execution_id: &Identifier) -> Result<(), CoreError> {
        match self.queue_tx.try_send(execution_id.clone()) {
            Ok(()) => {
                self.emit(ExecutionEvent::Queued {
                    execution_id: execution_id.clone(),
                });
                Ok(())
            }
            Err(flume::TrySendError::Full(_)) => Err(CoreError::QueueFull {
                capacity: self.config.queue_depth,
            }),
            Err(flume::TrySendError::Disconnected(_)) => {
                Err(CoreError::Internal("execution queue closed".into()))
            }
        }
    }

    /// Fail an execution, ignoring runs that already finished.
    async fn fail_quietly(&self, id: &Identifier, error: &str) {
        match self.usecases.executions.fail(id, error).await {
            Ok(_) => self.emit(ExecutionEvent::Failed {
                execution_id: id.clone(),
                error: error.to_owned(),
            }),
            Err(e) => debug!(execution_id = %id, error = %e, "execution not failed on shutdown"),
        }
    }

    /// Release the in-flight slot held by `execution` for its schedule.
    fn release(&self, execution: &CheckExecution) {
        if let Some(schedule_id) = &execution.schedule_id {
            self.in_flight
                .remove_if(schedule_id, |_, current| current == &execution.id);
        }
    }
}

#[cfg(test)]
mod tests;
