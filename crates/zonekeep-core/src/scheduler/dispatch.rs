// ── Dispatcher ──
//
// Sleeps until the earliest enabled schedule is due (bounded by the idle
// poll), or until a schedule write or an on-demand trigger wakes it.

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::SchedulerInner;
use crate::error::CoreError;
use crate::model::CheckExecution;

pub(super) async fn dispatcher_task(inner: Arc<SchedulerInner>, cancel: CancellationToken) {
    let idle = inner.config.idle_poll;
    loop {
        let pause = if inner.runtime_enabled.load(Ordering::SeqCst) {
            match dispatch_due(&inner).await {
                Ok(next) => sleep_budget(next, Utc::now(), idle),
                Err(e) => {
                    warn!(error = %e, "dispatch pass failed");
                    idle
                }
            }
        } else {
            idle
        };

        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            () = inner.wake.notified() => {}
            () = tokio::time::sleep(pause) => {}
        }
    }
    info!("dispatcher stopped");
}

/// Enqueue every due schedule once, then report the next fire time.
async fn dispatch_due(inner: &SchedulerInner) -> Result<Option<DateTime<Utc>>, CoreError> {
    let uc = &inner.usecases;
    let now = Utc::now();

    for schedule in uc.schedules.list_enabled().await? {
        // Sorted by next_run: the rest are not due either.
        if !schedule.is_due(now) {
            break;
        }
        let Some(schedule) = uc.storage.advance_schedule(&schedule.id, now).await? else {
            continue;
        };

        if let Some(running) = inner.in_flight.get(&schedule.id) {
            debug!(
                schedule_id = %schedule.id,
                execution_id = %running.value(),
                "previous run still in flight, skipping tick"
            );
            continue;
        }

        let execution = CheckExecution::pending(
            Some(&schedule),
            &schedule.checker_name,
            schedule.owner_id.clone(),
            schedule.target_type,
            schedule.target_id.clone(),
            schedule.options.clone(),
        );
        uc.executions.create(&execution).await?;
        inner
            .in_flight
            .insert(schedule.id.clone(), execution.id.clone());

        match inner.enqueue(&execution.id) {
            Ok(()) => debug!(
                schedule_id = %schedule.id,
                execution_id = %execution.id,
                checker = %schedule.checker_name,
                "scheduled check queued"
            ),
            Err(e @ CoreError::QueueFull { .. }) => {
                inner.in_flight.remove(&schedule.id);
                uc.executions.discard(&execution.id).await?;
                warn!(schedule_id = %schedule.id, error = %e, "dropping scheduled run");
            }
            Err(e) => {
                inner.in_flight.remove(&schedule.id);
                uc.executions.discard(&execution.id).await?;
                return Err(e);
            }
        }
    }

    uc.schedules.next_fire().await
}

fn sleep_budget(next: Option<DateTime<Utc>>, now: DateTime<Utc>, idle: Duration) -> Duration {
    next.map_or(idle, |at| {
        (at - now)
            .to_std()
            .unwrap_or(Duration::ZERO)
            .min(idle)
    })
}
