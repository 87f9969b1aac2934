// ── Worker ──
//
// Pulls execution ids off the queue and runs one check at a time.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use futures_util::FutureExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{ExecutionEvent, SchedulerInner};
use crate::checker::{CheckMeta, CheckOutcome};
use crate::error::{CoreError, panic_message};
use crate::model::{CheckExecution, CheckResult, Identifier};

/// Why a run produced no result.
#[derive(Debug)]
enum RunFailure {
    Timeout,
    Shutdown,
    Error(CoreError),
}

impl RunFailure {
    fn message(&self) -> String {
        match self {
            Self::Timeout => "timeout".into(),
            Self::Shutdown => "shutdown".into(),
            Self::Error(e) => e.to_string(),
        }
    }
}

impl From<CoreError> for RunFailure {
    fn from(e: CoreError) -> Self {
        Self::Error(e)
    }
}

pub(super) async fn worker_task(
    inner: Arc<SchedulerInner>,
    worker_id: usize,
    cancel: CancellationToken,
) {
    debug!(worker_id, "worker started");
    loop {
        let id = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            msg = inner.queue_rx.recv_async() => match msg {
                Ok(id) => id,
                Err(_) => break,
            },
        };
        process(&inner, &id, &cancel).await;
    }
    debug!(worker_id, "worker stopped");
}

async fn process(inner: &SchedulerInner, id: &Identifier, cancel: &CancellationToken) {
    let execution = match inner.usecases.executions.mark_running(id).await {
        Ok(execution) => execution,
        Err(e) => {
            // Discarded or already failed by a shutdown; nothing to run.
            warn!(execution_id = %id, error = %e, "cannot start execution");
            return;
        }
    };
    inner.emit(ExecutionEvent::Started {
        execution_id: id.clone(),
    });

    let token = cancel.child_token();
    inner.running.insert(id.clone(), token.clone());

    match run(inner, &execution, &token).await {
        Ok(result) => match finish(inner, &execution, result).await {
            Ok(event) => inner.emit(event),
            Err(e) => fail(inner, &execution, &RunFailure::Error(e)).await,
        },
        Err(failure) => fail(inner, &execution, &failure).await,
    }

    inner.running.remove(id);
    inner.release(&execution);
}

async fn run(
    inner: &SchedulerInner,
    execution: &CheckExecution,
    token: &CancellationToken,
) -> Result<CheckResult, RunFailure> {
    let uc = &inner.usecases;
    let checker = uc.registries.checkers.get(&execution.checker_name)?;
    let target = uc
        .targets
        .resolve(execution.target_type, &execution.target_id, &execution.owner_id)
        .await?;
    if !checker
        .availability()
        .accepts(execution.target_type, target.service_type.as_deref())
    {
        return Err(CoreError::validation(format!(
            "checker {} does not apply to {} {}",
            execution.checker_name, execution.target_type, execution.target_id
        ))
        .into());
    }

    let options = uc
        .options
        .build_merged_checker_options(
            &execution.checker_name,
            Some(&execution.owner_id),
            target.domain_id(),
            target.service_id.as_ref(),
            &target.auto_fill(),
            &execution.options,
        )
        .await?;

    let meta = CheckMeta {
        execution_id: execution.id.clone(),
        scope: execution.target_type,
        target_id: execution.target_id.clone(),
        owner_id: execution.owner_id.clone(),
        domain_name: target.domain.as_ref().map(|d| d.domain_name.clone()),
        subdomain: target.subdomain.clone(),
        service_type: target.service_type.clone(),
        records: target.records,
        cancel: token.clone(),
    };

    let deadline = checker.timeout().unwrap_or(inner.config.default_check_timeout);
    let executed_at = Utc::now();
    let started = Instant::now();
    let check = AssertUnwindSafe(checker.run_check(&options, &meta)).catch_unwind();

    let outcome: CheckOutcome = tokio::select! {
        biased;
        () = token.cancelled() => return Err(RunFailure::Shutdown),
        finished = tokio::time::timeout(deadline, check) => match finished {
            Err(_) => {
                token.cancel();
                warn!(
                    execution_id = %execution.id,
                    checker = %execution.checker_name,
                    timeout_secs = deadline.as_secs(),
                    "check timed out"
                );
                return Err(RunFailure::Timeout);
            }
            Ok(Err(panic)) => {
                return Err(CoreError::Panic {
                    call: format!("checker {}", execution.checker_name),
                    message: panic_message(panic.as_ref()),
                }
                .into());
            }
            Ok(Ok(outcome)) => outcome?,
        },
    };

    Ok(CheckResult {
        id: Identifier::generate(),
        checker_name: execution.checker_name.clone(),
        check_type: execution.target_type,
        target_id: execution.target_id.clone(),
        owner_id: execution.owner_id.clone(),
        executed_at,
        scheduled_check: execution.is_scheduled(),
        options,
        status: outcome.status,
        status_line: outcome.status_line,
        report: outcome.report,
        duration: started.elapsed(),
        error: None,
    })
}

/// Persist the result, then mark the execution completed.
async fn finish(
    inner: &SchedulerInner,
    execution: &CheckExecution,
    result: CheckResult,
) -> Result<ExecutionEvent, CoreError> {
    inner.usecases.results.create(&result).await?;
    inner
        .usecases
        .executions
        .complete(&execution.id, &result.id)
        .await?;
    info!(
        execution_id = %execution.id,
        checker = %execution.checker_name,
        status = %result.status,
        elapsed_ms = result.duration.as_millis(),
        "check completed"
    );
    Ok(ExecutionEvent::Completed {
        execution_id: execution.id.clone(),
        result_id: result.id,
        status: result.status,
    })
}

async fn fail(inner: &SchedulerInner, execution: &CheckExecution, failure: &RunFailure) {
    let message = failure.message();
    match inner.usecases.executions.fail(&execution.id, &message).await {
        Ok(_) => {
            warn!(
                execution_id = %execution.id,
                checker = %execution.checker_name,
                error = %message,
                "check failed"
            );
            inner.emit(ExecutionEvent::Failed {
                execution_id: execution.id.clone(),
                error: message,
            });
        }
        Err(e) => warn!(execution_id = %execution.id, error = %e, "cannot record failure"),
    }
}
