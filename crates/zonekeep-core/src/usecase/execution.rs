// ── Check executions ──
//
// Every transition is a compare-and-swap on the stored execution, so a
// worker and a shutdown sweep can never both finish the same run.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::error::CoreError;
use crate::model::{CheckExecution, ExecutionStatus, Identifier};
use crate::store::Storage;

#[derive(Debug, Clone)]
pub struct ExecutionUsecase {
    storage: Storage,
}

impl ExecutionUsecase {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    pub async fn create(&self, execution: &CheckExecution) -> Result<(), CoreError> {
        if execution.status != ExecutionStatus::Pending {
            return Err(CoreError::validation("executions must be created pending"));
        }
        self.storage.put_execution(execution).await
    }

    pub async fn get(&self, id: &Identifier) -> Result<CheckExecution, CoreError> {
        self.storage.get_execution(id).await
    }

    /// Drop an execution that never made it into the queue.
    pub async fn discard(&self, id: &Identifier) -> Result<(), CoreError> {
        self.storage.delete_execution(id).await?;
        Ok(())
    }

    pub async fn mark_running(&self, id: &Identifier) -> Result<CheckExecution, CoreError> {
        self.storage
            .update_execution(id, |e| e.transition(ExecutionStatus::Running))
            .await
    }

    pub async fn complete(
        &self,
        id: &Identifier,
        result_id: &Identifier,
    ) -> Result<CheckExecution, CoreError> {
        self.storage
            .update_execution(id, |e| {
                e.transition(ExecutionStatus::Completed)?;
                e.result_id = Some(result_id.clone());
                Ok(())
            })
            .await
    }

    pub async fn fail(&self, id: &Identifier, error: &str) -> Result<CheckExecution, CoreError> {
        self.storage
            .update_execution(id, |e| {
                e.transition(ExecutionStatus::Failed)?;
                e.error = Some(error.to_owned());
                Ok(())
            })
            .await
    }

    pub async fn list_by_owner(&self, owner: &Identifier) -> Result<Vec<CheckExecution>, CoreError> {
        let mut iter = self.storage.list_executions().await?;
        let mut found = Vec::new();
        while let Some(execution) = iter.next_valid() {
            if &execution.owner_id == owner {
                found.push(execution);
            }
        }
        found.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        Ok(found)
    }

    /// Executions that have not reached a terminal state.
    pub async fn list_unfinished(&self) -> Result<Vec<CheckExecution>, CoreError> {
        let mut iter = self.storage.list_executions().await?;
        let mut found = Vec::new();
        while let Some(execution) = iter.next_valid() {
            if !execution.status.is_terminal() {
                found.push(execution);
            }
        }
        Ok(found)
    }

    /// Delete terminal executions that finished before `cutoff`.
    pub async fn prune(&self, cutoff: DateTime<Utc>) -> Result<usize, CoreError> {
        let mut iter = self.storage.list_executions().await?;
        let mut pruned = 0;
        while let Some(execution) = iter.next_valid() {
            let finished_before = execution.status.is_terminal()
                && execution.completed_at.is_some_and(|at| at < cutoff);
            if finished_before {
                iter.drop_item().await?;
                pruned += 1;
            }
        }
        debug!(pruned, %cutoff, "pruned executions");
        Ok(pruned)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::{CheckScope, CheckerOptions};

    fn pending() -> CheckExecution {
        CheckExecution::pending(
            None,
            "zone.ttl",
            Identifier::generate(),
            CheckScope::Domain,
            Identifier::generate(),
            CheckerOptions::new(),
        )
    }

    #[tokio::test]
    async fn lifecycle_is_monotonic() {
        let uc = ExecutionUsecase::new(Storage::in_memory());
        let exec = pending();
        uc.create(&exec).await.unwrap();

        assert!(uc.complete(&exec.id, &Identifier::generate()).await.is_err());
        uc.mark_running(&exec.id).await.unwrap();
        assert!(uc.mark_running(&exec.id).await.is_err());

        let result_id = Identifier::generate();
        let done = uc.complete(&exec.id, &result_id).await.unwrap();
        assert_eq!(done.status, ExecutionStatus::Completed);
        assert_eq!(done.result_id, Some(result_id));
        assert!(done.completed_at.is_some());
        assert!(uc.fail(&exec.id, "late").await.is_err());
    }

    #[tokio::test]
    async fn pending_runs_can_fail_directly() {
        let uc = ExecutionUsecase::new(Storage::in_memory());
        let exec = pending();
        uc.create(&exec).await.unwrap();
        let failed = uc.fail(&exec.id, "shutdown").await.unwrap();
        assert_eq!(failed.error.as_deref(), Some("shutdown"));
        assert!(uc.list_unfinished().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn prune_only_touches_old_terminal_runs() {
        let uc = ExecutionUsecase::new(Storage::in_memory());
        let finished = pending();
        let waiting = pending();
        uc.create(&finished).await.unwrap();
        uc.create(&waiting).await.unwrap();
        uc.fail(&finished.id, "boom").await.unwrap();

        assert_eq!(uc.prune(Utc::now() - chrono::Duration::hours(1)).await.unwrap(), 0);
        assert_eq!(uc.prune(Utc::now() + chrono::Duration::seconds(1)).await.unwrap(), 1);
        assert!(uc.get(&finished.id).await.is_err());
        assert!(uc.get(&waiting.id).await.is_ok());
    }
}
