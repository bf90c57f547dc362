//! SeaORM implementation of the execution store.

use async_trait::async_trait;
use sea_orm::{ConnectionTrait, DatabaseTransaction, TransactionTrait};
use tracing::warn;
use uuid::Uuid;

use super::{case_executions, cycles, history, known_issues, spec_executions};
use crate::error::{AppError, AppResult};
use crate::models::{
    BuildFamily, CaseExecution, CaseOutcome, CaseState, Cycle, CyclePatch, KnownIssueData,
    KnownIssueRecord, LastCaseExecution, LastSpecExecution, NewCycle, SpecExecution, SpecFile,
    SpecPatch, SpecState,
};
use crate::services::ExecutionStore;

/// Store backed by a SeaORM connection or transaction.
///
/// History reads run inside a savepoint: a failed history statement is rolled back
/// to it and the enclosing transaction stays usable for the writes that follow.
pub struct SeaStore<'a, C> {
    db: &'a C,
    default_build_suffix: String,
}

impl<'a, C: ConnectionTrait + TransactionTrait<Transaction = DatabaseTransaction>> SeaStore<'a, C> {
    /// `default_build_suffix` is assumed for stored builds that cannot be decomposed.
    pub fn new(db: &'a C, default_build_suffix: impl Into<String>) -> Self {
        Self {
            db,
            default_build_suffix: default_build_suffix.into(),
        }
    }

    /// Open a savepoint, or a plain transaction when `db` is a bare connection.
    async fn savepoint(&self) -> AppResult<DatabaseTransaction> {
        self.db
            .begin()
            .await
            .map_err(|e| AppError::Database(format!("Failed to open savepoint: {}", e)))
    }
}

/// Release the savepoint on success, roll back to it on failure.
async fn close_savepoint<T>(savepoint: DatabaseTransaction, result: AppResult<T>) -> AppResult<T> {
    match result {
        Ok(value) => {
            savepoint
                .commit()
                .await
                .map_err(|e| AppError::Database(format!("Failed to release savepoint: {}", e)))?;
            Ok(value)
        }
        Err(e) => {
            if let Err(rollback) = savepoint.rollback().await {
                warn!("Failed to roll back savepoint: {}", rollback);
            }
            Err(e)
        }
    }
}

#[async_trait]
impl<C: ConnectionTrait + TransactionTrait<Transaction = DatabaseTransaction> + Send + Sync> ExecutionStore for SeaStore<'_, C> {
    async fn get_cycle(&self, id: Uuid) -> AppResult<Option<Cycle>> {
        cycles::find_by_id(self.db, id).await
    }

    async fn lock_cycle(&self, id: Uuid) -> AppResult<Option<Cycle>> {
        cycles::lock_by_id(self.db, id).await
    }

    async fn find_cycle(&self, repo: &str, branch: &str, build: &str) -> AppResult<Option<Cycle>> {
        cycles::find_by_identity(self.db, repo, branch, build).await
    }

    async fn find_cycle_by_build(&self, build: &str) -> AppResult<Option<Cycle>> {
        cycles::find_latest_by_build(self.db, build).await
    }

    async fn insert_cycle(&self, cycle: &NewCycle) -> AppResult<Cycle> {
        cycles::insert(self.db, cycle).await
    }

    async fn update_cycle(&self, id: Uuid, patch: &CyclePatch) -> AppResult<Cycle> {
        cycles::update(self.db, id, patch).await
    }

    async fn recent_done_cycles(
        &self,
        family: &BuildFamily,
        exclude: Option<Uuid>,
        limit: usize,
    ) -> AppResult<Vec<Cycle>> {
        let savepoint = self.savepoint().await?;
        let result = cycles::recent_done(
            &savepoint,
            family,
            &self.default_build_suffix,
            exclude,
            limit,
        )
        .await;
        close_savepoint(savepoint, result).await
    }

    async fn insert_spec_executions(
        &self,
        cycle_id: Uuid,
        files: &[SpecFile],
    ) -> AppResult<Vec<SpecExecution>> {
        spec_executions::insert_many(self.db, cycle_id, files).await
    }

    async fn get_spec_execution(&self, id: Uuid) -> AppResult<Option<SpecExecution>> {
        spec_executions::find_by_id(self.db, id).await
    }

    async fn list_spec_executions(
        &self,
        cycle_id: Uuid,
        state: Option<SpecState>,
    ) -> AppResult<Vec<SpecExecution>> {
        spec_executions::list_by_cycle(self.db, cycle_id, state).await
    }

    async fn claim_next_spec(
        &self,
        cycle_id: Uuid,
        server: &str,
    ) -> AppResult<Option<SpecExecution>> {
        spec_executions::claim_next(self.db, cycle_id, server).await
    }

    async fn update_spec_execution(&self, id: Uuid, patch: &SpecPatch) -> AppResult<SpecExecution> {
        spec_executions::update(self.db, id, patch).await
    }

    async fn upsert_case_executions(&self, cases: &[CaseExecution]) -> AppResult<()> {
        case_executions::upsert_many(self.db, cases).await
    }

    async fn list_case_executions(&self, cycle_id: Uuid) -> AppResult<Vec<CaseExecution>> {
        case_executions::list_by_cycle(self.db, cycle_id).await
    }

    async fn update_case_classification(
        &self,
        id: Uuid,
        state: CaseState,
        ticket: Option<&str>,
    ) -> AppResult<()> {
        case_executions::update_classification(self.db, id, state, ticket).await
    }

    async fn insert_known_issues(
        &self,
        cycle_id: Uuid,
        hash: &str,
        data: &[KnownIssueData],
    ) -> AppResult<bool> {
        known_issues::insert_if_absent(self.db, cycle_id, hash, data).await
    }

    async fn list_known_issues(&self, cycle_id: Uuid) -> AppResult<Vec<KnownIssueRecord>> {
        known_issues::list_by_cycle(self.db, cycle_id).await
    }

    async fn case_history(
        &self,
        cycle_ids: &[Uuid],
        spec_file: &str,
        full_title: &str,
    ) -> AppResult<Vec<LastCaseExecution>> {
        let savepoint = self.savepoint().await?;
        let result = history::case_history(&savepoint, cycle_ids, spec_file, full_title).await;
        close_savepoint(savepoint, result).await
    }

    async fn spec_history(
        &self,
        cycle_ids: &[Uuid],
        file: &str,
    ) -> AppResult<Vec<LastSpecExecution>> {
        let savepoint = self.savepoint().await?;
        let result = history::spec_history(&savepoint, cycle_ids, file).await;
        close_savepoint(savepoint, result).await
    }

    async fn case_outcomes(&self, cycle_ids: &[Uuid]) -> AppResult<Vec<CaseOutcome>> {
        case_executions::outcomes_in_cycles(self.db, cycle_ids).await
    }
}
