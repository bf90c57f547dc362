//! Persistence contract consumed by the classification engine.
//!
//! The engine never touches SeaORM directly; `crate::db::SeaStore` implements this
//! trait over a connection or transaction, and tests use an in-memory store.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{
    BuildFamily, CaseExecution, CaseOutcome, CaseState, Cycle, CyclePatch, KnownIssueData,
    KnownIssueRecord, LastCaseExecution, LastSpecExecution, NewCycle, SpecExecution, SpecFile,
    SpecPatch, SpecState,
};

#[async_trait]
pub trait ExecutionStore: Send + Sync {
    async fn get_cycle(&self, id: Uuid) -> AppResult<Option<Cycle>>;

    /// Read a cycle and serialize concurrent recomputes on it until the unit of work ends.
    async fn lock_cycle(&self, id: Uuid) -> AppResult<Option<Cycle>>;

    /// Newest cycle with exactly this repo, branch and build.
    async fn find_cycle(&self, repo: &str, branch: &str, build: &str) -> AppResult<Option<Cycle>>;

    /// Newest cycle with this build string.
    async fn find_cycle_by_build(&self, build: &str) -> AppResult<Option<Cycle>>;

    async fn insert_cycle(&self, cycle: &NewCycle) -> AppResult<Cycle>;

    async fn update_cycle(&self, id: Uuid, patch: &CyclePatch) -> AppResult<Cycle>;

    /// Done cycles of a build family, newest first, at most `limit`.
    async fn recent_done_cycles(
        &self,
        family: &BuildFamily,
        exclude: Option<Uuid>,
        limit: usize,
    ) -> AppResult<Vec<Cycle>>;

    async fn insert_spec_executions(
        &self,
        cycle_id: Uuid,
        files: &[SpecFile],
    ) -> AppResult<Vec<SpecExecution>>;

    async fn get_spec_execution(&self, id: Uuid) -> AppResult<Option<SpecExecution>>;

    /// Spec executions of a cycle ordered by sort weight then file.
    async fn list_spec_executions(
        &self,
        cycle_id: Uuid,
        state: Option<SpecState>,
    ) -> AppResult<Vec<SpecExecution>>;

    /// Claim the next queued spec of a cycle for a worker.
    async fn claim_next_spec(
        &self,
        cycle_id: Uuid,
        server: &str,
    ) -> AppResult<Option<SpecExecution>>;

    async fn update_spec_execution(&self, id: Uuid, patch: &SpecPatch) -> AppResult<SpecExecution>;

    async fn upsert_case_executions(&self, cases: &[CaseExecution]) -> AppResult<()>;

    async fn list_case_executions(&self, cycle_id: Uuid) -> AppResult<Vec<CaseExecution>>;

    async fn update_case_classification(
        &self,
        id: Uuid,
        state: CaseState,
        ticket: Option<&str>,
    ) -> AppResult<()>;

    /// Returns `false` when the payload was already stored for the cycle.
    async fn insert_known_issues(
        &self,
        cycle_id: Uuid,
        hash: &str,
        data: &[KnownIssueData],
    ) -> AppResult<bool>;

    async fn list_known_issues(&self, cycle_id: Uuid) -> AppResult<Vec<KnownIssueRecord>>;

    /// Outcomes of one case within `cycle_ids`, newest cycle first.
    async fn case_history(
        &self,
        cycle_ids: &[Uuid],
        spec_file: &str,
        full_title: &str,
    ) -> AppResult<Vec<LastCaseExecution>>;

    /// Counters of one spec file within `cycle_ids`, newest cycle first.
    async fn spec_history(
        &self,
        cycle_ids: &[Uuid],
        file: &str,
    ) -> AppResult<Vec<LastSpecExecution>>;

    /// Every case outcome within `cycle_ids`.
    async fn case_outcomes(&self, cycle_ids: &[Uuid]) -> AppResult<Vec<CaseOutcome>>;
}
