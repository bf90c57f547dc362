//! In-memory `ExecutionStore` for exercising the engine without PostgreSQL.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use cycle_report_lib::error::{AppError, AppResult};
use cycle_report_lib::models::{
    BuildFamily, BuildInfo, CaseCounts, CaseExecution, CaseOutcome, CaseState, Cycle, CyclePatch,
    CycleState, KnownIssueData, KnownIssueRecord, LastCaseExecution, LastSpecExecution, NewCycle,
    SpecExecution, SpecFile, SpecPatch, SpecState,
};
use cycle_report_lib::services::ExecutionStore;

pub const DEFAULT_BUILD_SUFFIX: &str = "onprem-ent";

#[derive(Default)]
struct Tables {
    cycles: Vec<Cycle>,
    specs: Vec<SpecExecution>,
    cases: Vec<CaseExecution>,
    known_issues: Vec<KnownIssueRecord>,
}

pub struct MemoryStore {
    tables: Mutex<Tables>,
    base: DateTime<Utc>,
    tick: AtomicI64,
    fail_history: AtomicBool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self {
            tables: Mutex::new(Tables::default()),
            base: Utc::now() - Duration::days(1),
            tick: AtomicI64::new(0),
            fail_history: AtomicBool::new(false),
        }
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every history lookup fail from now on.
    pub fn break_history(&self) {
        self.fail_history.store(true, Ordering::SeqCst);
    }

    /// Strictly increasing timestamps so "newest first" is deterministic.
    fn now(&self) -> DateTime<Utc> {
        self.base + Duration::seconds(self.tick.fetch_add(1, Ordering::SeqCst))
    }

    fn history_guard(&self) -> AppResult<()> {
        if self.fail_history.load(Ordering::SeqCst) {
            Err(AppError::Database("history unavailable".to_string()))
        } else {
            Ok(())
        }
    }

    pub fn cases_of_spec(&self, spec_id: Uuid) -> Vec<CaseExecution> {
        let tables = self.tables.lock().unwrap();
        tables
            .cases
            .iter()
            .filter(|c| c.spec_execution_id == spec_id)
            .cloned()
            .collect()
    }

    pub fn known_issue_count(&self, cycle_id: Uuid) -> usize {
        let tables = self.tables.lock().unwrap();
        tables
            .known_issues
            .iter()
            .filter(|k| k.cycle_id == cycle_id)
            .count()
    }
}

fn sorted_by_queue(mut specs: Vec<SpecExecution>) -> Vec<SpecExecution> {
    specs.sort_by(|a, b| (a.sort_weight, &a.file).cmp(&(b.sort_weight, &b.file)));
    specs
}

#[async_trait]
impl ExecutionStore for MemoryStore {
    async fn get_cycle(&self, id: Uuid) -> AppResult<Option<Cycle>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables.cycles.iter().find(|c| c.id == id).cloned())
    }

    async fn lock_cycle(&self, id: Uuid) -> AppResult<Option<Cycle>> {
        self.get_cycle(id).await
    }

    async fn find_cycle(&self, repo: &str, branch: &str, build: &str) -> AppResult<Option<Cycle>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .cycles
            .iter()
            .filter(|c| c.repo == repo && c.branch == branch && c.build == build)
            .max_by_key(|c| c.create_at)
            .cloned())
    }

    async fn find_cycle_by_build(&self, build: &str) -> AppResult<Option<Cycle>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .cycles
            .iter()
            .filter(|c| c.build == build)
            .max_by_key(|c| c.create_at)
            .cloned())
    }

    async fn insert_cycle(&self, new: &NewCycle) -> AppResult<Cycle> {
        let now = self.now();
        let cycle = Cycle {
            id: Uuid::now_v7(),
            repo: new.repo.clone(),
            branch: new.branch.clone(),
            build: new.build.clone(),
            state: CycleState::OnQueue,
            specs_registered: new.specs_registered,
            specs_done: 0,
            duration: 0,
            counts: CaseCounts::default(),
            environment: new.environment.clone(),
            start_at: None,
            end_at: None,
            create_at: now,
            update_at: now,
        };
        self.tables.lock().unwrap().cycles.push(cycle.clone());
        Ok(cycle)
    }

    async fn update_cycle(&self, id: Uuid, patch: &CyclePatch) -> AppResult<Cycle> {
        let now = self.now();
        let mut tables = self.tables.lock().unwrap();
        let cycle = tables
            .cycles
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| AppError::NotFound(format!("Cycle {}", id)))?;
        if let Some(state) = patch.state {
            cycle.state = state;
        }
        if let Some(specs_done) = patch.specs_done {
            cycle.specs_done = specs_done;
        }
        if let Some(duration) = patch.duration {
            cycle.duration = duration;
        }
        if let Some(counts) = patch.counts {
            cycle.counts = counts;
        }
        if patch.start_at.is_some() {
            cycle.start_at = patch.start_at;
        }
        if patch.end_at.is_some() {
            cycle.end_at = patch.end_at;
        }
        cycle.update_at = now;
        Ok(cycle.clone())
    }

    async fn recent_done_cycles(
        &self,
        family: &BuildFamily,
        exclude: Option<Uuid>,
        limit: usize,
    ) -> AppResult<Vec<Cycle>> {
        self.history_guard()?;
        let tables = self.tables.lock().unwrap();
        let mut cycles: Vec<Cycle> = tables
            .cycles
            .iter()
            .filter(|c| c.state == CycleState::Done)
            .filter(|c| c.repo == family.repo && c.branch == family.branch)
            .filter(|c| BuildInfo::suffix_or(&c.build, DEFAULT_BUILD_SUFFIX) == family.build_suffix)
            .filter(|c| Some(c.id) != exclude)
            .cloned()
            .collect();
        cycles.sort_by(|a, b| b.create_at.cmp(&a.create_at));
        cycles.truncate(limit);
        Ok(cycles)
    }

    async fn insert_spec_executions(
        &self,
        cycle_id: Uuid,
        files: &[SpecFile],
    ) -> AppResult<Vec<SpecExecution>> {
        let now = self.now();
        let specs: Vec<SpecExecution> = files
            .iter()
            .map(|f| SpecExecution {
                id: Uuid::now_v7(),
                cycle_id,
                file: f.file.trim().to_string(),
                server: None,
                state: SpecState::OnQueue,
                counts: CaseCounts::default(),
                duration: 0,
                tests: 0,
                sort_weight: f.sort_weight,
                last_execution: Vec::new(),
                test_start_at: None,
                test_end_at: None,
                start_at: None,
                end_at: None,
                create_at: now,
                update_at: now,
            })
            .collect();
        self.tables
            .lock()
            .unwrap()
            .specs
            .extend(specs.iter().cloned());
        Ok(sorted_by_queue(specs))
    }

    async fn get_spec_execution(&self, id: Uuid) -> AppResult<Option<SpecExecution>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables.specs.iter().find(|s| s.id == id).cloned())
    }

    async fn list_spec_executions(
        &self,
        cycle_id: Uuid,
        state: Option<SpecState>,
    ) -> AppResult<Vec<SpecExecution>> {
        let tables = self.tables.lock().unwrap();
        Ok(sorted_by_queue(
            tables
                .specs
                .iter()
                .filter(|s| s.cycle_id == cycle_id)
                .filter(|s| state.is_none_or(|state| s.state == state))
                .cloned()
                .collect(),
        ))
    }

    async fn claim_next_spec(
        &self,
        cycle_id: Uuid,
        server: &str,
    ) -> AppResult<Option<SpecExecution>> {
        let now = self.now();
        let next = self
            .list_spec_executions(cycle_id, Some(SpecState::OnQueue))
            .await?
            .into_iter()
            .next();
        let Some(next) = next else {
            return Ok(None);
        };

        let mut tables = self.tables.lock().unwrap();
        let spec = tables
            .specs
            .iter_mut()
            .find(|s| s.id == next.id)
            .ok_or_else(|| AppError::NotFound(format!("Spec execution {}", next.id)))?;
        spec.state = SpecState::Started;
        spec.server = Some(server.to_string());
        spec.start_at = Some(now);
        spec.update_at = now;
        Ok(Some(spec.clone()))
    }

    async fn update_spec_execution(&self, id: Uuid, patch: &SpecPatch) -> AppResult<SpecExecution> {
        let now = self.now();
        let mut tables = self.tables.lock().unwrap();
        let spec = tables
            .specs
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| AppError::NotFound(format!("Spec execution {}", id)))?;
        if let Some(state) = patch.state {
            spec.state = state;
        }
        if let Some(server) = &patch.server {
            spec.server = Some(server.clone());
        }
        if let Some(counts) = patch.counts {
            spec.counts = counts;
        }
        if let Some(duration) = patch.duration {
            spec.duration = duration;
        }
        if let Some(tests) = patch.tests {
            spec.tests = tests;
        }
        if patch.test_start_at.is_some() {
            spec.test_start_at = patch.test_start_at;
        }
        if patch.test_end_at.is_some() {
            spec.test_end_at = patch.test_end_at;
        }
        if patch.start_at.is_some() {
            spec.start_at = patch.start_at;
        }
        if patch.end_at.is_some() {
            spec.end_at = patch.end_at;
        }
        if let Some(last_execution) = &patch.last_execution {
            spec.last_execution = last_execution.clone();
        }
        spec.update_at = now;
        Ok(spec.clone())
    }

    async fn upsert_case_executions(&self, cases: &[CaseExecution]) -> AppResult<()> {
        let mut tables = self.tables.lock().unwrap();
        for case in cases {
            let existing = tables.cases.iter_mut().find(|c| {
                c.cycle_id == case.cycle_id
                    && c.spec_execution_id == case.spec_execution_id
                    && c.full_title == case.full_title
            });
            match existing {
                Some(existing) => {
                    let id = existing.id;
                    *existing = case.clone();
                    existing.id = id;
                }
                None => tables.cases.push(case.clone()),
            }
        }
        Ok(())
    }

    async fn list_case_executions(&self, cycle_id: Uuid) -> AppResult<Vec<CaseExecution>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .cases
            .iter()
            .filter(|c| c.cycle_id == cycle_id)
            .cloned()
            .collect())
    }

    async fn update_case_classification(
        &self,
        id: Uuid,
        state: CaseState,
        ticket: Option<&str>,
    ) -> AppResult<()> {
        let now = self.now();
        let mut tables = self.tables.lock().unwrap();
        let case = tables
            .cases
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| AppError::NotFound(format!("Case execution {}", id)))?;
        case.state = state;
        case.known_issue_ticket = ticket.map(str::to_string);
        case.update_at = now;
        Ok(())
    }

    async fn insert_known_issues(
        &self,
        cycle_id: Uuid,
        hash: &str,
        data: &[KnownIssueData],
    ) -> AppResult<bool> {
        let now = self.now();
        let mut tables = self.tables.lock().unwrap();
        if tables
            .known_issues
            .iter()
            .any(|k| k.cycle_id == cycle_id && k.hash == hash)
        {
            return Ok(false);
        }
        tables.known_issues.push(KnownIssueRecord {
            id: Uuid::now_v7(),
            cycle_id,
            hash: hash.to_string(),
            data: data.to_vec(),
            create_at: now,
        });
        Ok(true)
    }

    async fn list_known_issues(&self, cycle_id: Uuid) -> AppResult<Vec<KnownIssueRecord>> {
        let tables = self.tables.lock().unwrap();
        let mut records: Vec<KnownIssueRecord> = tables
            .known_issues
            .iter()
            .filter(|k| k.cycle_id == cycle_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.create_at.cmp(&a.create_at));
        Ok(records)
    }

    async fn case_history(
        &self,
        cycle_ids: &[Uuid],
        spec_file: &str,
        full_title: &str,
    ) -> AppResult<Vec<LastCaseExecution>> {
        self.history_guard()?;
        let tables = self.tables.lock().unwrap();
        let mut rows = Vec::new();
        for cycle in tables.cycles.iter().filter(|c| cycle_ids.contains(&c.id)) {
            for spec in tables
                .specs
                .iter()
                .filter(|s| s.cycle_id == cycle.id && s.file == spec_file)
            {
                for case in tables
                    .cases
                    .iter()
                    .filter(|c| c.spec_execution_id == spec.id && c.full_title == full_title)
                {
                    rows.push(LastCaseExecution {
                        id: case.id,
                        full_title: case.full_title.clone(),
                        state: case.state,
                        update_at: case.update_at,
                        spec_execution_id: spec.id,
                        spec_file: spec.file.clone(),
                        cycle_id: cycle.id,
                        repo: cycle.repo.clone(),
                        branch: cycle.branch.clone(),
                        build: cycle.build.clone(),
                        cycle_create_at: cycle.create_at,
                    });
                }
            }
        }
        rows.sort_by(|a, b| b.cycle_create_at.cmp(&a.cycle_create_at));
        Ok(rows)
    }

    async fn spec_history(
        &self,
        cycle_ids: &[Uuid],
        file: &str,
    ) -> AppResult<Vec<LastSpecExecution>> {
        self.history_guard()?;
        let tables = self.tables.lock().unwrap();
        let mut rows = Vec::new();
        for cycle in tables.cycles.iter().filter(|c| cycle_ids.contains(&c.id)) {
            for spec in tables.specs.iter().filter(|s| {
                s.cycle_id == cycle.id && s.file == file && s.state == SpecState::Done
            }) {
                rows.push(LastSpecExecution {
                    id: spec.id,
                    cycle_id: cycle.id,
                    counts: spec.counts,
                    update_at: spec.update_at,
                    repo: cycle.repo.clone(),
                    branch: cycle.branch.clone(),
                    build: cycle.build.clone(),
                    cycle_create_at: cycle.create_at,
                });
            }
        }
        rows.sort_by(|a, b| b.cycle_create_at.cmp(&a.cycle_create_at));
        Ok(rows)
    }

    async fn case_outcomes(&self, cycle_ids: &[Uuid]) -> AppResult<Vec<CaseOutcome>> {
        let tables = self.tables.lock().unwrap();
        let mut outcomes = Vec::new();
        for case in tables.cases.iter().filter(|c| cycle_ids.contains(&c.cycle_id)) {
            let Some(spec) = tables.specs.iter().find(|s| s.id == case.spec_execution_id) else {
                continue;
            };
            outcomes.push(CaseOutcome {
                cycle_id: case.cycle_id,
                spec_file: spec.file.clone(),
                full_title: case.full_title.clone(),
                raw_state: case.raw_state,
                state: case.state,
            });
        }
        Ok(outcomes)
    }
}
