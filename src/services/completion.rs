//! Finishing a spec execution: classify its cases, roll up the spec, then the cycle.
//!
//! Runs as one unit of work on the store it is given. API handlers pass a store over a
//! transaction and commit only when this returns `Ok`.

use std::collections::HashSet;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{
    ClassificationContext, ClassificationSource, ClassificationStrategy, ExecutionStore,
    HistoryWindow, HistoryWindowStrategy, KnownIssueIndex, completion_patch, refresh_cycle,
    tally_cases,
};
use crate::config::ClassificationConfig;
use crate::error::{AppError, AppResult};
use crate::models::{
    BuildFamily, CaseExecution, CaseResult, CaseState, Cycle, CycleState, SpecExecution,
    SpecResultReport, SpecState,
};

/// Updated aggregates after a spec finished.
#[derive(Debug, Clone, Serialize)]
pub struct SpecCompletion {
    pub cycle: Cycle,
    pub spec: SpecExecution,
    pub cases: Vec<CaseExecution>,
}

/// Record a spec's results and recompute its cycle.
pub async fn finish_spec_execution<S: ExecutionStore + ?Sized>(
    store: &S,
    config: &ClassificationConfig,
    spec_id: Uuid,
    report: &SpecResultReport,
) -> AppResult<SpecCompletion> {
    report.validate()?;

    let spec = store
        .get_spec_execution(spec_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Spec execution {}", spec_id)))?;

    if let Some(file) = report.file.as_deref()
        && file.trim() != spec.file
    {
        return Err(AppError::InvalidInput(format!(
            "spec execution {} is for '{}', not '{}'",
            spec_id, spec.file, file
        )));
    }

    let cycle = store
        .lock_cycle(spec.cycle_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Cycle {}", spec.cycle_id)))?;

    // Re-read under the cycle lock; a concurrent completion may have won.
    let spec = store
        .get_spec_execution(spec_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Spec execution {}", spec_id)))?;
    if spec.state == SpecState::Done {
        return Err(AppError::Conflict(format!(
            "spec execution {} is already done",
            spec_id
        )));
    }
    if cycle.state == CycleState::Done {
        return Err(AppError::Conflict(format!("cycle {} is already done", cycle.id)));
    }

    let now = Utc::now();
    let index = KnownIssueIndex::from_records(&store.list_known_issues(cycle.id).await?);
    let family = BuildFamily::of_build(
        &cycle.repo,
        &cycle.branch,
        &cycle.build,
        &config.default_build_suffix,
    );
    let history = HistoryWindow::load(
        store,
        &family,
        Some(cycle.id),
        config.last_x_run.max(config.spec_last_x_run),
    )
    .await;
    debug!(
        cycle_id = %cycle.id,
        candidates = history.candidates(),
        known_issues = index.len(),
        "Classifying spec {}",
        spec.file
    );

    let strategy = HistoryWindowStrategy::from_config(config);
    let mut seen = HashSet::new();
    let mut cases = Vec::with_capacity(report.tests.len());
    for result in &report.tests {
        let full_title = result.resolved_full_title();
        if full_title.trim().is_empty() {
            warn!(spec = %spec.file, "Skipping case without title");
            continue;
        }
        if !seen.insert(full_title.clone()) {
            warn!(spec = %spec.file, full_title = %full_title, "Skipping duplicate case");
            continue;
        }

        let case = classify_case(
            &strategy,
            &index,
            &history,
            config.last_x_run,
            &spec,
            result,
            full_title,
        )
        .await;
        cases.push(case);
    }

    let counts = tally_cases(&cases);
    let spec_history = history.for_spec(&spec.file, config.spec_last_x_run).await;
    let patch = completion_patch(report, counts, spec_history, now);
    patch.validate()?;

    store.upsert_case_executions(&cases).await?;
    let spec = store.update_spec_execution(spec.id, &patch).await?;
    info!(
        cycle_id = %cycle.id,
        spec = %spec.file,
        pass = counts.pass,
        fail = counts.fail,
        bug = counts.bug,
        known = counts.known,
        flaky = counts.flaky,
        "Spec done"
    );

    let cycle = refresh_cycle(store, &cycle, now).await?;

    Ok(SpecCompletion { cycle, spec, cases })
}

async fn classify_case<S: ExecutionStore + ?Sized>(
    strategy: &dyn ClassificationStrategy,
    index: &KnownIssueIndex,
    history: &HistoryWindow<'_, S>,
    window: usize,
    spec: &SpecExecution,
    result: &CaseResult,
    full_title: String,
) -> CaseExecution {
    let known_issue = index.classify(&spec.file, &full_title);

    let last_execution = if result.state == CaseState::Failed && known_issue.is_none() {
        history.for_case(&spec.file, &full_title, window).await
    } else {
        Vec::new()
    };
    let states: Vec<CaseState> = last_execution.iter().map(|l| l.state).collect();

    let classification = strategy.classify(
        result.state,
        &ClassificationContext {
            known_issue,
            history: &states,
        },
    );
    if classification.source != ClassificationSource::Unchanged {
        debug!(
            spec = %spec.file,
            full_title = %full_title,
            state = %classification.state,
            "Case reclassified"
        );
    }

    let now = Utc::now();
    CaseExecution {
        id: Uuid::now_v7(),
        cycle_id: spec.cycle_id,
        spec_execution_id: spec.id,
        title: result.title.clone(),
        full_title,
        key: result.key.clone(),
        key_step: result.key_step.clone(),
        raw_state: result.state,
        state: classification.state,
        known_issue_ticket: classification.ticket,
        duration: result.duration,
        diagnostics: result.diagnostics.clone(),
        last_execution,
        test_start_at: result.test_start_at,
        create_at: now,
        update_at: now,
    }
}
