//! Cycle rollup and lifecycle transitions.
//!
//! Every recompute re-derives the cycle's counters from all of its specs, so running it
//! again over the same data yields the same patch. `done` is entered once: a cycle that is
//! already done never gets a state change back.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

use super::{ExecutionStore, tally_cases};
use crate::error::AppResult;
use crate::models::{
    CaseCounts, CaseExecution, Cycle, CyclePatch, CycleState, SpecState, SpecWithCases,
};

/// Whether a spec counts toward `specs_done`.
///
/// A spec with recorded cases counts; so does a done spec whose runner reported no tests.
fn counts_as_done(spec: &SpecWithCases) -> bool {
    !spec.cases.is_empty() || (spec.spec.state == SpecState::Done && spec.spec.tests == 0)
}

/// Re-derive a cycle's counters and lifecycle state from its specs.
pub fn recompute_cycle(cycle: &Cycle, specs: &[SpecWithCases], now: DateTime<Utc>) -> CyclePatch {
    let mut specs_done = 0;
    let mut duration = 0;
    let mut counts = CaseCounts::default();

    for spec in specs {
        duration += spec.spec.duration;

        if !counts_as_done(spec) {
            continue;
        }

        specs_done += 1;
        counts.merge(&tally_cases(&spec.cases));
    }

    let mut patch = CyclePatch {
        specs_done: Some(specs_done),
        duration: Some(duration),
        counts: Some(counts),
        ..CyclePatch::default()
    };

    match cycle.state {
        CycleState::Done => {}
        _ if specs_done == cycle.specs_registered => {
            patch.state = Some(CycleState::Done);
            patch.end_at = Some(now);
            if cycle.start_at.is_none() {
                patch.start_at = Some(now);
            }
        }
        CycleState::OnQueue if specs_done > 0 => {
            patch.state = Some(CycleState::Started);
            patch.start_at = Some(now);
        }
        _ => {}
    }

    patch
}

/// Specs of a cycle with their recorded cases, optionally filtered by spec state.
pub async fn specs_with_cases<S: ExecutionStore + ?Sized>(
    store: &S,
    cycle_id: Uuid,
    state: Option<SpecState>,
) -> AppResult<Vec<SpecWithCases>> {
    let specs = store.list_spec_executions(cycle_id, state).await?;

    let mut cases_by_spec: HashMap<Uuid, Vec<CaseExecution>> = HashMap::new();
    for case in store.list_case_executions(cycle_id).await? {
        cases_by_spec
            .entry(case.spec_execution_id)
            .or_default()
            .push(case);
    }

    Ok(specs
        .into_iter()
        .map(|spec| {
            let cases = cases_by_spec.remove(&spec.id).unwrap_or_default();
            SpecWithCases { spec, cases }
        })
        .collect())
}

/// Recompute a cycle from its done specs and store the result.
///
/// The caller holds the cycle lock for the surrounding unit of work.
pub async fn refresh_cycle<S: ExecutionStore + ?Sized>(
    store: &S,
    cycle: &Cycle,
    now: DateTime<Utc>,
) -> AppResult<Cycle> {
    let specs = specs_with_cases(store, cycle.id, Some(SpecState::Done)).await?;
    let patch = recompute_cycle(cycle, &specs, now);
    patch.validate(cycle)?;

    let updated = store.update_cycle(cycle.id, &patch).await?;

    match patch.state {
        Some(CycleState::Done) => info!(
            cycle_id = %cycle.id,
            specs_done = updated.specs_done,
            "Cycle done"
        ),
        Some(CycleState::Started) => info!(cycle_id = %cycle.id, "Cycle started"),
        _ => {}
    }

    Ok(updated)
}
