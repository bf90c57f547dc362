//! Unstable test report: cases of a build family that failed in any recent done cycle.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use super::{ExecutionStore, KnownIssueIndex, load_known_issues};
use crate::error::AppResult;
use crate::models::{
    BuildFamily, CaseOutcome, CaseState, Cycle, UnstableCase, UnstableCaseType, UnstableSpec,
};

/// Cycles inspected when the caller does not ask for a number.
pub const DEFAULT_UNSTABLE_CYCLES: usize = 5;

/// Upper bound on inspected cycles.
pub const MAX_UNSTABLE_CYCLES: usize = 5;

#[derive(Debug, Clone, Serialize)]
pub struct UnstableReport {
    /// Inspected cycles, most recent first; `recent_run` rows follow this order.
    pub cycles: Vec<Cycle>,
    /// Number of unstable cases.
    pub total: usize,
    pub unstable_specs: Vec<UnstableSpec>,
}

/// Build the unstable test report for a build family.
///
/// `limit` is clamped to `1..=MAX_UNSTABLE_CYCLES`.
pub async fn unstable_tests<S: ExecutionStore + ?Sized>(
    store: &S,
    known_issue_dir: &Path,
    family: &BuildFamily,
    limit: Option<usize>,
) -> AppResult<UnstableReport> {
    let limit = limit
        .unwrap_or(DEFAULT_UNSTABLE_CYCLES)
        .clamp(1, MAX_UNSTABLE_CYCLES);

    let cycles = store.recent_done_cycles(family, None, limit).await?;
    if cycles.is_empty() {
        return Ok(UnstableReport {
            cycles,
            total: 0,
            unstable_specs: Vec::new(),
        });
    }

    let cycle_ids: Vec<Uuid> = cycles.iter().map(|c| c.id).collect();
    let outcomes = store.case_outcomes(&cycle_ids).await?;
    let declared = load_known_issues(known_issue_dir, &family.build_suffix).await?;
    let index = KnownIssueIndex::new(&declared);

    let unstable_specs = collect_unstable(&cycle_ids, outcomes, &index);
    let total = unstable_specs.iter().map(|s| s.cases.len()).sum();
    debug!(
        repo = %family.repo,
        branch = %family.branch,
        build_suffix = %family.build_suffix,
        cycles = cycles.len(),
        total,
        "Unstable report built"
    );

    Ok(UnstableReport {
        cycles,
        total,
        unstable_specs,
    })
}

/// Group outcomes per spec file and case, keeping cases whose runner reported a failure
/// in at least one cycle. Specs and cases come out sorted by name.
fn collect_unstable(
    cycle_ids: &[Uuid],
    outcomes: Vec<CaseOutcome>,
    index: &KnownIssueIndex,
) -> Vec<UnstableSpec> {
    let position: HashMap<Uuid, usize> = cycle_ids
        .iter()
        .enumerate()
        .map(|(i, id)| (*id, i))
        .collect();

    let mut by_spec: BTreeMap<String, BTreeMap<String, (bool, Vec<Option<CaseState>>)>> =
        BTreeMap::new();
    for outcome in outcomes {
        let Some(&i) = position.get(&outcome.cycle_id) else {
            continue;
        };
        let (failed, row) = by_spec
            .entry(outcome.spec_file)
            .or_default()
            .entry(outcome.full_title)
            .or_insert_with(|| (false, vec![None; cycle_ids.len()]));
        *failed |= outcome.raw_state == CaseState::Failed;
        row[i] = Some(outcome.state);
    }

    by_spec
        .into_iter()
        .filter_map(|(spec_file, cases)| {
            let cases: Vec<UnstableCase> = cases
                .into_iter()
                .filter(|(_, (failed, _))| *failed)
                .map(|(title, (_, recent_run))| {
                    let known = index.classify(&spec_file, &title);
                    UnstableCase {
                        case_type: known.map_or(UnstableCaseType::RequireVerification, |k| {
                            k.issue_type.into()
                        }),
                        is_known: known.is_some(),
                        ticket: known.and_then(|k| k.ticket.clone()),
                        title,
                        recent_run,
                    }
                })
                .collect();
            (!cases.is_empty()).then_some(UnstableSpec { spec_file, cases })
        })
        .collect()
}
