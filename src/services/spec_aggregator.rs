//! Per-spec rollup of classified cases.
//!
//! Precondition: a spec is completed once. Rejecting repeated completions is the
//! caller's job (see `completion::finish_spec_execution`).

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::models::{
    CaseCounts, CaseExecution, LastSpecExecution, SpecPatch, SpecResultReport, SpecState,
};

/// Tally final case states. Cases without an identity are skipped.
pub fn tally_cases<'a>(cases: impl IntoIterator<Item = &'a CaseExecution>) -> CaseCounts {
    let mut counts = CaseCounts::default();
    for case in cases {
        if !case.has_identity() {
            warn!(case_id = %case.id, "Case without title not counted");
            continue;
        }
        counts.record(case.state);
    }
    counts
}

/// Patch that marks a spec done with its recomputed counters.
pub fn completion_patch(
    report: &SpecResultReport,
    counts: CaseCounts,
    history: Vec<LastSpecExecution>,
    now: DateTime<Utc>,
) -> SpecPatch {
    SpecPatch {
        state: Some(SpecState::Done),
        counts: Some(counts),
        duration: Some(report.duration),
        tests: Some(counts.total()),
        test_start_at: report.test_start_at,
        test_end_at: report.test_end_at,
        end_at: Some(now),
        last_execution: Some(history),
        ..SpecPatch::default()
    }
}
