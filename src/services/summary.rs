//! Display grouping of specs and cycles.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use super::is_live;
use crate::models::{
    Cycle, CycleGroup, CycleState, CycleSummary, SpecExecution, SpecGroup, SpecState,
};

/// Group of a spec for display.
pub fn spec_group(spec: &SpecExecution, window: Duration, now: DateTime<Utc>) -> SpecGroup {
    match spec.state {
        SpecState::Done if spec.counts.pass == spec.counts.total() => SpecGroup::Passed,
        SpecState::Done => SpecGroup::Failed,
        SpecState::Started if !is_live(spec.update_at, window, now) => SpecGroup::TimedOut,
        SpecState::Started => SpecGroup::Started,
        SpecState::OnQueue => SpecGroup::OnQueue,
    }
}

/// Number of specs per display group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SpecGroupCounts {
    pub passed: usize,
    pub failed: usize,
    pub started: usize,
    pub timed_out: usize,
    pub on_queue: usize,
}

impl SpecGroupCounts {
    pub fn record(&mut self, group: SpecGroup) {
        match group {
            SpecGroup::Passed => self.passed += 1,
            SpecGroup::Failed => self.failed += 1,
            SpecGroup::Started => self.started += 1,
            SpecGroup::TimedOut => self.timed_out += 1,
            SpecGroup::OnQueue => self.on_queue += 1,
        }
    }
}

/// Count the specs of a cycle per display group.
pub fn spec_group_counts(
    specs: &[SpecExecution],
    window: Duration,
    now: DateTime<Utc>,
) -> SpecGroupCounts {
    let mut counts = SpecGroupCounts::default();
    for spec in specs {
        counts.record(spec_group(spec, window, now));
    }
    counts
}

/// Group of a cycle for display.
pub fn cycle_group(cycle: &Cycle, window: Duration, now: DateTime<Utc>) -> CycleGroup {
    match cycle.state {
        CycleState::Done => CycleGroup::Done,
        CycleState::Started if !is_live(cycle.update_at, window, now) => CycleGroup::TimedOut,
        CycleState::Started => CycleGroup::Started,
        CycleState::OnQueue => CycleGroup::OnQueue,
    }
}

/// Totals and passing rate of a cycle.
pub fn cycle_summary(cycle: &Cycle, window: Duration, now: DateTime<Utc>) -> CycleSummary {
    let total_cases = cycle.counts.total();
    let passing_rate = if total_cases == 0 {
        0.0
    } else {
        let rate = f64::from(cycle.counts.pass) / f64::from(total_cases) * 100.0;
        (rate * 100.0).round() / 100.0
    };

    CycleSummary {
        group: cycle_group(cycle, window, now),
        total_cases,
        passing_rate,
        specs_registered: cycle.specs_registered,
        specs_done: cycle.specs_done,
    }
}
