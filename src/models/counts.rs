//! Per-state case counters shared by spec executions and cycles.

use serde::{Deserialize, Serialize};

use super::CaseState;
use crate::error::{AppError, AppResult};

/// Case counters, one per final case state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseCounts {
    pub pass: i32,
    pub fail: i32,
    pub bug: i32,
    pub known: i32,
    pub flaky: i32,
    pub pending: i32,
    pub skipped: i32,
}

impl CaseCounts {
    /// Count one case in its state's bucket.
    pub fn record(&mut self, state: CaseState) {
        match state {
            CaseState::Passed => self.pass += 1,
            CaseState::Failed => self.fail += 1,
            CaseState::Bug => self.bug += 1,
            CaseState::Known => self.known += 1,
            CaseState::Flaky => self.flaky += 1,
            CaseState::Pending => self.pending += 1,
            CaseState::Skipped => self.skipped += 1,
        }
    }

    /// Add another set of counters into this one.
    pub fn merge(&mut self, other: &CaseCounts) {
        self.pass += other.pass;
        self.fail += other.fail;
        self.bug += other.bug;
        self.known += other.known;
        self.flaky += other.flaky;
        self.pending += other.pending;
        self.skipped += other.skipped;
    }

    /// Counter value for a state.
    pub fn get(&self, state: CaseState) -> i32 {
        match state {
            CaseState::Passed => self.pass,
            CaseState::Failed => self.fail,
            CaseState::Bug => self.bug,
            CaseState::Known => self.known,
            CaseState::Flaky => self.flaky,
            CaseState::Pending => self.pending,
            CaseState::Skipped => self.skipped,
        }
    }

    /// Total number of counted cases.
    pub fn total(&self) -> i32 {
        self.pass + self.fail + self.bug + self.known + self.flaky + self.pending + self.skipped
    }

    /// Cases whose final state is a failure of any kind.
    pub fn failing(&self) -> i32 {
        self.fail + self.bug + self.known + self.flaky
    }

    /// Counters must never be negative.
    pub fn validate(&self) -> AppResult<()> {
        let fields = [
            ("pass", self.pass),
            ("fail", self.fail),
            ("bug", self.bug),
            ("known", self.known),
            ("flaky", self.flaky),
            ("pending", self.pending),
            ("skipped", self.skipped),
        ];
        for (name, value) in fields {
            if value < 0 {
                return Err(AppError::InvalidInput(format!(
                    "counter '{}' must not be negative (got {})",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

impl FromIterator<CaseState> for CaseCounts {
    fn from_iter<I: IntoIterator<Item = CaseState>>(iter: I) -> Self {
        let mut counts = CaseCounts::default();
        for state in iter {
            counts.record(state);
        }
        counts
    }
}
