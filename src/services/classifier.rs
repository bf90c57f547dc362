//! Case classification: decides the final state of a case reported as `failed`.
//!
//! Precedence, first match wins:
//! 1. a declared known issue for the case sets its type and ticket;
//! 2. the historical window, when non-empty:
//!    - every outcome in the window `passed`: the case just started failing and stays `failed`;
//!    - the most recent `R` outcomes all failing: `known`;
//!    - otherwise `flaky`;
//! 3. the case stays `failed`.
//!
//! Cases the runner reported as `passed`, `pending` or `skipped` are never reclassified.

use crate::config::ClassificationConfig;
use crate::models::CaseState;

use super::KnownIssueMatch;

/// Which rule produced a classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassificationSource {
    KnownIssue,
    History,
    Unchanged,
}

/// Final state of a case with its optional ticket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub state: CaseState,
    pub ticket: Option<String>,
    pub source: ClassificationSource,
}

impl Classification {
    fn unchanged(state: CaseState) -> Self {
        Self {
            state,
            ticket: None,
            source: ClassificationSource::Unchanged,
        }
    }
}

/// Inputs available when classifying one case.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClassificationContext<'a> {
    pub known_issue: Option<&'a KnownIssueMatch>,
    /// Prior final states of the case, most recent first.
    pub history: &'a [CaseState],
}

/// A classification scheme. Aggregation only depends on this trait.
pub trait ClassificationStrategy: Send + Sync {
    fn classify(&self, raw: CaseState, context: &ClassificationContext<'_>) -> Classification;
}

/// Known issues first, then the recent-outcome heuristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryWindowStrategy {
    /// Window size N.
    pub last_x_run: usize,
    /// Consecutive-failure look-back R.
    pub recent_consecutive: usize,
}

impl HistoryWindowStrategy {
    pub fn from_config(config: &ClassificationConfig) -> Self {
        Self {
            last_x_run: config.last_x_run,
            recent_consecutive: config.recent_consecutive,
        }
    }

    /// Heuristic verdict over a window, or `None` when it declines to reclassify.
    fn from_history(&self, history: &[CaseState]) -> Option<CaseState> {
        let window = &history[..history.len().min(self.last_x_run)];
        if window.is_empty() || window.iter().all(|s| *s == CaseState::Passed) {
            return None;
        }

        let recent = &window[..window.len().min(self.recent_consecutive)];
        if recent.iter().all(CaseState::is_failing) {
            Some(CaseState::Known)
        } else {
            Some(CaseState::Flaky)
        }
    }
}

impl Default for HistoryWindowStrategy {
    fn default() -> Self {
        Self::from_config(&ClassificationConfig::default())
    }
}

impl ClassificationStrategy for HistoryWindowStrategy {
    fn classify(&self, raw: CaseState, context: &ClassificationContext<'_>) -> Classification {
        if raw != CaseState::Failed {
            return Classification::unchanged(raw);
        }

        if let Some(issue) = context.known_issue {
            return Classification {
                state: issue.issue_type.case_state(),
                ticket: issue.ticket.clone(),
                source: ClassificationSource::KnownIssue,
            };
        }

        match self.from_history(context.history) {
            Some(state) => Classification {
                state,
                ticket: None,
                source: ClassificationSource::History,
            },
            None => Classification::unchanged(raw),
        }
    }
}
