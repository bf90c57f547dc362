//! Unstable test report models.

use serde::Serialize;
use uuid::Uuid;

use super::{CaseState, KnownIssueType};

/// One stored case outcome, flattened with its spec file.
#[derive(Debug, Clone, PartialEq)]
pub struct CaseOutcome {
    pub cycle_id: Uuid,
    pub spec_file: String,
    pub full_title: String,
    pub raw_state: CaseState,
    pub state: CaseState,
}

/// How an unstable case is tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnstableCaseType {
    Bug,
    Known,
    Flaky,
    /// Not declared as a known issue; someone has to look at it.
    RequireVerification,
}

impl From<KnownIssueType> for UnstableCaseType {
    fn from(issue_type: KnownIssueType) -> Self {
        match issue_type {
            KnownIssueType::Bug => Self::Bug,
            KnownIssueType::Known => Self::Known,
            KnownIssueType::Flaky => Self::Flaky,
        }
    }
}

/// A case that failed at least once in the inspected cycles.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnstableCase {
    pub title: String,
    #[serde(rename = "type")]
    pub case_type: UnstableCaseType,
    pub is_known: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticket: Option<String>,
    /// Final state per inspected cycle, most recent first; `None` where the case did not run.
    pub recent_run: Vec<Option<CaseState>>,
}

/// Unstable cases of one spec file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnstableSpec {
    pub spec_file: String,
    pub cases: Vec<UnstableCase>,
}
