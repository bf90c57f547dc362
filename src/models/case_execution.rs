//! Case execution models: one test within a spec within a cycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Maximum length accepted for diagnostic text fields.
const MAX_DIAGNOSTIC_LEN: usize = 5000;

/// Maximum length of `key` / `key_step`.
const MAX_KEY_LEN: usize = 50;

/// Separator used to join a case's title breadcrumb into its full title.
pub const TITLE_SEPARATOR: &str = " > ";

/// State of a case execution.
///
/// The runner only reports `passed`, `failed`, `pending` and `skipped`; the
/// remaining variants are produced by classification of a `failed` case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseState {
    Passed,
    Failed,
    Bug,
    Known,
    Flaky,
    Pending,
    Skipped,
}

impl CaseState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Bug => "bug",
            Self::Known => "known",
            Self::Flaky => "flaky",
            Self::Pending => "pending",
            Self::Skipped => "skipped",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "passed" => Some(Self::Passed),
            "failed" => Some(Self::Failed),
            "bug" => Some(Self::Bug),
            "known" => Some(Self::Known),
            "flaky" => Some(Self::Flaky),
            "pending" => Some(Self::Pending),
            "skipped" => Some(Self::Skipped),
            _ => None,
        }
    }

    /// True for every state that represents a failing run, classified or not.
    pub fn is_failing(&self) -> bool {
        matches!(self, Self::Failed | Self::Bug | Self::Known | Self::Flaky)
    }

    /// True for the states a test runner may report.
    pub fn is_runner_state(&self) -> bool {
        matches!(
            self,
            Self::Passed | Self::Failed | Self::Pending | Self::Skipped
        )
    }
}

impl std::fmt::Display for CaseState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Screenshot descriptor attached to a failed case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Screenshot {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub taken_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub height: i32,
    #[serde(default)]
    pub width: i32,
}

/// Opaque diagnostic payload; never consulted by classification.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CaseDiagnostics {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_display: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_frame: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<Screenshot>,
}

/// A prior outcome of the same case in an earlier done cycle of the same build family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LastCaseExecution {
    pub id: Uuid,
    pub full_title: String,
    pub state: CaseState,
    pub update_at: DateTime<Utc>,
    pub spec_execution_id: Uuid,
    pub spec_file: String,
    pub cycle_id: Uuid,
    pub repo: String,
    pub branch: String,
    pub build: String,
    pub cycle_create_at: DateTime<Utc>,
}

/// A recorded case execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseExecution {
    pub id: Uuid,
    pub cycle_id: Uuid,
    pub spec_execution_id: Uuid,
    pub title: Vec<String>,
    pub full_title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_step: Option<String>,
    /// State as reported by the runner.
    pub raw_state: CaseState,
    /// Final state after classification.
    pub state: CaseState,
    /// Ticket of the known issue that classified this case, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub known_issue_ticket: Option<String>,
    pub duration: i64,
    #[serde(flatten)]
    pub diagnostics: CaseDiagnostics,
    /// History window consulted while classifying, kept for auditing.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub last_execution: Vec<LastCaseExecution>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_start_at: Option<DateTime<Utc>>,
    pub create_at: DateTime<Utc>,
    pub update_at: DateTime<Utc>,
}

impl CaseExecution {
    /// A case without a title has no identity and is never counted.
    pub fn has_identity(&self) -> bool {
        !self.full_title.trim().is_empty()
    }
}

/// Join a title breadcrumb into a full title.
pub fn full_title_of(title: &[String]) -> String {
    title.join(TITLE_SEPARATOR)
}

/// A single test result as reported by a runner at spec completion.
#[derive(Debug, Clone, Deserialize)]
pub struct CaseResult {
    #[serde(default)]
    pub title: Vec<String>,
    /// Optional; derived from `title` when absent.
    #[serde(default)]
    pub full_title: Option<String>,
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub key_step: Option<String>,
    pub state: CaseState,
    #[serde(default)]
    pub duration: i64,
    #[serde(flatten)]
    pub diagnostics: CaseDiagnostics,
    #[serde(default)]
    pub test_start_at: Option<DateTime<Utc>>,
}

impl CaseResult {
    /// Full title used as the case identity; empty when the case has none.
    pub fn resolved_full_title(&self) -> String {
        match &self.full_title {
            Some(full_title) if !full_title.trim().is_empty() => full_title.trim().to_string(),
            _ => full_title_of(&self.title),
        }
    }

    /// Validate the result before anything is written.
    pub fn validate(&self) -> AppResult<()> {
        if !self.state.is_runner_state() {
            return Err(AppError::InvalidInput(format!(
                "case state '{}' cannot be reported by a runner",
                self.state
            )));
        }
        if self.duration < 0 {
            return Err(AppError::InvalidInput(
                "case duration must not be negative".to_string(),
            ));
        }
        for (field, value) in [("key", &self.key), ("key_step", &self.key_step)] {
            if value.as_ref().is_some_and(|v| v.len() > MAX_KEY_LEN) {
                return Err(AppError::InvalidInput(format!(
                    "case {} exceeds {} characters",
                    field, MAX_KEY_LEN
                )));
            }
        }
        for (field, value) in [
            ("code", &self.diagnostics.code),
            ("error_display", &self.diagnostics.error_display),
            ("error_frame", &self.diagnostics.error_frame),
        ] {
            if value.as_ref().is_some_and(|v| v.len() > MAX_DIAGNOSTIC_LEN) {
                return Err(AppError::InvalidInput(format!(
                    "case {} exceeds {} characters",
                    field, MAX_DIAGNOSTIC_LEN
                )));
            }
        }
        Ok(())
    }
}
