//! Spec execution models: one spec file's run within a cycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{CaseCounts, CaseExecution, CaseResult};
use crate::error::{AppError, AppResult};

/// Maximum length of a spec file path.
const MAX_FILE_LEN: usize = 255;

/// Persisted lifecycle state of a spec execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpecState {
    /// Registered, not yet claimed by a worker.
    OnQueue,
    /// Claimed by a worker.
    Started,
    /// The runner reported results. Terminal.
    Done,
}

impl SpecState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OnQueue => "on_queue",
            Self::Started => "started",
            Self::Done => "done",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "on_queue" => Some(Self::OnQueue),
            "started" => Some(Self::Started),
            "done" => Some(Self::Done),
            _ => None,
        }
    }
}

impl std::fmt::Display for SpecState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Display grouping of a spec; derived at read time, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpecGroup {
    Passed,
    Failed,
    Started,
    TimedOut,
    OnQueue,
}

/// Counters of a prior execution of the same spec file in the same build family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LastSpecExecution {
    pub id: Uuid,
    pub cycle_id: Uuid,
    #[serde(flatten)]
    pub counts: CaseCounts,
    pub update_at: DateTime<Utc>,
    pub repo: String,
    pub branch: String,
    pub build: String,
    pub cycle_create_at: DateTime<Utc>,
}

/// A spec execution record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecExecution {
    pub id: Uuid,
    pub cycle_id: Uuid,
    pub file: String,
    /// Worker that claimed the spec.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server: Option<String>,
    pub state: SpecState,
    #[serde(flatten)]
    pub counts: CaseCounts,
    pub duration: i64,
    pub tests: i32,
    pub sort_weight: i32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub last_execution: Vec<LastSpecExecution>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_start_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_end_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_at: Option<DateTime<Utc>>,
    pub create_at: DateTime<Utc>,
    pub update_at: DateTime<Utc>,
}

/// A spec execution together with its recorded cases.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpecWithCases {
    #[serde(flatten)]
    pub spec: SpecExecution,
    pub cases: Vec<CaseExecution>,
}

/// Spec file registered with a new cycle.
#[derive(Debug, Clone, Deserialize)]
pub struct SpecFile {
    pub file: String,
    #[serde(default, alias = "sortWeight")]
    pub sort_weight: i32,
}

impl SpecFile {
    pub fn validate(&self) -> AppResult<()> {
        let file = self.file.trim();
        if file.is_empty() {
            return Err(AppError::InvalidInput("spec file is required".to_string()));
        }
        if file.len() > MAX_FILE_LEN {
            return Err(AppError::InvalidInput(format!(
                "spec file exceeds {} characters",
                MAX_FILE_LEN
            )));
        }
        if self.sort_weight < 0 {
            return Err(AppError::InvalidInput(
                "sort_weight must not be negative".to_string(),
            ));
        }
        Ok(())
    }
}

/// Results reported by a runner when a spec finishes.
#[derive(Debug, Clone, Deserialize)]
pub struct SpecResultReport {
    /// When present, must match the stored spec file.
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub duration: i64,
    #[serde(default)]
    pub test_start_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub test_end_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub tests: Vec<CaseResult>,
}

impl SpecResultReport {
    /// Validate the report and every case in it.
    pub fn validate(&self) -> AppResult<()> {
        if self.duration < 0 {
            return Err(AppError::InvalidInput(
                "spec duration must not be negative".to_string(),
            ));
        }
        if let (Some(start), Some(end)) = (self.test_start_at, self.test_end_at)
            && end < start
        {
            return Err(AppError::InvalidInput(
                "test_end_at must not precede test_start_at".to_string(),
            ));
        }
        self.tests.iter().try_for_each(CaseResult::validate)
    }
}

/// Changes written to a spec execution.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpecPatch {
    pub state: Option<SpecState>,
    pub server: Option<String>,
    pub counts: Option<CaseCounts>,
    pub duration: Option<i64>,
    pub tests: Option<i32>,
    pub test_start_at: Option<DateTime<Utc>>,
    pub test_end_at: Option<DateTime<Utc>>,
    pub start_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,
    pub last_execution: Option<Vec<LastSpecExecution>>,
}

impl SpecPatch {
    /// Reject patches that would store invalid values.
    pub fn validate(&self) -> AppResult<()> {
        if let Some(counts) = &self.counts {
            counts.validate()?;
        }
        if self.duration.is_some_and(|d| d < 0) {
            return Err(AppError::InvalidInput(
                "spec duration must not be negative".to_string(),
            ));
        }
        if self.tests.is_some_and(|t| t < 0) {
            return Err(AppError::InvalidInput(
                "spec tests must not be negative".to_string(),
            ));
        }
        Ok(())
    }
}
