//! Cycle models: one execution of a full test suite against a repo/branch/build.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{CaseCounts, SpecFile};
use crate::error::{AppError, AppResult};

/// Maximum length of repo, branch and build strings.
const MAX_IDENT_LEN: usize = 255;

/// Persisted lifecycle state of a cycle. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleState {
    /// Registered; no spec has started.
    OnQueue,
    /// At least one spec has started.
    Started,
    /// Every registered spec is done. Terminal.
    Done,
}

impl CycleState {
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

    /// Whether moving to `next` is a forward transition.
    pub fn can_transition_to(&self, next: CycleState) -> bool {
        next > *self
    }
}

impl std::fmt::Display for CycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Display grouping of a cycle; `TimedOut` is derived from liveness and never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleGroup {
    OnQueue,
    Started,
    TimedOut,
    Done,
}

/// Runner environment of a cycle. Opaque passthrough.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleEnvironment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cypress_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub browser_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub browser_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headless: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_version: Option<String>,
}

/// A cycle record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cycle {
    pub id: Uuid,
    pub repo: String,
    pub branch: String,
    pub build: String,
    pub state: CycleState,
    pub specs_registered: i32,
    pub specs_done: i32,
    pub duration: i64,
    #[serde(flatten)]
    pub counts: CaseCounts,
    #[serde(flatten)]
    pub environment: CycleEnvironment,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_at: Option<DateTime<Utc>>,
    pub create_at: DateTime<Utc>,
    pub update_at: DateTime<Utc>,
}

/// Request to register a new cycle and its spec files.
#[derive(Debug, Clone, Deserialize)]
pub struct StartCycleRequest {
    pub repo: String,
    pub branch: String,
    pub build: String,
    #[serde(default)]
    pub files: Vec<SpecFile>,
    #[serde(default, flatten)]
    pub environment: CycleEnvironment,
}

impl StartCycleRequest {
    pub fn validate(&self) -> AppResult<()> {
        for (field, value) in [
            ("repo", &self.repo),
            ("branch", &self.branch),
            ("build", &self.build),
        ] {
            let value = value.trim();
            if value.is_empty() {
                return Err(AppError::InvalidInput(format!("{} is required", field)));
            }
            if value.len() > MAX_IDENT_LEN {
                return Err(AppError::InvalidInput(format!(
                    "{} exceeds {} characters",
                    field, MAX_IDENT_LEN
                )));
            }
        }

        let mut seen = std::collections::HashSet::new();
        for file in &self.files {
            file.validate()?;
            if !seen.insert(file.file.trim()) {
                return Err(AppError::InvalidInput(format!(
                    "spec file '{}' is registered twice",
                    file.file
                )));
            }
        }

        Ok(())
    }
}

/// Values for a new cycle row.
#[derive(Debug, Clone, PartialEq)]
pub struct NewCycle {
    pub repo: String,
    pub branch: String,
    pub build: String,
    pub specs_registered: i32,
    pub environment: CycleEnvironment,
}

/// Changes written to a cycle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CyclePatch {
    pub state: Option<CycleState>,
    pub specs_done: Option<i32>,
    pub duration: Option<i64>,
    pub counts: Option<CaseCounts>,
    pub start_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,
}

impl CyclePatch {
    /// Reject patches that break the cycle's invariants.
    pub fn validate(&self, cycle: &Cycle) -> AppResult<()> {
        if let Some(counts) = &self.counts {
            counts.validate()?;
        }
        if let Some(specs_done) = self.specs_done
            && (specs_done < 0 || specs_done > cycle.specs_registered)
        {
            return Err(AppError::InvalidInput(format!(
                "specs_done {} must be between 0 and specs_registered {}",
                specs_done, cycle.specs_registered
            )));
        }
        if self.duration.is_some_and(|d| d < 0) {
            return Err(AppError::InvalidInput(
                "cycle duration must not be negative".to_string(),
            ));
        }
        if let Some(state) = self.state
            && !cycle.state.can_transition_to(state)
        {
            return Err(AppError::Conflict(format!(
                "cycle {} cannot move from {} to {}",
                cycle.id, cycle.state, state
            )));
        }
        Ok(())
    }

    /// True when the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        *self == CyclePatch::default()
    }
}

/// Aggregated view of a cycle for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CycleSummary {
    pub group: CycleGroup,
    pub total_cases: i32,
    /// Percentage of cases that passed, two decimals.
    pub passing_rate: f64,
    pub specs_registered: i32,
    pub specs_done: i32,
}
