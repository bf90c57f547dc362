//! Known issue models: manually curated expected failures.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::CaseState;
use crate::error::{AppError, AppResult};

/// Prefix every bug ticket must carry.
const TICKET_PREFIX: &str = "MM-";

/// Type of a declared known issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KnownIssueType {
    /// Product defect tracked by a ticket.
    Bug,
    /// Consistently failing test without a filed bug.
    Known,
    /// Intermittently failing test.
    Flaky,
}

impl KnownIssueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bug => "bug",
            Self::Known => "known",
            Self::Flaky => "flaky",
        }
    }

    /// Final case state a matching failed case is given.
    pub fn case_state(&self) -> CaseState {
        match self {
            Self::Bug => CaseState::Bug,
            Self::Known => CaseState::Known,
            Self::Flaky => CaseState::Flaky,
        }
    }
}

/// One declared case within a known-issue entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnownIssueCase {
    /// Full title of the case (breadcrumb joined with " > ").
    pub title: String,
    #[serde(rename = "type")]
    pub issue_type: KnownIssueType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticket: Option<String>,
}

/// Known issues declared for one spec file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnownIssueData {
    pub spec_file: String,
    pub cases: Vec<KnownIssueCase>,
}

impl KnownIssueData {
    /// Validate an entry; bug cases require an `MM-<number>` ticket.
    pub fn validate(&self, index: usize) -> AppResult<()> {
        if self.spec_file.trim().is_empty() {
            return Err(AppError::InvalidInput(format!(
                "known issue [{}]: spec_file is required",
                index
            )));
        }

        for (i, case) in self.cases.iter().enumerate() {
            if case.title.trim().is_empty() {
                return Err(AppError::InvalidInput(format!(
                    "known issue [{}] cases[{}]: title is required",
                    index, i
                )));
            }

            if case.issue_type == KnownIssueType::Bug {
                match case.ticket.as_deref() {
                    None => {
                        return Err(AppError::InvalidInput(format!(
                            "known issue [{}] cases[{}]: ticket is required for bug",
                            index, i
                        )));
                    }
                    Some(ticket) if !is_valid_ticket(ticket) => {
                        return Err(AppError::InvalidInput(format!(
                            "known issue [{}] cases[{}]: ticket '{}' must match {}<number>",
                            index, i, ticket, TICKET_PREFIX
                        )));
                    }
                    Some(_) => {}
                }
            }
        }

        Ok(())
    }
}

/// Validate a full known-issue payload.
pub fn validate_known_issues(data: &[KnownIssueData]) -> AppResult<()> {
    data.iter()
        .enumerate()
        .try_for_each(|(index, entry)| entry.validate(index))
}

/// Content hash of a known-issue payload (SHA-256 of its JSON, hex encoded).
pub fn known_issue_hash(data: &[KnownIssueData]) -> AppResult<String> {
    let json = serde_json::to_vec(data)?;
    let mut hasher = Sha256::new();
    hasher.update(&json);
    Ok(hex::encode(hasher.finalize()))
}

fn is_valid_ticket(ticket: &str) -> bool {
    ticket
        .strip_prefix(TICKET_PREFIX)
        .and_then(|rest| rest.chars().next())
        .is_some_and(|c| c.is_ascii_digit())
}

/// A stored known-issue payload for a cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnownIssueRecord {
    pub id: Uuid,
    pub cycle_id: Uuid,
    pub hash: String,
    pub data: Vec<KnownIssueData>,
    pub create_at: DateTime<Utc>,
}
