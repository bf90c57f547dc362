//! Lookup of declared known issues by spec file and full case title.

use std::collections::HashMap;

use crate::models::{KnownIssueData, KnownIssueRecord, KnownIssueType};

/// A known issue matching one case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnownIssueMatch {
    pub issue_type: KnownIssueType,
    pub ticket: Option<String>,
}

/// Known issues keyed by spec file, then by full case title.
#[derive(Debug, Clone, Default)]
pub struct KnownIssueIndex {
    by_spec: HashMap<String, HashMap<String, KnownIssueMatch>>,
}

impl KnownIssueIndex {
    /// Build an index; a later declaration of the same case replaces an earlier one,
    /// except that a ticketless declaration keeps the earlier ticket.
    pub fn new(entries: &[KnownIssueData]) -> Self {
        let mut index = Self::default();
        index.extend(entries);
        index
    }

    /// Build an index from stored payloads given newest first; newer payloads win.
    pub fn from_records(records: &[KnownIssueRecord]) -> Self {
        let mut index = Self::default();
        for record in records.iter().rev() {
            index.extend(&record.data);
        }
        index
    }

    fn extend(&mut self, entries: &[KnownIssueData]) {
        for entry in entries {
            let cases = self.by_spec.entry(entry.spec_file.clone()).or_default();
            for case in &entry.cases {
                let ticket = case
                    .ticket
                    .clone()
                    .or_else(|| cases.get(&case.title).and_then(|m| m.ticket.clone()));
                cases.insert(
                    case.title.clone(),
                    KnownIssueMatch {
                        issue_type: case.issue_type,
                        ticket,
                    },
                );
            }
        }
    }

    /// Known issue declared for a case, if any.
    pub fn classify(&self, spec_file: &str, full_title: &str) -> Option<&KnownIssueMatch> {
        self.by_spec.get(spec_file)?.get(full_title)
    }

    /// Number of declared cases.
    pub fn len(&self) -> usize {
        self.by_spec.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
