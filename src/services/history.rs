//! Historical outcome window: prior outcomes of a case or spec in done cycles of
//! the same build family, most recent first.
//!
//! Lookups never fail. A history fetch error is logged and yields an empty window,
//! which the classifier treats as "no heuristic available".

use std::collections::HashSet;

use tracing::warn;
use uuid::Uuid;

use super::ExecutionStore;
use crate::models::{BuildFamily, LastCaseExecution, LastSpecExecution};

/// Candidate done cycles for one classification pass.
pub struct HistoryWindow<'s, S: ?Sized> {
    store: &'s S,
    cycle_ids: Vec<Uuid>,
}

impl<'s, S: ExecutionStore + ?Sized> HistoryWindow<'s, S> {
    /// Fetch the candidate cycles once.
    ///
    /// Fetches `2 * window` cycles so cycles in which the identity did not run can be skipped.
    pub async fn load(
        store: &'s S,
        family: &BuildFamily,
        exclude: Option<Uuid>,
        window: usize,
    ) -> Self {
        let cycle_ids = match store
            .recent_done_cycles(family, exclude, window.saturating_mul(2))
            .await
        {
            Ok(cycles) => cycles.into_iter().map(|c| c.id).collect(),
            Err(e) => {
                warn!(
                    repo = %family.repo,
                    branch = %family.branch,
                    build_suffix = %family.build_suffix,
                    "History lookup failed, classifying without history: {}",
                    e
                );
                Vec::new()
            }
        };

        Self { store, cycle_ids }
    }

    /// A window with no candidate cycles.
    pub fn empty(store: &'s S) -> Self {
        Self {
            store,
            cycle_ids: Vec::new(),
        }
    }

    /// Number of candidate cycles.
    pub fn candidates(&self) -> usize {
        self.cycle_ids.len()
    }

    /// Last `n` outcomes of a case, one per cycle, most recent first.
    pub async fn for_case(
        &self,
        spec_file: &str,
        full_title: &str,
        n: usize,
    ) -> Vec<LastCaseExecution> {
        if self.cycle_ids.is_empty() || n == 0 {
            return Vec::new();
        }

        match self
            .store
            .case_history(&self.cycle_ids, spec_file, full_title)
            .await
        {
            Ok(rows) => one_per_cycle(rows, |r| r.cycle_id, n),
            Err(e) => {
                warn!(
                    spec_file = %spec_file,
                    full_title = %full_title,
                    "Case history lookup failed: {}",
                    e
                );
                Vec::new()
            }
        }
    }

    /// Last `n` executions of a spec file, one per cycle, most recent first.
    pub async fn for_spec(&self, file: &str, n: usize) -> Vec<LastSpecExecution> {
        if self.cycle_ids.is_empty() || n == 0 {
            return Vec::new();
        }

        match self.store.spec_history(&self.cycle_ids, file).await {
            Ok(rows) => one_per_cycle(rows, |r| r.cycle_id, n),
            Err(e) => {
                warn!(file = %file, "Spec history lookup failed: {}", e);
                Vec::new()
            }
        }
    }
}

fn one_per_cycle<T>(rows: Vec<T>, cycle_of: impl Fn(&T) -> Uuid, n: usize) -> Vec<T> {
    let mut seen = HashSet::new();
    rows.into_iter()
        .filter(|row| seen.insert(cycle_of(row)))
        .take(n)
        .collect()
}
