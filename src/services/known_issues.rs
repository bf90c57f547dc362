//! Applying a cycle's known issues to its recorded cases.

use std::collections::HashMap;
use std::path::Path;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use super::{ExecutionStore, KnownIssueIndex, load_known_issues, refresh_cycle, specs_with_cases};
use crate::config::ClassificationConfig;
use crate::error::{AppError, AppResult};
use crate::models::{
    BuildInfo, CaseCounts, CaseState, Cycle, CycleState, KnownIssueData, SpecPatch, SpecState,
    known_issue_hash,
};

/// How the caller identifies the cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleSelector {
    Id(Uuid),
    /// Newest cycle with this build string.
    Build(String),
}

/// Store a payload for a cycle unless the same content is already stored.
///
/// Returns whether a new payload was stored.
pub async fn save_known_issues<S: ExecutionStore + ?Sized>(
    store: &S,
    cycle_id: Uuid,
    data: &[KnownIssueData],
) -> AppResult<bool> {
    if data.is_empty() {
        return Ok(false);
    }

    let hash = known_issue_hash(data)?;
    let inserted = store.insert_known_issues(cycle_id, &hash, data).await?;
    if inserted {
        info!(cycle_id = %cycle_id, hash = %hash, "Known issues stored");
    } else {
        info!(cycle_id = %cycle_id, hash = %hash, "Known issues already stored");
    }
    Ok(inserted)
}

/// Load the build family's known issues, store them for the cycle, reclassify its failed
/// cases and recompute the spec and cycle counters.
pub async fn apply_known_issues<S: ExecutionStore + ?Sized>(
    store: &S,
    config: &ClassificationConfig,
    known_issue_dir: &Path,
    selector: &CycleSelector,
) -> AppResult<Cycle> {
    let found = match selector {
        CycleSelector::Id(id) => store.get_cycle(*id).await?,
        CycleSelector::Build(build) => store.find_cycle_by_build(build).await?,
    };
    let found = found.ok_or_else(|| AppError::NotFound("Cycle".to_string()))?;
    let cycle = store
        .lock_cycle(found.id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Cycle {}", found.id)))?;

    let build_suffix = BuildInfo::suffix_or(&cycle.build, &config.default_build_suffix);
    let data = load_known_issues(known_issue_dir, &build_suffix).await?;
    save_known_issues(store, cycle.id, &data).await?;

    let index = KnownIssueIndex::from_records(&store.list_known_issues(cycle.id).await?);

    let specs = specs_with_cases(store, cycle.id, None).await?;
    let mut reclassified = 0;
    for spec in specs {
        let mut states: HashMap<Uuid, CaseState> = HashMap::new();
        for case in &spec.cases {
            states.insert(case.id, case.state);
            if case.raw_state != CaseState::Failed {
                continue;
            }
            let Some(issue) = index.classify(&spec.spec.file, &case.full_title) else {
                continue;
            };

            let state = issue.issue_type.case_state();
            if state != case.state || issue.ticket != case.known_issue_ticket {
                store
                    .update_case_classification(case.id, state, issue.ticket.as_deref())
                    .await?;
                states.insert(case.id, state);
                reclassified += 1;
            }
        }

        if spec.spec.state == SpecState::Done {
            let counts: CaseCounts = spec
                .cases
                .iter()
                .filter(|case| case.has_identity())
                .filter_map(|case| states.get(&case.id).copied())
                .collect();
            if counts != spec.spec.counts {
                let patch = SpecPatch {
                    counts: Some(counts),
                    ..SpecPatch::default()
                };
                patch.validate()?;
                store.update_spec_execution(spec.spec.id, &patch).await?;
            }
        }
    }

    info!(
        cycle_id = %cycle.id,
        build_suffix = %build_suffix,
        reclassified,
        "Known issues applied"
    );

    let updated = refresh_cycle(store, &cycle, Utc::now()).await?;
    if cycle.state == CycleState::Done && updated.state != CycleState::Done {
        return Err(AppError::Conflict(format!(
            "cycle {} left the done state",
            cycle.id
        )));
    }
    Ok(updated)
}
