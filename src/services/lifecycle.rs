//! Cycle registration and spec claiming.

use std::path::Path;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info};

use super::{ExecutionStore, load_known_issues, save_known_issues};
use crate::config::ClassificationConfig;
use crate::error::{AppError, AppResult};
use crate::models::{
    BuildInfo, Cycle, CyclePatch, CycleState, NewCycle, SpecExecution, StartCycleRequest,
};

/// A newly registered cycle and its queued specs.
#[derive(Debug, Clone, Serialize)]
pub struct CycleRegistration {
    pub cycle: Cycle,
    pub specs: Vec<SpecExecution>,
}

/// Outcome of asking for the next spec of a cycle.
#[derive(Debug, Clone, Serialize)]
pub struct SpecClaim {
    pub cycle: Cycle,
    /// `None` when every spec of the cycle has been claimed.
    pub spec: Option<SpecExecution>,
}

impl SpecClaim {
    pub fn message(&self) -> &'static str {
        if self.spec.is_some() {
            "spec claimed"
        } else {
            "no more spec"
        }
    }
}

/// Register a cycle with one queued spec per file and store its build family's known issues.
pub async fn start_cycle<S: ExecutionStore + ?Sized>(
    store: &S,
    config: &ClassificationConfig,
    known_issue_dir: &Path,
    request: StartCycleRequest,
) -> AppResult<CycleRegistration> {
    request.validate()?;

    let specs_registered = i32::try_from(request.files.len()).map_err(|_| {
        AppError::InvalidInput(format!("too many spec files: {}", request.files.len()))
    })?;

    // Load before writing so a broken source rejects the registration.
    let build_suffix = BuildInfo::suffix_or(request.build.trim(), &config.default_build_suffix);
    let known_issues = load_known_issues(known_issue_dir, &build_suffix).await?;

    let cycle = store
        .insert_cycle(&NewCycle {
            repo: request.repo.trim().to_string(),
            branch: request.branch.trim().to_string(),
            build: request.build.trim().to_string(),
            specs_registered,
            environment: request.environment,
        })
        .await?;
    let specs = store.insert_spec_executions(cycle.id, &request.files).await?;
    save_known_issues(store, cycle.id, &known_issues).await?;

    info!(
        cycle_id = %cycle.id,
        repo = %cycle.repo,
        branch = %cycle.branch,
        build = %cycle.build,
        specs_registered,
        "Cycle registered"
    );

    Ok(CycleRegistration { cycle, specs })
}

/// Claim the next queued spec of the cycle identified by repo, branch and build.
pub async fn start_next_spec<S: ExecutionStore + ?Sized>(
    store: &S,
    repo: &str,
    branch: &str,
    build: &str,
    server: &str,
) -> AppResult<SpecClaim> {
    let server = server.trim();
    if server.is_empty() {
        return Err(AppError::InvalidInput("server is required".to_string()));
    }

    let found = store
        .find_cycle(repo.trim(), branch.trim(), build.trim())
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!("Cycle for {}/{}/{}", repo, branch, build))
        })?;
    let mut cycle = store
        .lock_cycle(found.id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Cycle {}", found.id)))?;

    let spec = store.claim_next_spec(cycle.id, server).await?;

    match &spec {
        Some(spec) => {
            if cycle.state == CycleState::OnQueue {
                let patch = CyclePatch {
                    state: Some(CycleState::Started),
                    start_at: Some(Utc::now()),
                    ..CyclePatch::default()
                };
                patch.validate(&cycle)?;
                cycle = store.update_cycle(cycle.id, &patch).await?;
                info!(cycle_id = %cycle.id, "Cycle started");
            }
            info!(cycle_id = %cycle.id, spec = %spec.file, server = %server, "Spec claimed");
        }
        None => debug!(cycle_id = %cycle.id, server = %server, "No more spec"),
    }

    Ok(SpecClaim { cycle, spec })
}
