//! Cycle API handlers.

use actix_web::{HttpResponse, web};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::config::Config;
use crate::db::{DbPool, SeaStore};
use crate::error::{AppError, AppResult};
use crate::models::{
    BuildFamily, Cycle, CycleSummary, SpecExecution, SpecGroup, StartCycleRequest, base_branch,
};
use crate::services::{self, CycleSelector, ExecutionStore, SpecGroupCounts};

/// Cycle with its derived summary.
#[derive(Debug, Serialize)]
pub struct CycleDetailResponse {
    pub cycle: Cycle,
    pub summary: CycleSummary,
}

/// Spec execution with its display group.
#[derive(Debug, Serialize)]
pub struct SpecWithGroup {
    #[serde(flatten)]
    pub spec: SpecExecution,
    pub group: SpecGroup,
}

#[derive(Debug, Serialize)]
pub struct CycleSpecsResponse {
    pub specs: Vec<SpecWithGroup>,
    pub groups: SpecGroupCounts,
}

/// Target of a known-issue application: `cycle_id` or `build`.
#[derive(Debug, Deserialize)]
pub struct KnownIssueQuery {
    pub cycle_id: Option<Uuid>,
    pub build: Option<String>,
}

impl KnownIssueQuery {
    fn selector(self) -> AppResult<CycleSelector> {
        match (self.cycle_id, self.build) {
            (Some(id), None) => Ok(CycleSelector::Id(id)),
            (None, Some(build)) if !build.trim().is_empty() => {
                Ok(CycleSelector::Build(build.trim().to_string()))
            }
            _ => Err(AppError::InvalidInput(
                "exactly one of cycle_id or build is required".to_string(),
            )),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UnstableQuery {
    pub repo: String,
    /// Defaults to the repo's base branch.
    pub branch: Option<String>,
    /// Defaults to the configured build suffix.
    pub build_suffix: Option<String>,
    pub limit: Option<usize>,
}

/// Register a cycle and its spec files.
///
/// POST /cycles/start
pub async fn start_cycle(
    pool: web::Data<DbPool>,
    config: web::Data<Config>,
    body: web::Json<StartCycleRequest>,
) -> AppResult<HttpResponse> {
    let txn = pool.begin().await?;
    let registration = {
        let store = SeaStore::new(&txn, config.classification.default_build_suffix.clone());
        services::start_cycle(
            &store,
            &config.classification,
            &config.known_issue_dir,
            body.into_inner(),
        )
        .await?
    };
    txn.commit().await?;

    Ok(HttpResponse::Created().json(registration))
}

/// Apply the build family's known issues to a cycle.
///
/// POST /cycles/known_issue?cycle_id=...|build=...
pub async fn apply_known_issues(
    pool: web::Data<DbPool>,
    config: web::Data<Config>,
    query: web::Query<KnownIssueQuery>,
) -> AppResult<HttpResponse> {
    let selector = query.into_inner().selector()?;

    let txn = pool.begin().await?;
    let cycle = {
        let store = SeaStore::new(&txn, config.classification.default_build_suffix.clone());
        services::apply_known_issues(
            &store,
            &config.classification,
            &config.known_issue_dir,
            &selector,
        )
        .await?
    };
    txn.commit().await?;

    info!(cycle_id = %cycle.id, "Known issues applied via API");
    Ok(HttpResponse::Ok().json(cycle))
}

/// Get a cycle with its summary.
///
/// GET /cycles/{id}
pub async fn get_cycle(
    pool: web::Data<DbPool>,
    config: web::Data<Config>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let id = Uuid::parse_str(&path.into_inner())?;
    let store = SeaStore::new(
        pool.connection(),
        config.classification.default_build_suffix.clone(),
    );

    let cycle = store
        .get_cycle(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Cycle {}", id)))?;
    let summary = services::cycle_summary(&cycle, config.liveness_window(), Utc::now());

    Ok(HttpResponse::Ok().json(CycleDetailResponse { cycle, summary }))
}

/// List a cycle's specs with their display groups.
///
/// GET /cycles/{id}/specs
pub async fn get_cycle_specs(
    pool: web::Data<DbPool>,
    config: web::Data<Config>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let id = Uuid::parse_str(&path.into_inner())?;
    let store = SeaStore::new(
        pool.connection(),
        config.classification.default_build_suffix.clone(),
    );

    if store.get_cycle(id).await?.is_none() {
        return Err(AppError::NotFound(format!("Cycle {}", id)));
    }

    let window = config.liveness_window();
    let now = Utc::now();
    let specs = store.list_spec_executions(id, None).await?;
    let groups = services::spec_group_counts(&specs, window, now);
    let specs = specs
        .into_iter()
        .map(|spec| SpecWithGroup {
            group: services::spec_group(&spec, window, now),
            spec,
        })
        .collect();

    Ok(HttpResponse::Ok().json(CycleSpecsResponse { specs, groups }))
}

/// Cases of a build family that failed in any recent done cycle.
///
/// GET /cycles/unstable?repo=...&branch=...&build_suffix=...&limit=...
pub async fn get_unstable_tests(
    pool: web::Data<DbPool>,
    config: web::Data<Config>,
    query: web::Query<UnstableQuery>,
) -> AppResult<HttpResponse> {
    let query = query.into_inner();
    let repo = query.repo.trim();
    if repo.is_empty() {
        return Err(AppError::InvalidInput("repo is required".to_string()));
    }

    let branch = query
        .branch
        .filter(|b| !b.trim().is_empty())
        .unwrap_or_else(|| base_branch(repo).to_string());
    let build_suffix = query
        .build_suffix
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| config.classification.default_build_suffix.clone());
    let family = BuildFamily::new(repo, branch, build_suffix);

    let store = SeaStore::new(
        pool.connection(),
        config.classification.default_build_suffix.clone(),
    );
    let report =
        services::unstable_tests(&store, &config.known_issue_dir, &family, query.limit).await?;

    Ok(HttpResponse::Ok().json(report))
}

/// Configure cycle routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/cycles/start").route(web::post().to(start_cycle)))
        .service(web::resource("/cycles/known_issue").route(web::post().to(apply_known_issues)))
        .service(web::resource("/cycles/unstable").route(web::get().to(get_unstable_tests)))
        .service(web::resource("/cycles/{cycle_id}").route(web::get().to(get_cycle)))
        .service(web::resource("/cycles/{cycle_id}/specs").route(web::get().to(get_cycle_specs)));
}
