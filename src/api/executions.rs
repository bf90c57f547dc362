//! Spec execution API handlers used by test runners.

use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::Config;
use crate::db::{DbPool, SeaStore};
use crate::error::AppResult;
use crate::models::{Cycle, SpecExecution, SpecResultReport};
use crate::services;

#[derive(Debug, Deserialize)]
pub struct StartSpecQuery {
    pub repo: String,
    pub branch: String,
    pub build: String,
    /// Name of the worker claiming the spec.
    pub server: String,
}

#[derive(Debug, Serialize)]
pub struct StartSpecResponse {
    pub message: &'static str,
    pub cycle: Cycle,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution: Option<SpecExecution>,
}

#[derive(Debug, Deserialize)]
pub struct EndSpecQuery {
    pub id: Uuid,
}

/// Claim the next queued spec of a cycle.
///
/// POST /executions/specs/start?repo=...&branch=...&build=...&server=...
pub async fn start_spec(
    pool: web::Data<DbPool>,
    config: web::Data<Config>,
    query: web::Query<StartSpecQuery>,
) -> AppResult<HttpResponse> {
    let query = query.into_inner();

    let txn = pool.begin().await?;
    let claim = {
        let store = SeaStore::new(&txn, config.classification.default_build_suffix.clone());
        services::start_next_spec(&store, &query.repo, &query.branch, &query.build, &query.server)
            .await?
    };
    txn.commit().await?;

    Ok(HttpResponse::Ok().json(StartSpecResponse {
        message: claim.message(),
        cycle: claim.cycle,
        execution: claim.spec,
    }))
}

/// Record a finished spec's results.
///
/// POST /executions/specs/end?id=...
pub async fn end_spec(
    pool: web::Data<DbPool>,
    config: web::Data<Config>,
    query: web::Query<EndSpecQuery>,
    body: web::Json<SpecResultReport>,
) -> AppResult<HttpResponse> {
    let txn = pool.begin().await?;
    let completion = {
        let store = SeaStore::new(&txn, config.classification.default_build_suffix.clone());
        services::finish_spec_execution(&store, &config.classification, query.id, &body).await?
    };
    txn.commit().await?;

    Ok(HttpResponse::Ok().json(completion))
}

/// Configure spec execution routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/executions/specs/start").route(web::post().to(start_spec)))
        .service(web::resource("/executions/specs/end").route(web::post().to(end_spec)));
}
