//! Database operations for cycles using SeaORM.

use chrono::Utc;
use sea_orm::*;
use uuid::Uuid;

use super::{decode_json, encode_json};
use crate::entity::cycle::{self, ActiveModel, Entity as CycleEntity};
use crate::error::{AppError, AppResult};
use crate::models::{BuildFamily, CaseCounts, Cycle, CyclePatch, CycleState, NewCycle};

/// Suffix of a build string; mirrors `BuildInfo::suffix_or` in SQL.
const BUILD_SUFFIX_SQL: &str =
    "COALESCE(NULLIF(substring(build from '^[^-]*-[^-]*-(.*)$'), ''), $1)";

/// Insert a new cycle in `on_queue`.
pub async fn insert<C: ConnectionTrait>(db: &C, new: &NewCycle) -> AppResult<Cycle> {
    let now = Utc::now();

    let model = ActiveModel {
        id: Set(Uuid::now_v7()),
        repo: Set(new.repo.trim().to_string()),
        branch: Set(new.branch.trim().to_string()),
        build: Set(new.build.trim().to_string()),
        state: Set(CycleState::OnQueue.as_str().to_string()),
        specs_registered: Set(new.specs_registered),
        specs_done: Set(0),
        duration: Set(0),
        pass: Set(0),
        fail: Set(0),
        bug: Set(0),
        known: Set(0),
        flaky: Set(0),
        pending: Set(0),
        skipped: Set(0),
        environment: Set(Some(encode_json(&new.environment, "environment")?)),
        start_at: Set(None),
        end_at: Set(None),
        create_at: Set(now),
        update_at: Set(now),
    };

    let result = model
        .insert(db)
        .await
        .map_err(|e| AppError::Database(format!("Failed to insert cycle: {}", e)))?;

    model_to_cycle(result)
}

/// Find a cycle by ID.
pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: Uuid) -> AppResult<Option<Cycle>> {
    let result = CycleEntity::find_by_id(id)
        .one(db)
        .await
        .map_err(|e| AppError::Database(format!("Failed to get cycle: {}", e)))?;

    result.map(model_to_cycle).transpose()
}

/// Find a cycle by ID and hold a row lock until the transaction ends.
pub async fn lock_by_id<C: ConnectionTrait>(db: &C, id: Uuid) -> AppResult<Option<Cycle>> {
    let result = CycleEntity::find_by_id(id)
        .lock_exclusive()
        .one(db)
        .await
        .map_err(|e| AppError::Database(format!("Failed to lock cycle: {}", e)))?;

    result.map(model_to_cycle).transpose()
}

/// Find the newest cycle for an exact repo/branch/build.
pub async fn find_by_identity<C: ConnectionTrait>(
    db: &C,
    repo: &str,
    branch: &str,
    build: &str,
) -> AppResult<Option<Cycle>> {
    let result = CycleEntity::find()
        .filter(cycle::Column::Repo.eq(repo))
        .filter(cycle::Column::Branch.eq(branch))
        .filter(cycle::Column::Build.eq(build))
        .order_by_desc(cycle::Column::CreateAt)
        .one(db)
        .await
        .map_err(|e| AppError::Database(format!("Failed to find cycle: {}", e)))?;

    result.map(model_to_cycle).transpose()
}

/// Find the newest cycle for a build string, across repos and branches.
pub async fn find_latest_by_build<C: ConnectionTrait>(
    db: &C,
    build: &str,
) -> AppResult<Option<Cycle>> {
    let result = CycleEntity::find()
        .filter(cycle::Column::Build.eq(build))
        .order_by_desc(cycle::Column::CreateAt)
        .one(db)
        .await
        .map_err(|e| AppError::Database(format!("Failed to find cycle by build: {}", e)))?;

    result.map(model_to_cycle).transpose()
}

/// Apply a patch to a cycle.
pub async fn update<C: ConnectionTrait>(db: &C, id: Uuid, patch: &CyclePatch) -> AppResult<Cycle> {
    let existing = CycleEntity::find_by_id(id)
        .one(db)
        .await
        .map_err(|e| AppError::Database(format!("Failed to get cycle: {}", e)))?
        .ok_or_else(|| AppError::NotFound(format!("Cycle {}", id)))?;

    let mut active: ActiveModel = existing.into();
    if let Some(state) = patch.state {
        active.state = Set(state.as_str().to_string());
    }
    if let Some(specs_done) = patch.specs_done {
        active.specs_done = Set(specs_done);
    }
    if let Some(duration) = patch.duration {
        active.duration = Set(duration);
    }
    if let Some(counts) = &patch.counts {
        active.pass = Set(counts.pass);
        active.fail = Set(counts.fail);
        active.bug = Set(counts.bug);
        active.known = Set(counts.known);
        active.flaky = Set(counts.flaky);
        active.pending = Set(counts.pending);
        active.skipped = Set(counts.skipped);
    }
    if let Some(start_at) = patch.start_at {
        active.start_at = Set(Some(start_at));
    }
    if let Some(end_at) = patch.end_at {
        active.end_at = Set(Some(end_at));
    }
    active.update_at = Set(Utc::now());

    let result = active
        .update(db)
        .await
        .map_err(|e| AppError::Database(format!("Failed to update cycle: {}", e)))?;

    model_to_cycle(result)
}

/// Most recent done cycles of a build family, newest first.
pub async fn recent_done<C: ConnectionTrait>(
    db: &C,
    family: &BuildFamily,
    fallback_suffix: &str,
    exclude: Option<Uuid>,
    limit: usize,
) -> AppResult<Vec<Cycle>> {
    let mut values: Vec<Value> = vec![
        fallback_suffix.into(),
        family.build_suffix.clone().into(),
        family.repo.clone().into(),
        family.branch.clone().into(),
    ];

    let mut sql = format!(
        r#"
        SELECT * FROM cycles
        WHERE state = 'done'
          AND {} = $2
          AND repo = $3
          AND branch = $4
        "#,
        BUILD_SUFFIX_SQL
    );
    if let Some(id) = exclude {
        values.push(id.into());
        sql.push_str(&format!(" AND id <> ${}", values.len()));
    }
    values.push((limit as i64).into());
    sql.push_str(&format!(" ORDER BY create_at DESC LIMIT ${}", values.len()));

    let result = CycleEntity::find()
        .from_raw_sql(Statement::from_sql_and_values(
            DatabaseBackend::Postgres,
            &sql,
            values,
        ))
        .all(db)
        .await
        .map_err(|e| AppError::Database(format!("Failed to get done cycles: {}", e)))?;

    result.into_iter().map(model_to_cycle).collect()
}

fn model_to_cycle(m: cycle::Model) -> AppResult<Cycle> {
    let state = CycleState::parse(&m.state)
        .ok_or_else(|| AppError::Database(format!("Unknown cycle state '{}'", m.state)))?;

    Ok(Cycle {
        id: m.id,
        repo: m.repo,
        branch: m.branch,
        build: m.build,
        state,
        specs_registered: m.specs_registered,
        specs_done: m.specs_done,
        duration: m.duration,
        counts: CaseCounts {
            pass: m.pass,
            fail: m.fail,
            bug: m.bug,
            known: m.known,
            flaky: m.flaky,
            pending: m.pending,
            skipped: m.skipped,
        },
        environment: decode_json(m.environment, "environment")?.unwrap_or_default(),
        start_at: m.start_at,
        end_at: m.end_at,
        create_at: m.create_at,
        update_at: m.update_at,
    })
}
