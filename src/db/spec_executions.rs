//! Database operations for spec executions using SeaORM.

use chrono::Utc;
use sea_orm::sea_query::{LockBehavior, LockType};
use sea_orm::*;
use uuid::Uuid;

use super::{decode_json, encode_json};
use crate::entity::spec_execution::{self, ActiveModel, Entity as SpecEntity};
use crate::error::{AppError, AppResult};
use crate::models::{CaseCounts, SpecExecution, SpecFile, SpecPatch, SpecState};

/// Register one `on_queue` spec execution per file.
pub async fn insert_many<C: ConnectionTrait>(
    db: &C,
    cycle_id: Uuid,
    files: &[SpecFile],
) -> AppResult<Vec<SpecExecution>> {
    let now = Utc::now();
    let mut inserted = Vec::with_capacity(files.len());

    for file in files {
        let model = ActiveModel {
            id: Set(Uuid::now_v7()),
            cycle_id: Set(cycle_id),
            file: Set(file.file.trim().to_string()),
            server: Set(None),
            state: Set(SpecState::OnQueue.as_str().to_string()),
            pass: Set(0),
            fail: Set(0),
            bug: Set(0),
            known: Set(0),
            flaky: Set(0),
            pending: Set(0),
            skipped: Set(0),
            duration: Set(0),
            tests: Set(0),
            sort_weight: Set(file.sort_weight),
            last_execution: Set(None),
            test_start_at: Set(None),
            test_end_at: Set(None),
            start_at: Set(None),
            end_at: Set(None),
            create_at: Set(now),
            update_at: Set(now),
        };

        let result = model
            .insert(db)
            .await
            .map_err(|e| AppError::Database(format!("Failed to insert spec execution: {}", e)))?;
        inserted.push(model_to_spec(result)?);
    }

    Ok(inserted)
}

/// Get a spec execution by ID.
pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: Uuid) -> AppResult<Option<SpecExecution>> {
    let result = SpecEntity::find_by_id(id)
        .one(db)
        .await
        .map_err(|e| AppError::Database(format!("Failed to get spec execution: {}", e)))?;

    result.map(model_to_spec).transpose()
}

/// All spec executions of a cycle in claim order, optionally filtered by state.
pub async fn list_by_cycle<C: ConnectionTrait>(
    db: &C,
    cycle_id: Uuid,
    state: Option<SpecState>,
) -> AppResult<Vec<SpecExecution>> {
    let mut select = SpecEntity::find().filter(spec_execution::Column::CycleId.eq(cycle_id));
    if let Some(state) = state {
        select = select.filter(spec_execution::Column::State.eq(state.as_str()));
    }

    let result = select
        .order_by_asc(spec_execution::Column::SortWeight)
        .order_by_asc(spec_execution::Column::File)
        .all(db)
        .await
        .map_err(|e| AppError::Database(format!("Failed to list spec executions: {}", e)))?;

    result.into_iter().map(model_to_spec).collect()
}

/// Claim the next `on_queue` spec of a cycle for `server`.
///
/// Rows locked by a concurrent claim are skipped, so two workers never get the same spec.
pub async fn claim_next<C: ConnectionTrait>(
    db: &C,
    cycle_id: Uuid,
    server: &str,
) -> AppResult<Option<SpecExecution>> {
    let next = SpecEntity::find()
        .filter(spec_execution::Column::CycleId.eq(cycle_id))
        .filter(spec_execution::Column::State.eq(SpecState::OnQueue.as_str()))
        .order_by_asc(spec_execution::Column::SortWeight)
        .order_by_asc(spec_execution::Column::File)
        .lock_with_behavior(LockType::Update, LockBehavior::SkipLocked)
        .one(db)
        .await
        .map_err(|e| AppError::Database(format!("Failed to claim spec execution: {}", e)))?;

    let Some(next) = next else {
        return Ok(None);
    };

    let now = Utc::now();
    let mut active: ActiveModel = next.into();
    active.state = Set(SpecState::Started.as_str().to_string());
    active.server = Set(Some(server.to_string()));
    active.start_at = Set(Some(now));
    active.update_at = Set(now);

    let result = active
        .update(db)
        .await
        .map_err(|e| AppError::Database(format!("Failed to start spec execution: {}", e)))?;

    model_to_spec(result).map(Some)
}

/// Apply a patch to a spec execution.
pub async fn update<C: ConnectionTrait>(
    db: &C,
    id: Uuid,
    patch: &SpecPatch,
) -> AppResult<SpecExecution> {
    let existing = SpecEntity::find_by_id(id)
        .one(db)
        .await
        .map_err(|e| AppError::Database(format!("Failed to get spec execution: {}", e)))?
        .ok_or_else(|| AppError::NotFound(format!("Spec execution {}", id)))?;

    let mut active: ActiveModel = existing.into();
    if let Some(state) = patch.state {
        active.state = Set(state.as_str().to_string());
    }
    if let Some(server) = &patch.server {
        active.server = Set(Some(server.clone()));
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
    if let Some(duration) = patch.duration {
        active.duration = Set(duration);
    }
    if let Some(tests) = patch.tests {
        active.tests = Set(tests);
    }
    if let Some(at) = patch.test_start_at {
        active.test_start_at = Set(Some(at));
    }
    if let Some(at) = patch.test_end_at {
        active.test_end_at = Set(Some(at));
    }
    if let Some(at) = patch.start_at {
        active.start_at = Set(Some(at));
    }
    if let Some(at) = patch.end_at {
        active.end_at = Set(Some(at));
    }
    if let Some(history) = &patch.last_execution {
        active.last_execution = Set(Some(encode_json(history, "last_execution")?));
    }
    active.update_at = Set(Utc::now());

    let result = active
        .update(db)
        .await
        .map_err(|e| AppError::Database(format!("Failed to update spec execution: {}", e)))?;

    model_to_spec(result)
}

fn model_to_spec(m: spec_execution::Model) -> AppResult<SpecExecution> {
    let state = SpecState::parse(&m.state)
        .ok_or_else(|| AppError::Database(format!("Unknown spec state '{}'", m.state)))?;

    Ok(SpecExecution {
        id: m.id,
        cycle_id: m.cycle_id,
        file: m.file,
        server: m.server,
        state,
        counts: CaseCounts {
            pass: m.pass,
            fail: m.fail,
            bug: m.bug,
            known: m.known,
            flaky: m.flaky,
            pending: m.pending,
            skipped: m.skipped,
        },
        duration: m.duration,
        tests: m.tests,
        sort_weight: m.sort_weight,
        last_execution: decode_json(m.last_execution, "last_execution")?.unwrap_or_default(),
        test_start_at: m.test_start_at,
        test_end_at: m.test_end_at,
        start_at: m.start_at,
        end_at: m.end_at,
        create_at: m.create_at,
        update_at: m.update_at,
    })
}
