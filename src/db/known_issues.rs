//! Database operations for known issues using SeaORM.

use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::*;
use uuid::Uuid;

use super::{decode_json, encode_json};
use crate::entity::known_issue::{self, ActiveModel, Entity as KnownIssueEntity};
use crate::error::{AppError, AppResult};
use crate::models::{KnownIssueData, KnownIssueRecord};

/// Store a known-issue payload for a cycle.
///
/// Returns `false` when the same content was already stored for the cycle.
pub async fn insert_if_absent<C: ConnectionTrait>(
    db: &C,
    cycle_id: Uuid,
    hash: &str,
    data: &[KnownIssueData],
) -> AppResult<bool> {
    let model = ActiveModel {
        id: Set(Uuid::new_v4()),
        cycle_id: Set(cycle_id),
        hash: Set(hash.to_string()),
        data: Set(encode_json(&data, "data")?),
        create_at: Set(Utc::now()),
    };

    let rows = KnownIssueEntity::insert(model)
        .on_conflict(
            OnConflict::columns([known_issue::Column::Hash, known_issue::Column::CycleId])
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(db)
        .await
        .map_err(|e| AppError::Database(format!("Failed to save known issue: {}", e)))?;

    Ok(rows > 0)
}

/// Known-issue payloads of a cycle, newest first.
pub async fn list_by_cycle<C: ConnectionTrait>(
    db: &C,
    cycle_id: Uuid,
) -> AppResult<Vec<KnownIssueRecord>> {
    let result = KnownIssueEntity::find()
        .filter(known_issue::Column::CycleId.eq(cycle_id))
        .order_by_desc(known_issue::Column::CreateAt)
        .all(db)
        .await
        .map_err(|e| AppError::Database(format!("Failed to get known issues: {}", e)))?;

    result.into_iter().map(model_to_record).collect()
}

fn model_to_record(m: known_issue::Model) -> AppResult<KnownIssueRecord> {
    Ok(KnownIssueRecord {
        id: m.id,
        cycle_id: m.cycle_id,
        hash: m.hash,
        data: decode_json(Some(m.data), "data")?.unwrap_or_default(),
        create_at: m.create_at,
    })
}
