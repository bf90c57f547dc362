//! Database operations for case executions using SeaORM.

use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::*;
use uuid::Uuid;

use super::{decode_json, encode_json, placeholders};
use crate::entity::case_execution::{self, ActiveModel, Entity as CaseEntity};
use crate::error::{AppError, AppResult};
use crate::models::{CaseDiagnostics, CaseExecution, CaseOutcome, CaseState};

/// Insert classified cases; a case already recorded for the same spec keeps its row and gets the new values.
pub async fn upsert_many<C: ConnectionTrait>(db: &C, cases: &[CaseExecution]) -> AppResult<()> {
    if cases.is_empty() {
        return Ok(());
    }

    let models = cases
        .iter()
        .map(case_to_active_model)
        .collect::<AppResult<Vec<_>>>()?;

    CaseEntity::insert_many(models)
        .on_conflict(
            OnConflict::columns([
                case_execution::Column::CycleId,
                case_execution::Column::SpecExecutionId,
                case_execution::Column::FullTitle,
            ])
            .update_columns([
                case_execution::Column::Title,
                case_execution::Column::Key,
                case_execution::Column::KeyStep,
                case_execution::Column::RawState,
                case_execution::Column::State,
                case_execution::Column::KnownIssueTicket,
                case_execution::Column::Duration,
                case_execution::Column::Code,
                case_execution::Column::ErrorDisplay,
                case_execution::Column::ErrorFrame,
                case_execution::Column::Screenshot,
                case_execution::Column::LastExecution,
                case_execution::Column::TestStartAt,
                case_execution::Column::UpdateAt,
            ])
            .to_owned(),
        )
        .exec_without_returning(db)
        .await
        .map_err(|e| AppError::Database(format!("Failed to save case executions: {}", e)))?;

    Ok(())
}

/// All cases of a cycle.
pub async fn list_by_cycle<C: ConnectionTrait>(
    db: &C,
    cycle_id: Uuid,
) -> AppResult<Vec<CaseExecution>> {
    let result = CaseEntity::find()
        .filter(case_execution::Column::CycleId.eq(cycle_id))
        .order_by_asc(case_execution::Column::Id) // UUIDv7 is time-ordered
        .all(db)
        .await
        .map_err(|e| AppError::Database(format!("Failed to list case executions: {}", e)))?;

    result.into_iter().map(model_to_case).collect()
}

/// Overwrite the final state and ticket of a case.
pub async fn update_classification<C: ConnectionTrait>(
    db: &C,
    id: Uuid,
    state: CaseState,
    ticket: Option<&str>,
) -> AppResult<()> {
    let existing = CaseEntity::find_by_id(id)
        .one(db)
        .await
        .map_err(|e| AppError::Database(format!("Failed to get case execution: {}", e)))?
        .ok_or_else(|| AppError::NotFound(format!("Case execution {}", id)))?;

    let mut active: ActiveModel = existing.into();
    active.state = Set(state.as_str().to_string());
    active.known_issue_ticket = Set(ticket.map(str::to_string));
    active.update_at = Set(Utc::now());

    active
        .update(db)
        .await
        .map_err(|e| AppError::Database(format!("Failed to update case classification: {}", e)))?;

    Ok(())
}

/// Case outcomes of several cycles, joined with their spec file.
pub async fn outcomes_in_cycles<C: ConnectionTrait>(
    db: &C,
    cycle_ids: &[Uuid],
) -> AppResult<Vec<CaseOutcome>> {
    if cycle_ids.is_empty() {
        return Ok(Vec::new());
    }

    #[derive(Debug, FromQueryResult)]
    struct OutcomeRow {
        cycle_id: Uuid,
        spec_file: String,
        full_title: String,
        raw_state: String,
        state: String,
    }

    let sql = format!(
        r#"
        SELECT ce.cycle_id, se.file AS spec_file, ce.full_title, ce.raw_state, ce.state
        FROM case_executions ce
        INNER JOIN spec_executions se ON se.id = ce.spec_execution_id
        WHERE ce.cycle_id IN ({})
        ORDER BY se.file, ce.full_title
        "#,
        placeholders(1, cycle_ids.len())
    );
    let values: Vec<Value> = cycle_ids.iter().map(|id| Value::Uuid(Some(*id))).collect();

    let rows = OutcomeRow::find_by_statement(Statement::from_sql_and_values(
        DatabaseBackend::Postgres,
        &sql,
        values,
    ))
    .all(db)
    .await
    .map_err(|e| AppError::Database(format!("Failed to get case outcomes: {}", e)))?;

    rows.into_iter()
        .map(|row| {
            Ok(CaseOutcome {
                cycle_id: row.cycle_id,
                spec_file: row.spec_file,
                full_title: row.full_title,
                raw_state: parse_state(&row.raw_state)?,
                state: parse_state(&row.state)?,
            })
        })
        .collect()
}

pub(crate) fn parse_state(s: &str) -> AppResult<CaseState> {
    CaseState::parse(s).ok_or_else(|| AppError::Database(format!("Unknown case state '{}'", s)))
}

fn case_to_active_model(case: &CaseExecution) -> AppResult<ActiveModel> {
    let screenshot = case
        .diagnostics
        .screenshot
        .as_ref()
        .map(|s| encode_json(s, "screenshot"))
        .transpose()?;
    let last_execution = if case.last_execution.is_empty() {
        None
    } else {
        Some(encode_json(&case.last_execution, "last_execution")?)
    };

    Ok(ActiveModel {
        id: Set(case.id),
        cycle_id: Set(case.cycle_id),
        spec_execution_id: Set(case.spec_execution_id),
        title: Set(encode_json(&case.title, "title")?),
        full_title: Set(case.full_title.clone()),
        key: Set(case.key.clone()),
        key_step: Set(case.key_step.clone()),
        raw_state: Set(case.raw_state.as_str().to_string()),
        state: Set(case.state.as_str().to_string()),
        known_issue_ticket: Set(case.known_issue_ticket.clone()),
        duration: Set(case.duration),
        code: Set(case.diagnostics.code.clone()),
        error_display: Set(case.diagnostics.error_display.clone()),
        error_frame: Set(case.diagnostics.error_frame.clone()),
        screenshot: Set(screenshot),
        last_execution: Set(last_execution),
        test_start_at: Set(case.test_start_at),
        create_at: Set(case.create_at),
        update_at: Set(case.update_at),
    })
}

fn model_to_case(m: case_execution::Model) -> AppResult<CaseExecution> {
    Ok(CaseExecution {
        id: m.id,
        cycle_id: m.cycle_id,
        spec_execution_id: m.spec_execution_id,
        title: decode_json(Some(m.title), "title")?.unwrap_or_default(),
        full_title: m.full_title,
        key: m.key,
        key_step: m.key_step,
        raw_state: parse_state(&m.raw_state)?,
        state: parse_state(&m.state)?,
        known_issue_ticket: m.known_issue_ticket,
        duration: m.duration,
        diagnostics: CaseDiagnostics {
            code: m.code,
            error_display: m.error_display,
            error_frame: m.error_frame,
            screenshot: decode_json(m.screenshot, "screenshot")?,
        },
        last_execution: decode_json(m.last_execution, "last_execution")?.unwrap_or_default(),
        test_start_at: m.test_start_at,
        create_at: m.create_at,
        update_at: m.update_at,
    })
}
