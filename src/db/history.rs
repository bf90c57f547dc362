//! Prior outcomes of a case or a spec file across done cycles.

use chrono::{DateTime, Utc};
use sea_orm::*;
use uuid::Uuid;

use super::case_executions::parse_state;
use super::placeholders;
use crate::error::{AppError, AppResult};
use crate::models::{CaseCounts, LastCaseExecution, LastSpecExecution};

/// Outcomes of one case identity within `cycle_ids`, newest cycle first.
pub async fn case_history<C: ConnectionTrait>(
    db: &C,
    cycle_ids: &[Uuid],
    spec_file: &str,
    full_title: &str,
) -> AppResult<Vec<LastCaseExecution>> {
    if cycle_ids.is_empty() {
        return Ok(Vec::new());
    }

    #[derive(Debug, FromQueryResult)]
    struct CaseHistoryRow {
        id: Uuid,
        full_title: String,
        state: String,
        update_at: DateTime<Utc>,
        spec_execution_id: Uuid,
        spec_file: String,
        cycle_id: Uuid,
        repo: String,
        branch: String,
        build: String,
        cycle_create_at: DateTime<Utc>,
    }

    let sql = format!(
        r#"
        SELECT
            ce.id,
            ce.full_title,
            ce.state,
            ce.update_at,
            ce.spec_execution_id,
            se.file AS spec_file,
            c.id AS cycle_id,
            c.repo,
            c.branch,
            c.build,
            c.create_at AS cycle_create_at
        FROM case_executions ce
        INNER JOIN spec_executions se ON se.id = ce.spec_execution_id
        INNER JOIN cycles c ON c.id = ce.cycle_id
        WHERE se.file = $1
          AND ce.full_title = $2
          AND ce.cycle_id IN ({})
        ORDER BY c.create_at DESC
        "#,
        placeholders(3, cycle_ids.len())
    );

    let mut values: Vec<Value> = vec![spec_file.into(), full_title.into()];
    values.extend(cycle_ids.iter().map(|id| Value::Uuid(Some(*id))));

    let rows = CaseHistoryRow::find_by_statement(Statement::from_sql_and_values(
        DatabaseBackend::Postgres,
        &sql,
        values,
    ))
    .all(db)
    .await
    .map_err(|e| AppError::Database(format!("Failed to get case history: {}", e)))?;

    rows.into_iter()
        .map(|row| {
            Ok(LastCaseExecution {
                id: row.id,
                full_title: row.full_title,
                state: parse_state(&row.state)?,
                update_at: row.update_at,
                spec_execution_id: row.spec_execution_id,
                spec_file: row.spec_file,
                cycle_id: row.cycle_id,
                repo: row.repo,
                branch: row.branch,
                build: row.build,
                cycle_create_at: row.cycle_create_at,
            })
        })
        .collect()
}

/// Counters of one spec file within `cycle_ids`, newest cycle first.
pub async fn spec_history<C: ConnectionTrait>(
    db: &C,
    cycle_ids: &[Uuid],
    file: &str,
) -> AppResult<Vec<LastSpecExecution>> {
    if cycle_ids.is_empty() {
        return Ok(Vec::new());
    }

    #[derive(Debug, FromQueryResult)]
    struct SpecHistoryRow {
        id: Uuid,
        cycle_id: Uuid,
        pass: i32,
        fail: i32,
        bug: i32,
        known: i32,
        flaky: i32,
        pending: i32,
        skipped: i32,
        update_at: DateTime<Utc>,
        repo: String,
        branch: String,
        build: String,
        cycle_create_at: DateTime<Utc>,
    }

    let sql = format!(
        r#"
        SELECT
            se.id,
            se.cycle_id,
            se.pass, se.fail, se.bug, se.known, se.flaky, se.pending, se.skipped,
            se.update_at,
            c.repo,
            c.branch,
            c.build,
            c.create_at AS cycle_create_at
        FROM spec_executions se
        INNER JOIN cycles c ON c.id = se.cycle_id
        WHERE se.file = $1
          AND se.state = 'done'
          AND se.cycle_id IN ({})
        ORDER BY c.create_at DESC
        "#,
        placeholders(2, cycle_ids.len())
    );

    let mut values: Vec<Value> = vec![file.into()];
    values.extend(cycle_ids.iter().map(|id| Value::Uuid(Some(*id))));

    let rows = SpecHistoryRow::find_by_statement(Statement::from_sql_and_values(
        DatabaseBackend::Postgres,
        &sql,
        values,
    ))
    .all(db)
    .await
    .map_err(|e| AppError::Database(format!("Failed to get spec history: {}", e)))?;

    Ok(rows
        .into_iter()
        .map(|row| LastSpecExecution {
            id: row.id,
            cycle_id: row.cycle_id,
            counts: CaseCounts {
                pass: row.pass,
                fail: row.fail,
                bug: row.bug,
                known: row.known,
                flaky: row.flaky,
                pending: row.pending,
                skipped: row.skipped,
            },
            update_at: row.update_at,
            repo: row.repo,
            branch: row.branch,
            build: row.build,
            cycle_create_at: row.cycle_create_at,
        })
        .collect())
}
