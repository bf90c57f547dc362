//! Migration: Create case_executions table.
//!
//! One row per test case per spec execution.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared(
                r#"
                CREATE TABLE case_executions (
                    id UUID PRIMARY KEY, -- UUIDv7 for time-ordered sorting
                    cycle_id UUID NOT NULL REFERENCES cycles(id) ON DELETE CASCADE,
                    spec_execution_id UUID NOT NULL REFERENCES spec_executions(id) ON DELETE CASCADE,

                    title JSONB NOT NULL DEFAULT '[]'::jsonb,
                    full_title TEXT NOT NULL,
                    key VARCHAR(50),
                    key_step VARCHAR(50),

                    -- State reported by the runner and state after classification
                    raw_state VARCHAR(20) NOT NULL
                        CHECK (raw_state IN ('passed', 'failed', 'pending', 'skipped')),
                    state VARCHAR(20) NOT NULL
                        CHECK (state IN ('passed', 'failed', 'bug', 'known', 'flaky', 'pending', 'skipped')),
                    known_issue_ticket VARCHAR(50),

                    duration BIGINT NOT NULL DEFAULT 0 CHECK (duration >= 0),

                    -- Diagnostics, never read by classification
                    code TEXT,
                    error_display TEXT,
                    error_frame TEXT,
                    screenshot JSONB,

                    -- History window consulted during classification
                    last_execution JSONB,

                    test_start_at TIMESTAMPTZ,
                    create_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                    update_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),

                    UNIQUE (cycle_id, spec_execution_id, full_title)
                );

                CREATE INDEX idx_case_executions_spec ON case_executions(spec_execution_id);

                -- History lookups by case identity
                CREATE INDEX idx_case_executions_identity ON case_executions(full_title, cycle_id);

                CREATE TRIGGER update_case_executions_update_at
                    BEFORE UPDATE ON case_executions
                    FOR EACH ROW
                    EXECUTE FUNCTION update_update_at_column();
                "#,
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared(
                r#"
                DROP TRIGGER IF EXISTS update_case_executions_update_at ON case_executions;
                DROP TABLE IF EXISTS case_executions CASCADE;
                "#,
            )
            .await?;

        Ok(())
    }
}
