//! Migration: Create spec_executions table.
//!
//! One row per spec file registered with a cycle.

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
                CREATE TABLE spec_executions (
                    id UUID PRIMARY KEY, -- UUIDv7 for time-ordered sorting
                    cycle_id UUID NOT NULL REFERENCES cycles(id) ON DELETE CASCADE,
                    file VARCHAR(255) NOT NULL,

                    -- Worker that claimed the spec
                    server VARCHAR(255),

                    state VARCHAR(20) NOT NULL DEFAULT 'on_queue'
                        CHECK (state IN ('on_queue', 'started', 'done')),

                    pass INTEGER NOT NULL DEFAULT 0 CHECK (pass >= 0),
                    fail INTEGER NOT NULL DEFAULT 0 CHECK (fail >= 0),
                    bug INTEGER NOT NULL DEFAULT 0 CHECK (bug >= 0),
                    known INTEGER NOT NULL DEFAULT 0 CHECK (known >= 0),
                    flaky INTEGER NOT NULL DEFAULT 0 CHECK (flaky >= 0),
                    pending INTEGER NOT NULL DEFAULT 0 CHECK (pending >= 0),
                    skipped INTEGER NOT NULL DEFAULT 0 CHECK (skipped >= 0),

                    duration BIGINT NOT NULL DEFAULT 0 CHECK (duration >= 0),
                    tests INTEGER NOT NULL DEFAULT 0 CHECK (tests >= 0),
                    sort_weight INTEGER NOT NULL DEFAULT 0,

                    -- Counters of prior executions in the same build family
                    last_execution JSONB,

                    test_start_at TIMESTAMPTZ,
                    test_end_at TIMESTAMPTZ,
                    start_at TIMESTAMPTZ,
                    end_at TIMESTAMPTZ,
                    create_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                    update_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),

                    UNIQUE (cycle_id, file)
                );

                -- Claim order for workers
                CREATE INDEX idx_spec_executions_queue
                    ON spec_executions(cycle_id, sort_weight, file)
                    WHERE state = 'on_queue';

                CREATE INDEX idx_spec_executions_file ON spec_executions(file);

                CREATE TRIGGER update_spec_executions_update_at
                    BEFORE UPDATE ON spec_executions
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
                DROP TRIGGER IF EXISTS update_spec_executions_update_at ON spec_executions;
                DROP TABLE IF EXISTS spec_executions CASCADE;
                "#,
            )
            .await?;

        Ok(())
    }
}
