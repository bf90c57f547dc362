//! Migration: Create cycles table.
//!
//! A cycle is one run of a full test suite against a repo/branch/build.

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
                -- Shared trigger function for update_at
                CREATE OR REPLACE FUNCTION update_update_at_column()
                RETURNS TRIGGER AS $$
                BEGIN
                    NEW.update_at = NOW();
                    RETURN NEW;
                END;
                $$ LANGUAGE plpgsql;

                CREATE TABLE cycles (
                    id UUID PRIMARY KEY,
                    repo VARCHAR(255) NOT NULL,
                    branch VARCHAR(255) NOT NULL,
                    build VARCHAR(255) NOT NULL,

                    -- Lifecycle state, forward only
                    state VARCHAR(20) NOT NULL DEFAULT 'on_queue'
                        CHECK (state IN ('on_queue', 'started', 'done')),

                    specs_registered INTEGER NOT NULL DEFAULT 0 CHECK (specs_registered >= 0),
                    specs_done INTEGER NOT NULL DEFAULT 0
                        CHECK (specs_done >= 0 AND specs_done <= specs_registered),
                    duration BIGINT NOT NULL DEFAULT 0 CHECK (duration >= 0),

                    -- Case counters by final state
                    pass INTEGER NOT NULL DEFAULT 0 CHECK (pass >= 0),
                    fail INTEGER NOT NULL DEFAULT 0 CHECK (fail >= 0),
                    bug INTEGER NOT NULL DEFAULT 0 CHECK (bug >= 0),
                    known INTEGER NOT NULL DEFAULT 0 CHECK (known >= 0),
                    flaky INTEGER NOT NULL DEFAULT 0 CHECK (flaky >= 0),
                    pending INTEGER NOT NULL DEFAULT 0 CHECK (pending >= 0),
                    skipped INTEGER NOT NULL DEFAULT 0 CHECK (skipped >= 0),

                    -- {cypress_version, browser_name, browser_version, headless, os_name, os_version, node_version}
                    environment JSONB,

                    start_at TIMESTAMPTZ,
                    end_at TIMESTAMPTZ,
                    create_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                    update_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                );

                -- Lookup by exact repo/branch/build when workers claim specs
                CREATE INDEX idx_cycles_repo_branch_build ON cycles(repo, branch, build);

                -- History lookups scan done cycles of one repo/branch, newest first
                CREATE INDEX idx_cycles_history ON cycles(repo, branch, create_at DESC)
                    WHERE state = 'done';

                CREATE TRIGGER update_cycles_update_at
                    BEFORE UPDATE ON cycles
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
                DROP TRIGGER IF EXISTS update_cycles_update_at ON cycles;
                DROP TABLE IF EXISTS cycles CASCADE;
                DROP FUNCTION IF EXISTS update_update_at_column();
                "#,
            )
            .await?;

        Ok(())
    }
}
