//! Migration: Create known_issues table.
//!
//! Known-issue payloads stored per cycle, addressed by content hash.

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
                CREATE TABLE known_issues (
                    id UUID PRIMARY KEY,
                    cycle_id UUID NOT NULL REFERENCES cycles(id) ON DELETE CASCADE,
                    hash VARCHAR(64) NOT NULL,
                    data JSONB NOT NULL,
                    create_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),

                    -- Re-submitting the same payload for a cycle is a no-op
                    UNIQUE (hash, cycle_id)
                );

                CREATE INDEX idx_known_issues_cycle_id ON known_issues(cycle_id, create_at DESC);
                "#,
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared("DROP TABLE IF EXISTS known_issues CASCADE;")
            .await?;

        Ok(())
    }
}
