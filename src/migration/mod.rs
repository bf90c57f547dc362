//! SeaORM database migrations.

pub use sea_orm_migration::prelude::*;

mod m20261001_000001_create_cycles;
mod m20261001_000002_create_spec_executions;
mod m20261001_000003_create_case_executions;
mod m20261001_000004_create_known_issues;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20261001_000001_create_cycles::Migration),
            Box::new(m20261001_000002_create_spec_executions::Migration),
            Box::new(m20261001_000003_create_case_executions::Migration),
            Box::new(m20261001_000004_create_known_issues::Migration),
        ]
    }
}
