//! Spec execution entity for SeaORM.

use sea_orm::entity::prelude::*;
use serde_json::Value as JsonValue;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "spec_executions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub cycle_id: Uuid,
    pub file: String,
    pub server: Option<String>,
    /// Lifecycle state: on_queue, started, done
    pub state: String,
    pub pass: i32,
    pub fail: i32,
    pub bug: i32,
    pub known: i32,
    pub flaky: i32,
    pub pending: i32,
    pub skipped: i32,
    pub duration: i64,
    pub tests: i32,
    pub sort_weight: i32,
    /// Counters of prior executions of the same file
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub last_execution: Option<JsonValue>,
    pub test_start_at: Option<DateTimeUtc>,
    pub test_end_at: Option<DateTimeUtc>,
    pub start_at: Option<DateTimeUtc>,
    pub end_at: Option<DateTimeUtc>,
    pub create_at: DateTimeUtc,
    pub update_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::cycle::Entity",
        from = "Column::CycleId",
        to = "super::cycle::Column::Id",
        on_delete = "Cascade"
    )]
    Cycle,
    #[sea_orm(has_many = "super::case_execution::Entity")]
    CaseExecutions,
}

impl Related<super::cycle::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Cycle.def()
    }
}

impl Related<super::case_execution::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CaseExecutions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
