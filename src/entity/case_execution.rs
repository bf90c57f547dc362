//! Case execution entity for SeaORM.

use sea_orm::entity::prelude::*;
use serde_json::Value as JsonValue;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "case_executions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub cycle_id: Uuid,
    pub spec_execution_id: Uuid,
    /// Title breadcrumb as a JSON array of strings
    #[sea_orm(column_type = "JsonBinary")]
    pub title: JsonValue,
    pub full_title: String,
    pub key: Option<String>,
    pub key_step: Option<String>,
    /// State reported by the runner
    pub raw_state: String,
    /// State after classification
    pub state: String,
    pub known_issue_ticket: Option<String>,
    pub duration: i64,
    #[sea_orm(column_type = "Text", nullable)]
    pub code: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub error_display: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub error_frame: Option<String>,
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub screenshot: Option<JsonValue>,
    /// History window consulted during classification
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub last_execution: Option<JsonValue>,
    pub test_start_at: Option<DateTimeUtc>,
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
    #[sea_orm(
        belongs_to = "super::spec_execution::Entity",
        from = "Column::SpecExecutionId",
        to = "super::spec_execution::Column::Id",
        on_delete = "Cascade"
    )]
    SpecExecution,
}

impl Related<super::cycle::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Cycle.def()
    }
}

impl Related<super::spec_execution::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SpecExecution.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
