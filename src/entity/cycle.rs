//! Cycle entity for SeaORM.

use sea_orm::entity::prelude::*;
use serde_json::Value as JsonValue;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "cycles")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub repo: String,
    pub branch: String,
    pub build: String,
    /// Lifecycle state: on_queue, started, done
    pub state: String,
    pub specs_registered: i32,
    pub specs_done: i32,
    pub duration: i64,
    pub pass: i32,
    pub fail: i32,
    pub bug: i32,
    pub known: i32,
    pub flaky: i32,
    pub pending: i32,
    pub skipped: i32,
    /// Runner environment (browser, os, versions)
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub environment: Option<JsonValue>,
    pub start_at: Option<DateTimeUtc>,
    pub end_at: Option<DateTimeUtc>,
    pub create_at: DateTimeUtc,
    pub update_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::spec_execution::Entity")]
    SpecExecutions,
    #[sea_orm(has_many = "super::case_execution::Entity")]
    CaseExecutions,
    #[sea_orm(has_many = "super::known_issue::Entity")]
    KnownIssues,
}

impl Related<super::spec_execution::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SpecExecutions.def()
    }
}

impl Related<super::case_execution::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CaseExecutions.def()
    }
}

impl Related<super::known_issue::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::KnownIssues.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
