//! SeaORM entity definitions for PostgreSQL database.

pub mod case_execution;
pub mod cycle;
pub mod known_issue;
pub mod spec_execution;
