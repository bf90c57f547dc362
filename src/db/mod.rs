//! Database module providing connection management, migrations, and queries.

pub mod case_executions;
pub mod cycles;
pub mod history;
pub mod known_issues;
pub mod spec_executions;
pub mod store;

use std::time::Duration;

use sea_orm::{ConnectOptions, Database, DatabaseConnection, DatabaseTransaction, TransactionTrait};
use sea_orm_migration::MigratorTrait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use tracing::info;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::migration::Migrator;

pub use store::SeaStore;

/// Database connection pool wrapper.
///
/// Cloned into every actix worker; the underlying SeaORM connection is itself a pool.
#[derive(Clone)]
pub struct DbPool {
    conn: DatabaseConnection,
}

impl DbPool {
    /// Connect to PostgreSQL using the configured URL and pool size.
    pub async fn new(config: &Config) -> AppResult<Self> {
        let mut options = ConnectOptions::new(config.database_url.clone());
        options
            .max_connections(config.db_max_connections)
            .min_connections(1)
            .connect_timeout(Duration::from_secs(10))
            .sqlx_logging(false);

        let conn = Database::connect(options)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to database: {}", e)))?;

        info!(
            "Database pool ready (max {} connections)",
            config.db_max_connections
        );

        Ok(DbPool { conn })
    }

    /// Get access to the connection for executing queries.
    pub fn connection(&self) -> &DatabaseConnection {
        &self.conn
    }

    /// Apply pending migrations.
    pub async fn run_migrations(&self) -> AppResult<()> {
        Migrator::up(&self.conn, None)
            .await
            .map_err(|e| AppError::Database(format!("Failed to run migrations: {}", e)))
    }

    /// Begin a transaction. Every spec completion runs inside one.
    pub async fn begin(&self) -> AppResult<DatabaseTransaction> {
        self.conn
            .begin()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))
    }
}

/// Decode a nullable JSONB column.
pub(crate) fn decode_json<T: DeserializeOwned>(
    value: Option<JsonValue>,
    column: &str,
) -> AppResult<Option<T>> {
    value
        .map(serde_json::from_value)
        .transpose()
        .map_err(|e| AppError::Database(format!("Invalid {} column: {}", column, e)))
}

/// Encode a value for a JSONB column.
pub(crate) fn encode_json<T: Serialize>(value: &T, column: &str) -> AppResult<JsonValue> {
    serde_json::to_value(value)
        .map_err(|e| AppError::Database(format!("Failed to encode {}: {}", column, e)))
}

/// Build `$start, $start+1, ...` placeholders for an IN clause of `count` values.
pub(crate) fn placeholders(start: usize, count: usize) -> String {
    (start..start + count)
        .map(|i| format!("${}", i))
        .collect::<Vec<_>>()
        .join(", ")
}
