use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::str::FromStr;
use std::time::Duration;

use super::migrations::run_migrations;
use crate::config::DatabaseConfig;

/// Open the SQLite pool and bring the schema up to date.
///
/// - WAL mode for concurrent reads/writes
/// - Foreign keys enforcement (order items cascade with their order)
/// - Busy timeout to ride out short write contention
pub async fn init_db(config: &DatabaseConfig) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(&config.url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .foreign_keys(true)
        .busy_timeout(Duration::from_secs(30));

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
        .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
        .connect_with(options)
        .await?;

    run_migrations(&pool).await?;

    tracing::info!(
        target: "DATABASE",
        url = %config.url,
        min = config.min_connections,
        max = config.max_connections,
        "Connection pool initialized"
    );

    Ok(pool)
}

/// Returns Ok(()) if the database is reachable
pub async fn health_check(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").fetch_one(pool).await?;
    Ok(())
}
