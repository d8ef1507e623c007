//! Database access for Hemicycle
//!
//! Shared SQLite database holding the mirrored legislator roster.

pub mod legislators;

use crate::Result;
use sqlx::SqlitePool;
use std::path::Path;

/// Initialize database connection pool
///
/// Connects to hemicycle.db in the root folder, creating the file and the
/// schema on first run.
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    // Ensure parent directory exists
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Use proper SQLite URI with mode=rwc (read, write, create)
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    tracing::debug!("Connecting to database: {}", db_url);

    let pool = SqlitePool::connect(&db_url).await?;

    initialize_schema(&pool).await?;

    Ok(pool)
}

/// Create the legislators table if it does not exist
///
/// Idempotent; also used by tests against `sqlite::memory:` pools.
pub async fn initialize_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS legislators (
            legislator_id TEXT NOT NULL,
            legislature INTEGER NOT NULL,
            first_name TEXT NOT NULL DEFAULT '',
            last_name TEXT NOT NULL DEFAULT '',
            profession TEXT,
            political_group TEXT,
            political_group_id TEXT,
            updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            PRIMARY KEY (legislator_id, legislature)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_legislators_legislature
        ON legislators (legislature)
        "#,
    )
    .execute(pool)
    .await?;

    tracing::info!("Database schema initialized (legislators)");

    Ok(())
}
