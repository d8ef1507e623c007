//! Legislator store operations
//!
//! Mirrors the open-data roster into SQLite. Rows are keyed on
//! `(legislator_id, legislature)` and overwritten on conflict, never
//! duplicated, so every write path here is idempotent.

use crate::model::LegislatorIdentity;
use crate::Result;
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use std::collections::HashMap;

/// One mirrored roster row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegislatorRow {
    /// Canonical identifier (`PA` + digits)
    pub legislator_id: String,
    pub legislature: u32,
    pub first_name: String,
    pub last_name: String,
    pub profession: Option<String>,
    pub political_group: Option<String>,
    pub political_group_id: Option<String>,
}

impl LegislatorRow {
    /// Cache-entry view of this row, stamped with the current time
    pub fn into_identity(self) -> LegislatorIdentity {
        LegislatorIdentity {
            legislator_id: self.legislator_id,
            first_name: self.first_name,
            last_name: self.last_name,
            profession: self.profession,
            political_group: self.political_group,
            political_group_id: self.political_group_id,
            fetched_at: Utc::now(),
        }
    }
}

const SELECT_COLUMNS: &str = "legislator_id, legislature, first_name, last_name, \
                              profession, political_group, political_group_id";

fn row_from(row: &sqlx::sqlite::SqliteRow) -> LegislatorRow {
    let legislature: i64 = row.get("legislature");
    LegislatorRow {
        legislator_id: row.get("legislator_id"),
        legislature: legislature as u32,
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        profession: row.get("profession"),
        political_group: row.get("political_group"),
        political_group_id: row.get("political_group_id"),
    }
}

/// Load one legislator by canonical id and legislature
pub async fn query(
    pool: &SqlitePool,
    legislator_id: &str,
    legislature: u32,
) -> Result<Option<LegislatorRow>> {
    let sql = format!(
        "SELECT {} FROM legislators WHERE legislator_id = ? AND legislature = ?",
        SELECT_COLUMNS
    );
    let row = sqlx::query(&sql)
        .bind(legislator_id)
        .bind(legislature as i64)
        .fetch_optional(pool)
        .await?;

    Ok(row.as_ref().map(row_from))
}

/// Load many legislators in one query
///
/// Returns a partial map: ids absent from the store simply have no entry.
/// One round-trip instead of N is the point of the batched prefetch path.
pub async fn batch_query(
    pool: &SqlitePool,
    legislator_ids: &[String],
    legislature: u32,
) -> Result<HashMap<String, LegislatorRow>> {
    if legislator_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let placeholders = legislator_ids
        .iter()
        .map(|_| "?")
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "SELECT {} FROM legislators WHERE legislature = ? AND legislator_id IN ({})",
        SELECT_COLUMNS, placeholders
    );

    let mut query = sqlx::query(&sql).bind(legislature as i64);
    for id in legislator_ids {
        query = query.bind(id);
    }

    let rows = query.fetch_all(pool).await?;
    Ok(rows
        .iter()
        .map(|row| {
            let record = row_from(row);
            (record.legislator_id.clone(), record)
        })
        .collect())
}

/// Upsert a single legislator row
pub async fn upsert_one(pool: &SqlitePool, record: &LegislatorRow) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO legislators (
            legislator_id, legislature, first_name, last_name,
            profession, political_group, political_group_id, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, CURRENT_TIMESTAMP)
        ON CONFLICT(legislator_id, legislature) DO UPDATE SET
            first_name = excluded.first_name,
            last_name = excluded.last_name,
            profession = excluded.profession,
            political_group = excluded.political_group,
            political_group_id = excluded.political_group_id,
            updated_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(&record.legislator_id)
    .bind(record.legislature as i64)
    .bind(&record.first_name)
    .bind(&record.last_name)
    .bind(&record.profession)
    .bind(&record.political_group)
    .bind(&record.political_group_id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Upsert a batch of rows in a single transaction
///
/// All-or-nothing: a failed batch rolls back and the caller falls back to
/// per-record upserts.
pub async fn upsert_batch(pool: &SqlitePool, records: &[LegislatorRow]) -> Result<()> {
    let mut tx = pool.begin().await?;

    for record in records {
        sqlx::query(
            r#"
            INSERT INTO legislators (
                legislator_id, legislature, first_name, last_name,
                profession, political_group, political_group_id, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, CURRENT_TIMESTAMP)
            ON CONFLICT(legislator_id, legislature) DO UPDATE SET
                first_name = excluded.first_name,
                last_name = excluded.last_name,
                profession = excluded.profession,
                political_group = excluded.political_group,
                political_group_id = excluded.political_group_id,
                updated_at = CURRENT_TIMESTAMP
            "#,
        )
        .bind(&record.legislator_id)
        .bind(record.legislature as i64)
        .bind(&record.first_name)
        .bind(&record.last_name)
        .bind(&record.profession)
        .bind(&record.political_group)
        .bind(&record.political_group_id)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(())
}

/// Delete every row of one legislature (force resync only)
pub async fn delete_legislature(pool: &SqlitePool, legislature: u32) -> Result<u64> {
    let result = sqlx::query("DELETE FROM legislators WHERE legislature = ?")
        .bind(legislature as i64)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}

/// Count mirrored rows for one legislature
pub async fn count(pool: &SqlitePool, legislature: u32) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) AS n FROM legislators WHERE legislature = ?")
        .bind(legislature as i64)
        .fetch_one(pool)
        .await?;

    Ok(row.get("n"))
}
