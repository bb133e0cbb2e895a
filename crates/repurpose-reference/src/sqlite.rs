use chrono::{Duration, Utc};
use repurpose_models::reference_schema::{ReferenceCategory, ReferenceRow, REFERENCE_TABLE_DDL};
use rusqlite::{Connection, Row};
use serde::Serialize;

use crate::error::ReferenceError;

const SELECT_COLUMNS: &str =
    "SELECT key, category, value_json, source, drug, condition, created_at, expires_at, updated_at \
     FROM reference_entries";

/// SQLite accessor for the reference store.
///
/// The file is written by `repurpose-loader` and opened read-only here.
pub struct SqliteReference {
    conn: Connection,
}

impl SqliteReference {
    /// Open a read-only connection to the reference database.
    pub fn open(path: &str) -> Result<Self, ReferenceError> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY | rusqlite::OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Ok(Self { conn })
    }

    /// Writable in-memory database with the schema applied, for tests and demos.
    pub fn open_in_memory() -> Result<Self, ReferenceError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(REFERENCE_TABLE_DDL)?;
        Ok(Self { conn })
    }

    /// Get a single entry by key. Returns None if not found or expired.
    pub fn get(&self, key: &str) -> Result<Option<ReferenceRow>, ReferenceError> {
        let now = Utc::now().to_rfc3339();
        let mut stmt = self
            .conn
            .prepare_cached(&format!("{SELECT_COLUMNS} WHERE key = ?1 AND expires_at > ?2"))?;

        match stmt.query_row(rusqlite::params![key, now], map_row) {
            Ok(row) => Ok(Some(row)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(ReferenceError::Sqlite(e)),
        }
    }

    /// All live entries whose key starts with `prefix`, ordered by key.
    pub fn get_by_prefix(&self, prefix: &str) -> Result<Vec<ReferenceRow>, ReferenceError> {
        let now = Utc::now().to_rfc3339();
        let like_pattern = format!("{}%", escape_like(prefix));
        let mut stmt = self.conn.prepare_cached(&format!(
            "{SELECT_COLUMNS} WHERE key LIKE ?1 ESCAPE '\\' AND expires_at > ?2 ORDER BY key"
        ))?;

        let rows = stmt
            .query_map(rusqlite::params![like_pattern, now], map_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    /// Number of live entries in a category.
    pub fn count_category(&self, category: ReferenceCategory) -> Result<u64, ReferenceError> {
        let now = Utc::now().to_rfc3339();
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM reference_entries WHERE category = ?1 AND expires_at > ?2",
            rusqlite::params![category.as_str(), now],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    /// Insert or replace a raw row. Production data is written by the loader.
    pub fn insert(&self, row: &ReferenceRow) -> Result<(), ReferenceError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO reference_entries \
             (key, category, value_json, source, drug, condition, created_at, expires_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            rusqlite::params![
                row.key,
                row.category,
                row.value_json,
                row.source,
                row.drug,
                row.condition,
                row.created_at,
                row.expires_at,
                row.updated_at,
            ],
        )?;
        Ok(())
    }

    /// Serialize `value` and store it under `key` for `ttl`.
    pub fn put<T: Serialize>(
        &self,
        key: &str,
        category: ReferenceCategory,
        value: &T,
        ttl: Duration,
    ) -> Result<(), ReferenceError> {
        let now = Utc::now();
        self.insert(&ReferenceRow {
            key: key.to_string(),
            category: category.as_str().to_string(),
            value_json: serde_json::to_string(value)?,
            source: "local".to_string(),
            drug: None,
            condition: None,
            created_at: now.to_rfc3339(),
            expires_at: (now + ttl).to_rfc3339(),
            updated_at: now.to_rfc3339(),
        })
    }
}

fn map_row(row: &Row<'_>) -> rusqlite::Result<ReferenceRow> {
    Ok(ReferenceRow {
        key: row.get(0)?,
        category: row.get(1)?,
        value_json: row.get(2)?,
        source: row.get(3)?,
        drug: row.get(4)?,
        condition: row.get(5)?,
        created_at: row.get(6)?,
        expires_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

fn escape_like(prefix: &str) -> String {
    let mut escaped = String::with_capacity(prefix.len());
    for c in prefix.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
