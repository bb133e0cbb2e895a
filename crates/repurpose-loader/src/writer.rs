use std::collections::BTreeMap;

use chrono::Utc;
use repurpose_models::reference_schema::{ReferenceRow, REFERENCE_TABLE_DDL};
use rusqlite::{params, Connection};

use crate::error::LoaderError;

const UPSERT_SQL: &str = "INSERT OR REPLACE INTO reference_entries \
     (key, category, value_json, source, drug, condition, created_at, expires_at, updated_at) \
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)";

const PURGE_SQL: &str = "DELETE FROM reference_entries WHERE expires_at < ?1";

/// Rows touched by one [`SqliteWriter::apply`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyStats {
    pub written: usize,
    pub expired: usize,
}

/// Read-write handle on the reference store used by the importer.
///
/// File databases run in WAL mode so the pipeline keeps reading during an import.
pub struct SqliteWriter {
    conn: Connection,
}

impl SqliteWriter {
    pub fn open(path: &str) -> Result<Self, LoaderError> {
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Self::with_schema(conn)
    }

    pub fn open_in_memory() -> Result<Self, LoaderError> {
        Self::with_schema(Connection::open_in_memory()?)
    }

    fn with_schema(conn: Connection) -> Result<Self, LoaderError> {
        conn.execute_batch(REFERENCE_TABLE_DDL)?;
        Ok(Self { conn })
    }

    /// Upsert `rows` and purge everything already expired, atomically.
    ///
    /// Readers see either the previous store or the fully imported one.
    pub fn apply(&mut self, rows: &[ReferenceRow]) -> Result<ApplyStats, LoaderError> {
        let tx = self.conn.transaction()?;
        let mut written = 0;
        {
            let mut upsert = tx.prepare_cached(UPSERT_SQL)?;
            for row in rows {
                written += upsert.execute(params![
                    row.key,
                    row.category,
                    row.value_json,
                    row.source,
                    row.drug,
                    row.condition,
                    row.created_at,
                    row.expires_at,
                    row.updated_at,
                ])?;
            }
        }
        let expired = tx.execute(PURGE_SQL, params![Utc::now().to_rfc3339()])?;
        tx.commit()?;
        Ok(ApplyStats { written, expired })
    }

    /// Row count per category, including rows not yet purged.
    pub fn category_counts(&self) -> Result<BTreeMap<String, usize>, LoaderError> {
        let mut stmt = self
            .conn
            .prepare("SELECT category, COUNT(*) FROM reference_entries GROUP BY category")?;
        let counts = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, usize>(1)?)))?
            .collect::<Result<BTreeMap<_, _>, _>>()?;
        Ok(counts)
    }
}
