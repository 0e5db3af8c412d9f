//! SQLite-based fact store.

use async_trait::async_trait;
use chrono::{SecondsFormat, TimeDelta, Utc};
use finfacts_core::{FactError, FactRecord, FactStore, Result, Symbol};
use rusqlite::{Connection, params};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, instrument};

fn store_error(e: impl std::fmt::Display) -> FactError {
    FactError::Store(e.to_string())
}

/// Fixed-width UTC timestamp, so stored times compare lexicographically.
fn timestamp(at: chrono::DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// SQLite-backed store for reconciled facts.
///
/// One row per [`FactKey`](finfacts_core::FactKey); the record itself is kept
/// as JSON next to its key columns. The file persists across runs so a fresh
/// extraction can be merged against earlier results.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) a store at the given path.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or schema creation fails.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path).map_err(store_error)?;
        Self::with_connection(conn)
    }

    /// Create an in-memory SQLite store.
    ///
    /// Useful for testing; data is lost when the store is dropped.
    ///
    /// # Errors
    /// Returns an error if schema creation fails.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(store_error)?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.initialize_schema()?;
        Ok(store)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(store_error)
    }

    fn initialize_schema(&self) -> Result<()> {
        let conn = self.lock()?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS fact_records (
                entity TEXT NOT NULL,
                fiscal_year INTEGER NOT NULL,
                period TEXT NOT NULL,
                metric TEXT NOT NULL,
                source TEXT NOT NULL,
                data_json TEXT NOT NULL,
                stored_at TEXT NOT NULL,
                PRIMARY KEY (entity, fiscal_year, period, metric, source)
            )",
            [],
        )
        .map_err(store_error)?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_fact_records_stored_at
             ON fact_records(stored_at)",
            [],
        )
        .map_err(store_error)?;

        debug!("SQLite fact store schema initialized");
        Ok(())
    }
}

#[async_trait]
impl FactStore for SqliteStore {
    #[instrument(skip_all, fields(entity = %entity))]
    async fn load(&self, entity: &Symbol) -> Result<Vec<FactRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT data_json FROM fact_records WHERE entity = ?1")
            .map_err(store_error)?;

        let rows = stmt
            .query_map(params![entity.as_str()], |row| row.get::<_, String>(0))
            .map_err(store_error)?;

        let mut records = Vec::new();
        for row in rows {
            let json = row.map_err(store_error)?;
            let record: FactRecord = serde_json::from_str(&json)
                .map_err(|e| FactError::Parse(format!("stored fact record: {e}")))?;
            records.push(record);
        }
        records.sort_by_key(FactRecord::key);

        debug!(count = records.len(), "Loaded stored facts");
        Ok(records)
    }

    #[instrument(skip_all, fields(entity = %entity, count = records.len()))]
    async fn save(&self, entity: &Symbol, records: &[FactRecord]) -> Result<()> {
        let stored_at = timestamp(Utc::now());
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction().map_err(store_error)?;

        for record in records {
            let json = serde_json::to_string(record).map_err(store_error)?;
            tx.execute(
                "INSERT OR REPLACE INTO fact_records
                 (entity, fiscal_year, period, metric, source, data_json, stored_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    record.entity.as_str(),
                    record.fiscal_year,
                    record.period.as_str(),
                    record.metric.to_string(),
                    record.source.as_str(),
                    json,
                    stored_at,
                ],
            )
            .map_err(store_error)?;
        }

        tx.commit().map_err(store_error)?;
        debug!("Stored facts");
        Ok(())
    }

    async fn invalidate_stale(&self, ttl: Duration) -> Result<usize> {
        let ttl = TimeDelta::from_std(ttl)
            .map_err(|e| FactError::InvalidParameter(format!("Invalid TTL duration: {e}")))?;
        let cutoff = timestamp(Utc::now() - ttl);

        let conn = self.lock()?;
        let deleted = conn
            .execute(
                "DELETE FROM fact_records WHERE stored_at < ?1",
                params![cutoff],
            )
            .map_err(store_error)?;

        if deleted > 0 {
            debug!(deleted, "Invalidated stale facts");
        }
        Ok(deleted)
    }

    async fn clear(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM fact_records", [])
            .map_err(store_error)?;
        debug!("Cleared all stored facts");
        Ok(())
    }
}
