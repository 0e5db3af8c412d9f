//! In-memory fact store.

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use finfacts_core::{FactKey, FactRecord, FactStore, Result, Symbol};
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

#[derive(Debug, Clone)]
struct StoredRecord {
    record: FactRecord,
    stored_at: DateTime<Utc>,
}

impl StoredRecord {
    fn new(record: FactRecord) -> Self {
        Self {
            record,
            stored_at: Utc::now(),
        }
    }

    fn is_stale(&self, ttl: Duration) -> bool {
        let age = Utc::now().signed_duration_since(self.stored_at);
        age > TimeDelta::from_std(ttl).unwrap_or(TimeDelta::MAX)
    }
}

/// Fact store held in process memory.
///
/// Contents are lost when the store is dropped.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    records: RwLock<HashMap<Symbol, BTreeMap<FactKey, StoredRecord>>>,
}

impl InMemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records across all entities.
    pub async fn len(&self) -> usize {
        self.records.read().await.values().map(BTreeMap::len).sum()
    }

    /// Returns true if nothing is stored.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl FactStore for InMemoryStore {
    #[instrument(skip_all, fields(entity = %entity))]
    async fn load(&self, entity: &Symbol) -> Result<Vec<FactRecord>> {
        let records: Vec<FactRecord> = self
            .records
            .read()
            .await
            .get(entity)
            .map(|stored| stored.values().map(|s| s.record.clone()).collect())
            .unwrap_or_default();
        debug!(count = records.len(), "Loaded stored facts");
        Ok(records)
    }

    #[instrument(skip_all, fields(entity = %entity, count = records.len()))]
    async fn save(&self, entity: &Symbol, records: &[FactRecord]) -> Result<()> {
        let mut all = self.records.write().await;
        let stored = all.entry(entity.clone()).or_default();
        for record in records {
            stored.insert(record.key(), StoredRecord::new(record.clone()));
        }
        debug!("Stored facts");
        Ok(())
    }

    async fn invalidate_stale(&self, ttl: Duration) -> Result<usize> {
        let mut all = self.records.write().await;
        let mut removed = 0;
        for stored in all.values_mut() {
            let before = stored.len();
            stored.retain(|_, entry| !entry.is_stale(ttl));
            removed += before - stored.len();
        }
        all.retain(|_, stored| !stored.is_empty());

        if removed > 0 {
            debug!(removed, "Invalidated stale facts");
        }
        Ok(removed)
    }

    async fn clear(&self) -> Result<()> {
        self.records.write().await.clear();
        debug!("Cleared all stored facts");
        Ok(())
    }
}
