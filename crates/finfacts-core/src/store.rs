//! Store trait for persisted fact sets.
//!
//! A [`FactStore`] keeps the reconciled records of previous runs so a fresh run
//! can be merged against them by key.

use async_trait::async_trait;
use std::time::Duration;

use crate::{error::Result, fact::FactRecord, types::Symbol};

/// Trait for persisting reconciled fact records.
///
/// Records are keyed by [`FactKey`](crate::fact::FactKey); saving a record
/// replaces any stored record with the same key.
#[async_trait]
pub trait FactStore: Send + Sync {
    /// Loads every stored record of an entity, in key order.
    async fn load(&self, entity: &Symbol) -> Result<Vec<FactRecord>>;

    /// Stores records, replacing those with the same key.
    async fn save(&self, entity: &Symbol, records: &[FactRecord]) -> Result<()>;

    /// Removes records stored longer ago than `ttl`.
    ///
    /// Returns the number of records removed.
    async fn invalidate_stale(&self, ttl: Duration) -> Result<usize>;

    /// Removes every stored record.
    async fn clear(&self) -> Result<()>;
}
