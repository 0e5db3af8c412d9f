//! Keyed accumulation of fact records and the frozen result.
//!
//! Records are collected into a [`FactSetBuilder`] during a single pass. When
//! two records share a [`FactKey`], [`prefer`] decides which one survives.
//! [`FactSetBuilder::freeze`] then yields an immutable, key-ordered
//! [`FactSet`].

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use finfacts_core::{FactError, FactKey, FactRecord, FiscalPeriod, Metric, Result, Symbol};
use serde::{Deserialize, Serialize};

/// Returns true if `candidate` should replace `existing` under the same key.
///
/// A derived record beats an observed one; otherwise the higher value wins and
/// a tie keeps the existing record.
#[must_use]
pub fn prefer(existing: &FactRecord, candidate: &FactRecord) -> bool {
    match (existing.is_derived, candidate.is_derived) {
        (false, true) => true,
        (true, false) => false,
        _ => candidate.value > existing.value,
    }
}

/// Mutable accumulator keyed by [`FactKey`].
#[derive(Clone, Debug, Default)]
pub struct FactSetBuilder {
    records: BTreeMap<FactKey, FactRecord>,
}

impl FactSetBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a record, resolving a key collision with [`prefer`].
    ///
    /// Returns true if the record was kept.
    pub fn insert(&mut self, record: FactRecord) -> bool {
        match self.records.entry(record.key()) {
            Entry::Vacant(slot) => {
                slot.insert(record);
                true
            }
            Entry::Occupied(mut slot) => {
                if prefer(slot.get(), &record) {
                    slot.insert(record);
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Inserts a record unconditionally, returning the one it displaced.
    pub fn replace(&mut self, record: FactRecord) -> Option<FactRecord> {
        self.records.insert(record.key(), record)
    }

    /// Removes every record matching the predicate, returning how many were removed.
    pub fn remove_where<F>(&mut self, mut predicate: F) -> usize
    where
        F: FnMut(&FactRecord) -> bool,
    {
        let before = self.records.len();
        self.records.retain(|_, record| !predicate(record));
        before - self.records.len()
    }

    /// Keeps a single record per (entity, fiscal year, period, metric) across
    /// sources, for every record selected by `applies`.
    ///
    /// The survivor is chosen with [`prefer`], visiting candidates in key order.
    /// Returns the number of records dropped.
    pub fn collapse_sources<F>(&mut self, mut applies: F) -> usize
    where
        F: FnMut(&FactRecord) -> bool,
    {
        let before = self.records.len();
        let mut best: BTreeMap<(Symbol, i32, FiscalPeriod, Metric), FactRecord> = BTreeMap::new();
        for (key, record) in std::mem::take(&mut self.records) {
            if !applies(&record) {
                self.records.insert(key, record);
                continue;
            }
            let slot = (key.entity, key.fiscal_year, key.period, key.metric);
            match best.entry(slot) {
                Entry::Vacant(vacant) => {
                    vacant.insert(record);
                }
                Entry::Occupied(mut occupied) => {
                    if prefer(occupied.get(), &record) {
                        occupied.insert(record);
                    }
                }
            }
        }
        for record in best.into_values() {
            self.records.insert(record.key(), record);
        }
        before - self.records.len()
    }

    /// Record stored under a key.
    #[must_use]
    pub fn get(&self, key: &FactKey) -> Option<&FactRecord> {
        self.records.get(key)
    }

    /// Records in key order.
    pub fn iter(&self) -> impl Iterator<Item = &FactRecord> {
        self.records.values()
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if no records have been inserted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Consumes the builder, returning its records in key order.
    #[must_use]
    pub fn into_records(self) -> Vec<FactRecord> {
        self.records.into_values().collect()
    }

    /// Freezes the accumulated records.
    #[must_use]
    pub fn freeze(self) -> FactSet {
        FactSet {
            records: self.into_records(),
        }
    }
}

impl Extend<FactRecord> for FactSetBuilder {
    fn extend<I: IntoIterator<Item = FactRecord>>(&mut self, iter: I) {
        for record in iter {
            self.insert(record);
        }
    }
}

/// Immutable, key-ordered set of reconciled records.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FactSet {
    records: Vec<FactRecord>,
}

impl FactSet {
    /// Records in key order.
    #[must_use]
    pub fn records(&self) -> &[FactRecord] {
        &self.records
    }

    /// Iterates over records in key order.
    pub fn iter(&self) -> std::slice::Iter<'_, FactRecord> {
        self.records.iter()
    }

    /// Records for one entity.
    pub fn for_entity<'a>(&'a self, entity: &'a Symbol) -> impl Iterator<Item = &'a FactRecord> {
        self.records.iter().filter(move |r| &r.entity == entity)
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Consumes the set, returning its records.
    #[must_use]
    pub fn into_records(self) -> Vec<FactRecord> {
        self.records
    }

    /// Serializes the set to JSON.
    ///
    /// # Errors
    /// Returns [`FactError::Parse`] if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| FactError::Parse(format!("fact set: {e}")))
    }
}

impl FromIterator<FactRecord> for FactSet {
    fn from_iter<I: IntoIterator<Item = FactRecord>>(iter: I) -> Self {
        let mut builder = FactSetBuilder::new();
        builder.extend(iter);
        builder.freeze()
    }
}

impl<'a> IntoIterator for &'a FactSet {
    type Item = &'a FactRecord;
    type IntoIter = std::slice::Iter<'a, FactRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
