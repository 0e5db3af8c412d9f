//! Structured facts document.
//!
//! Mirrors the shape of the SEC EDGAR `companyfacts` response: taxonomy →
//! concept → unit → observations. Kept in the core crate so extractors work
//! against any repository that can produce it.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Facts document for one entity.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyFacts {
    /// CIK number.
    #[serde(default)]
    pub cik: Option<u64>,
    /// Entity name.
    #[serde(default)]
    pub entity_name: Option<String>,
    /// Facts organized by taxonomy and concept.
    #[serde(default)]
    pub facts: HashMap<String, HashMap<String, ConceptFacts>>,
}

impl CompanyFacts {
    /// Returns true when the document carries no observations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.facts.values().all(HashMap::is_empty)
    }

    /// Looks up a concept within a taxonomy.
    #[must_use]
    pub fn concept(&self, taxonomy: &str, concept: &str) -> Option<&ConceptFacts> {
        self.facts.get(taxonomy)?.get(concept)
    }
}

/// Observations reported under one concept.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ConceptFacts {
    /// Label.
    #[serde(default)]
    pub label: Option<String>,
    /// Description.
    #[serde(default)]
    pub description: Option<String>,
    /// Observations keyed by unit (`USD`, `USD/shares`, ...).
    #[serde(default)]
    pub units: HashMap<String, Vec<FactObservation>>,
}

/// A single period-tagged observation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FactObservation {
    /// Start of the reporting period (absent for instants).
    #[serde(default)]
    pub start: Option<NaiveDate>,
    /// End of the reporting period.
    pub end: NaiveDate,
    /// Reported value.
    pub val: Decimal,
    /// Accession number of the filing.
    #[serde(default)]
    pub accn: Option<String>,
    /// Fiscal year tag.
    #[serde(default)]
    pub fy: Option<i32>,
    /// Fiscal period tag (`FY`, `Q1`..`Q4`).
    #[serde(default)]
    pub fp: Option<String>,
    /// Form type (`10-K`, `10-Q/A`, ...).
    #[serde(default)]
    pub form: Option<String>,
    /// Date the filing was made.
    #[serde(default)]
    pub filed: Option<NaiveDate>,
    /// Frame label.
    #[serde(default)]
    pub frame: Option<String>,
}

impl FactObservation {
    /// Duration of the reporting period in days, when the start is known.
    #[must_use]
    pub fn duration_days(&self) -> Option<i64> {
        self.start.map(|start| (self.end - start).num_days())
    }
}
