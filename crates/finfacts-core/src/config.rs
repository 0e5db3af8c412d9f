//! Policy configuration.
//!
//! The reconciliation and table-detection heuristics are policy constants. They
//! live here as named, deserializable settings so they can be tuned without
//! touching the algorithms. When a false positive or negative shows up in the
//! output, these are the first knobs to look at.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{FactError, Result};

/// Thresholds used by the reconciliation engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    /// Revenue values below this absolute amount are discarded as parsing noise.
    pub revenue_floor: Decimal,
    /// Share of the group total above which a duplicated value is suspect.
    pub duplicate_share: f64,
    /// Share of the group total a segment must exceed to be tested as a parent.
    pub subset_materiality: f64,
    /// Relative tolerance for a subset of segments to match a parent.
    pub subset_tolerance: f64,
    /// Smallest number of children considered by the subset-sum rule.
    pub subset_min_parts: usize,
    /// Largest number of children considered by the subset-sum rule.
    pub subset_max_parts: usize,
    /// Relative difference above which two providers disagree.
    pub discrepancy_threshold: f64,
    /// Margin by which an override must exceed the existing value to replace it.
    pub override_margin: f64,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            revenue_floor: Decimal::from(10_000_000),
            duplicate_share: 0.15,
            subset_materiality: 0.10,
            subset_tolerance: 0.005,
            subset_min_parts: 2,
            subset_max_parts: 4,
            discrepancy_threshold: 0.05,
            override_margin: 0.05,
        }
    }
}

impl ReconcileConfig {
    /// Loads a configuration from JSON, filling unspecified fields with defaults.
    ///
    /// # Errors
    /// Returns an error for malformed JSON or out-of-range thresholds.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| FactError::Parse(format!("reconcile config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that every threshold is in range.
    ///
    /// # Errors
    /// Returns [`FactError::InvalidParameter`] naming the offending field.
    pub fn validate(&self) -> Result<()> {
        let ratios = [
            ("duplicate_share", self.duplicate_share),
            ("subset_materiality", self.subset_materiality),
            ("subset_tolerance", self.subset_tolerance),
            ("discrepancy_threshold", self.discrepancy_threshold),
            ("override_margin", self.override_margin),
        ];
        for (name, value) in ratios {
            if !(0.0..1.0).contains(&value) {
                return Err(FactError::InvalidParameter(format!("{name} = {value}")));
            }
        }
        if self.revenue_floor.is_sign_negative() {
            return Err(FactError::InvalidParameter(format!(
                "revenue_floor = {}",
                self.revenue_floor
            )));
        }
        if self.subset_min_parts < 2 || self.subset_max_parts < self.subset_min_parts {
            return Err(FactError::InvalidParameter(format!(
                "subset parts {}..={}",
                self.subset_min_parts, self.subset_max_parts
            )));
        }
        Ok(())
    }
}

/// Heuristics used when scanning filing tables.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    /// Tables with fewer rows are ignored.
    pub min_rows: usize,
    /// Number of leading rows searched for the year header.
    pub header_scan_rows: usize,
    /// Number of leading rows whose text is used for admission.
    pub admission_scan_rows: usize,
    /// Smallest native-unit value treated as a real figure.
    pub min_native_value: Decimal,
    /// Longest accepted segment name.
    pub max_name_len: usize,
    /// Cells searched on each side of a year column.
    pub value_window: usize,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            min_rows: 4,
            header_scan_rows: 5,
            admission_scan_rows: 12,
            min_native_value: Decimal::from(100),
            max_name_len: 80,
            value_window: 2,
        }
    }
}
