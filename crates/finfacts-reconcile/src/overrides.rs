//! Manually curated segment revenue.

use finfacts_core::{
    FactError, FactRecord, FiscalPeriod, Metric, Result, SegmentType, Source, Symbol,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::factset::FactSetBuilder;

/// An annual segment figure supplied by hand.
///
/// Consulted only to fill gaps or to replace a value it exceeds by more than
/// the configured margin.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualOverride {
    /// Entity ticker.
    pub entity: Symbol,
    /// Fiscal year.
    pub fiscal_year: i32,
    /// Product or geography.
    pub segment_type: SegmentType,
    /// Segment name.
    pub segment_name: String,
    /// Revenue in absolute currency.
    pub revenue: Decimal,
}

impl ManualOverride {
    /// Parses a JSON array of overrides.
    ///
    /// # Errors
    /// Returns [`FactError::Parse`] for malformed input.
    pub fn list_from_json(json: &str) -> Result<Vec<Self>> {
        serde_json::from_str(json).map_err(|e| FactError::Parse(format!("overrides: {e}")))
    }

    fn metric(&self) -> Metric {
        Metric::segment(self.segment_name.clone(), self.segment_type)
    }

    fn matches(&self, record: &FactRecord) -> bool {
        record.entity == self.entity
            && record.fiscal_year == self.fiscal_year
            && record.period.is_full_year()
            && record.metric == self.metric()
    }

    fn into_record(self) -> FactRecord {
        let metric = self.metric();
        FactRecord::new(
            self.entity,
            self.fiscal_year,
            FiscalPeriod::Annual,
            metric,
            self.revenue,
            Source::Override,
        )
        .with_provenance("manual-override")
    }
}

/// Applies overrides to the accumulated records.
///
/// An override with no matching annual record from a provider or parser is
/// added. One that exceeds the largest such value by more than `margin`
/// replaces every matching record. Override records persisted by an earlier
/// run do not count as existing values, so re-applying the same list is
/// stable. Returns the number of overrides applied.
pub fn apply_overrides(
    builder: &mut FactSetBuilder,
    overrides: impl IntoIterator<Item = ManualOverride>,
    margin: f64,
) -> usize {
    let factor = Decimal::ONE + Decimal::try_from(margin).unwrap_or(Decimal::ZERO);
    let mut applied = 0;

    for item in overrides {
        let existing = builder
            .iter()
            .filter(|r| r.source != Source::Override && item.matches(r))
            .map(|r| r.value)
            .max();
        match existing {
            None => {
                info!(
                    entity = %item.entity,
                    fiscal_year = item.fiscal_year,
                    segment = %item.segment_name,
                    "Applied override"
                );
            }
            Some(current) if item.revenue > current * factor => {
                info!(
                    entity = %item.entity,
                    fiscal_year = item.fiscal_year,
                    segment = %item.segment_name,
                    from = %current,
                    to = %item.revenue,
                    "Applied override (replaced)"
                );
            }
            Some(_) => continue,
        }
        builder.remove_where(|r| item.matches(r));
        builder.replace(item.into_record());
        applied += 1;
    }
    applied
}
