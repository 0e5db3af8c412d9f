//! Derived quarterly and annual revenue.
//!
//! Fourth quarters are rarely disclosed on their own: 10-Qs cover Q1-Q3 and
//! the 10-K reports the full year. [`derive_fourth_quarters`] fills Q4 as
//! `FY - (Q1 + Q2 + Q3)`. [`annual_from_quarters`] goes the other way for
//! segments that are only disclosed quarterly.

use std::collections::BTreeMap;

use finfacts_core::{FactRecord, FiscalPeriod, Metric, Symbol};
use rust_decimal::Decimal;
use tracing::debug;

type SeriesKey = (Symbol, i32, Metric);

/// Per (entity, fiscal year, metric): the preferred observed record per
/// quarter and the largest annual record, across sources.
#[derive(Default)]
struct YearInputs<'a> {
    quarters: BTreeMap<FiscalPeriod, &'a FactRecord>,
    annual: Option<&'a FactRecord>,
}

fn collect_inputs(records: &[FactRecord]) -> BTreeMap<SeriesKey, YearInputs<'_>> {
    let mut inputs: BTreeMap<SeriesKey, YearInputs<'_>> = BTreeMap::new();
    for record in records {
        if !record.metric.is_revenue() || record.is_derived {
            continue;
        }
        let entry = inputs
            .entry((record.entity.clone(), record.fiscal_year, record.metric.clone()))
            .or_default();
        let slot = if record.period.is_quarter() {
            entry.quarters.get(&record.period).copied()
        } else {
            entry.annual
        };
        if slot.is_some_and(|current| current.value >= record.value) {
            continue;
        }
        if record.period.is_quarter() {
            entry.quarters.insert(record.period, record);
        } else {
            entry.annual = Some(record);
        }
    }
    inputs
}

/// Derives Q4 revenue for every series with observed, non-zero Q1-Q3 and a
/// known annual total.
///
/// A result that is not strictly positive is discarded. The derived record
/// takes the source of the Q3 input, so that it collides with (and, being
/// derived, replaces) a parsed Q4 from the same source.
#[must_use]
pub fn derive_fourth_quarters(records: &[FactRecord]) -> Vec<FactRecord> {
    let mut derived = Vec::new();
    for ((entity, fiscal_year, metric), inputs) in collect_inputs(records) {
        let Some(annual) = inputs.annual else {
            continue;
        };
        let quarters: Option<Vec<&FactRecord>> = [FiscalPeriod::Q1, FiscalPeriod::Q2, FiscalPeriod::Q3]
            .iter()
            .map(|q| inputs.quarters.get(q).copied().filter(|r| !r.value.is_zero()))
            .collect();
        let Some(quarters) = quarters else {
            continue;
        };

        let first_three: Decimal = quarters.iter().map(|r| r.value).sum();
        let q4 = annual.value - first_three;
        if q4 <= Decimal::ZERO {
            debug!(
                entity = %entity,
                fiscal_year,
                metric = %metric,
                "Rejected non-positive derived Q4"
            );
            continue;
        }

        let source = quarters[2].source;
        derived.push(
            FactRecord::new(entity, fiscal_year, FiscalPeriod::Q4, metric, q4, source)
                .with_provenance(format!("derived:FY-(Q1+Q2+Q3);fy={}", annual.provenance))
                .derived(),
        );
    }
    derived
}

/// Sums four observed quarters into an annual record where no annual record
/// exists for the series.
#[must_use]
pub fn annual_from_quarters(records: &[FactRecord]) -> Vec<FactRecord> {
    let mut derived = Vec::new();
    for ((entity, fiscal_year, metric), inputs) in collect_inputs(records) {
        if inputs.annual.is_some() || metric.as_segment().is_none() {
            continue;
        }
        let quarters: Option<Vec<&FactRecord>> = FiscalPeriod::QUARTERS
            .iter()
            .map(|q| inputs.quarters.get(q).copied().filter(|r| r.value > Decimal::ZERO))
            .collect();
        let Some(quarters) = quarters else {
            continue;
        };
        let total: Decimal = quarters.iter().map(|r| r.value).sum();
        let source = quarters[3].source;
        derived.push(
            FactRecord::new(entity, fiscal_year, FiscalPeriod::Annual, metric, total, source)
                .with_provenance("derived:Q1+Q2+Q3+Q4")
                .derived(),
        );
    }
    derived
}

#[cfg(test)]
mod tests {
    use super::*;
    use finfacts_core::{IncomeMetric, SegmentType, Source};

    fn record(period: FiscalPeriod, value: i64, source: Source) -> FactRecord {
        FactRecord::new(
            Symbol::new("NVDA"),
            2025,
            period,
            Metric::segment("Data Center", SegmentType::Product),
            Decimal::from(value),
            source,
        )
    }

    fn year(q1: i64, q2: i64, q3: i64, annual: i64) -> Vec<FactRecord> {
        vec![
            record(FiscalPeriod::Q1, q1, Source::PressRelease),
            record(FiscalPeriod::Q2, q2, Source::PressRelease),
            record(FiscalPeriod::Q3, q3, Source::PressRelease),
            record(FiscalPeriod::Annual, annual, Source::Fmp),
        ]
    }

    #[test]
    fn test_q4_is_annual_minus_first_three() {
        let records = year(22_563, 26_272, 30_771, 115_186);
        let derived = derive_fourth_quarters(&records);
        assert_eq!(derived.len(), 1);
        let q4 = &derived[0];
        assert_eq!(q4.period, FiscalPeriod::Q4);
        assert!(q4.is_derived);
        assert_eq!(q4.source, Source::PressRelease);
        assert_eq!(
            q4.value,
            records[3].value - (records[0].value + records[1].value + records[2].value)
        );
        assert!(q4.value > Decimal::ZERO);
    }

    #[test]
    fn test_no_q4_when_input_missing_or_zero() {
        let mut records = year(10, 20, 30, 100);
        records.remove(1);
        assert!(derive_fourth_quarters(&records).is_empty());

        let records = year(10, 0, 30, 100);
        assert!(derive_fourth_quarters(&records).is_empty());

        let mut records = year(10, 20, 30, 100);
        records.pop();
        assert!(derive_fourth_quarters(&records).is_empty());
    }

    #[test]
    fn test_non_positive_q4_rejected() {
        assert!(derive_fourth_quarters(&year(40, 30, 30, 100)).is_empty());
        assert!(derive_fourth_quarters(&year(50, 30, 30, 100)).is_empty());
    }

    #[test]
    fn test_largest_quarter_across_sources_used() {
        let mut records = year(10, 20, 30, 100);
        records.push(record(FiscalPeriod::Q1, 15, Source::FilingTable));
        let derived = derive_fourth_quarters(&records);
        assert_eq!(derived[0].value, Decimal::from(35));
    }

    #[test]
    fn test_derived_inputs_ignored() {
        let mut records = year(10, 20, 30, 100);
        records.pop();
        records.push(record(FiscalPeriod::Q4, 40, Source::PressRelease).derived());
        let annual = annual_from_quarters(&records);
        assert!(annual.is_empty());
    }

    #[test]
    fn test_annual_from_four_quarters() {
        let records = vec![
            record(FiscalPeriod::Q1, 10, Source::PressRelease),
            record(FiscalPeriod::Q2, 20, Source::PressRelease),
            record(FiscalPeriod::Q3, 30, Source::PressRelease),
            record(FiscalPeriod::Q4, 40, Source::PressRelease),
        ];
        let annual = annual_from_quarters(&records);
        assert_eq!(annual.len(), 1);
        assert_eq!(annual[0].value, Decimal::from(100));
        assert_eq!(annual[0].period, FiscalPeriod::Annual);
        assert!(annual[0].is_derived);

        let three = &records[..3];
        assert!(annual_from_quarters(three).is_empty());
    }

    #[test]
    fn test_total_revenue_q4() {
        let revenue = |period, value: i64| {
            FactRecord::new(
                Symbol::new("MSFT"),
                2024,
                period,
                Metric::Income(IncomeMetric::Revenue),
                Decimal::from(value),
                Source::Edgar,
            )
        };
        let records = vec![
            revenue(FiscalPeriod::Q1, 56),
            revenue(FiscalPeriod::Q2, 62),
            revenue(FiscalPeriod::Q3, 61),
            revenue(FiscalPeriod::Fy, 245),
        ];
        let derived = derive_fourth_quarters(&records);
        assert_eq!(derived[0].value, Decimal::from(66));
        assert_eq!(derived[0].source, Source::Edgar);
        assert!(annual_from_quarters(&records).is_empty());
    }
}
