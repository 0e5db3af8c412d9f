//! Tabular rendering of fact records.

use finfacts_core::{FactError, FactRecord, Result, Validation};
use polars::prelude::*;

fn validation_label(validation: Option<&Validation>) -> Option<&'static str> {
    validation.map(|v| match v {
        Validation::Validated => "validated",
        Validation::Discrepancy { .. } => "discrepancy",
        Validation::PartialData => "partial_data",
        Validation::NoCrossCheck => "no_cross_check",
    })
}

/// Renders records as a DataFrame, one row per record in the given order.
///
/// Columns: `entity`, `fiscal_year`, `period`, `period_end` (date), `metric`,
/// `segment_type`, `value` (`f64`), `source`, `provenance`, `is_derived`,
/// `validation` and `yoy_change`. `segment_type` is null for income metrics
/// and `metric` holds the segment name for segment records.
///
/// # Errors
/// Returns an error if the frame cannot be assembled.
pub fn facts_to_frame(records: &[FactRecord]) -> Result<DataFrame> {
    let mut entities = Vec::with_capacity(records.len());
    let mut fiscal_years = Vec::with_capacity(records.len());
    let mut periods = Vec::with_capacity(records.len());
    let mut period_ends: Vec<Option<String>> = Vec::with_capacity(records.len());
    let mut metrics = Vec::with_capacity(records.len());
    let mut segment_types: Vec<Option<&str>> = Vec::with_capacity(records.len());
    let mut values = Vec::with_capacity(records.len());
    let mut sources = Vec::with_capacity(records.len());
    let mut provenances = Vec::with_capacity(records.len());
    let mut derived = Vec::with_capacity(records.len());
    let mut validations = Vec::with_capacity(records.len());
    let mut yoy = Vec::with_capacity(records.len());

    for record in records {
        entities.push(record.entity.as_str());
        fiscal_years.push(record.fiscal_year);
        periods.push(record.period.as_str());
        period_ends.push(record.period_end.map(|d| d.to_string()));
        match record.segment() {
            Some((name, kind)) => {
                metrics.push(name.to_string());
                segment_types.push(Some(kind.as_str()));
            }
            None => {
                metrics.push(record.metric.to_string());
                segment_types.push(None);
            }
        }
        values.push(record.value_f64());
        sources.push(record.source.as_str());
        provenances.push(record.provenance.as_str());
        derived.push(record.is_derived);
        validations.push(validation_label(record.validation.as_ref()));
        yoy.push(record.yoy_change);
    }

    let df = DataFrame::new(vec![
        Column::new("entity".into(), entities),
        Column::new("fiscal_year".into(), fiscal_years),
        Column::new("period".into(), periods),
        Column::new("period_end".into(), period_ends),
        Column::new("metric".into(), metrics),
        Column::new("segment_type".into(), segment_types),
        Column::new("value".into(), values),
        Column::new("source".into(), sources),
        Column::new("provenance".into(), provenances),
        Column::new("is_derived".into(), derived),
        Column::new("validation".into(), validations),
        Column::new("yoy_change".into(), yoy),
    ])
    .map_err(|e| FactError::Other(e.to_string()))?;

    df.lazy()
        .with_column(col("period_end").cast(DataType::Date))
        .collect()
        .map_err(|e| FactError::Other(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use finfacts_core::{FiscalPeriod, IncomeMetric, Metric, SegmentType, Source, Symbol};
    use rust_decimal::Decimal;

    fn records() -> Vec<FactRecord> {
        let mut revenue = FactRecord::new(
            Symbol::new("NVDA"),
            2025,
            FiscalPeriod::Fy,
            Metric::Income(IncomeMetric::Revenue),
            Decimal::from(130_497_000_000_i64),
            Source::Edgar,
        )
        .with_period_end(NaiveDate::from_ymd_opt(2025, 1, 26).unwrap());
        revenue.validation = Some(Validation::Validated);
        revenue.yoy_change = Some(114.2);

        let segment = FactRecord::new(
            Symbol::new("NVDA"),
            2025,
            FiscalPeriod::Q4,
            Metric::segment("Data Center", SegmentType::Product),
            Decimal::from(35_580_000_000_i64),
            Source::FilingTable,
        )
        .derived();

        vec![revenue, segment]
    }

    #[test]
    fn test_facts_to_frame() {
        let df = facts_to_frame(&records()).unwrap();
        assert_eq!(df.height(), 2);
        assert_eq!(df.width(), 12);
        assert_eq!(df.column("period_end").unwrap().dtype(), &DataType::Date);

        let metrics = df.column("metric").unwrap().str().unwrap();
        assert_eq!(metrics.get(0), Some("revenue"));
        assert_eq!(metrics.get(1), Some("Data Center"));

        let kinds = df.column("segment_type").unwrap().str().unwrap();
        assert_eq!(kinds.get(0), None);
        assert_eq!(kinds.get(1), Some("product"));

        let derived = df.column("is_derived").unwrap().bool().unwrap();
        assert_eq!(derived.get(1), Some(true));

        let validation = df.column("validation").unwrap().str().unwrap();
        assert_eq!(validation.get(0), Some("validated"));
        assert_eq!(validation.get(1), None);
    }

    #[test]
    fn test_empty_records() {
        let df = facts_to_frame(&[]).unwrap();
        assert_eq!(df.height(), 0);
        assert_eq!(df.width(), 12);
    }
}
