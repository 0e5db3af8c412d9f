//! Year-over-year change.

use std::collections::HashMap;

use finfacts_core::{FactRecord, FiscalPeriod, Metric, Source, Symbol};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

type SeriesKey<'a> = (&'a Symbol, &'a Metric, FiscalPeriod, Source, i32);

/// Sets `yoy_change` (in percent) on every record whose series has a positive
/// value for the prior fiscal year.
///
/// A series is one (entity, metric, period, source). Records without a usable
/// prior value are reset to `None`.
pub fn annotate_yoy(records: &mut [FactRecord]) {
    let values: HashMap<SeriesKey<'_>, Decimal> = records
        .iter()
        .map(|r| ((&r.entity, &r.metric, r.period, r.source, r.fiscal_year), r.value))
        .collect();

    let changes: Vec<Option<f64>> = records
        .iter()
        .map(|r| {
            let prior = values
                .get(&(&r.entity, &r.metric, r.period, r.source, r.fiscal_year - 1))
                .copied()
                .filter(|v| *v > Decimal::ZERO)?;
            ((r.value - prior) / prior * Decimal::ONE_HUNDRED).to_f64()
        })
        .collect();

    for (record, change) in records.iter_mut().zip(changes) {
        record.yoy_change = change;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use finfacts_core::SegmentType;

    fn gaming(fiscal_year: i32, value: i64, source: Source) -> FactRecord {
        FactRecord::new(
            Symbol::new("NVDA"),
            fiscal_year,
            FiscalPeriod::Annual,
            Metric::segment("Gaming", SegmentType::Product),
            Decimal::from(value),
            source,
        )
    }

    #[test]
    fn test_percent_change_against_prior_year() {
        let mut records = vec![
            gaming(2024, 100, Source::Fmp),
            gaming(2025, 125, Source::Fmp),
            gaming(2023, 0, Source::Fmp),
        ];
        annotate_yoy(&mut records);
        assert_eq!(records[0].yoy_change, None);
        assert_eq!(records[1].yoy_change, Some(25.0));
        assert_eq!(records[2].yoy_change, None);
    }

    #[test]
    fn test_series_do_not_mix_sources() {
        let mut records = vec![
            gaming(2024, 100, Source::Fmp),
            gaming(2025, 125, Source::FilingTable),
        ];
        annotate_yoy(&mut records);
        assert!(records.iter().all(|r| r.yoy_change.is_none()));
    }
}
