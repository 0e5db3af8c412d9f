//! Cross-provider validation of annual revenue.

use std::collections::HashMap;

use finfacts_core::{FactRecord, IncomeMetric, Metric, Symbol, Validation};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use tracing::warn;

fn is_annual_revenue(record: &FactRecord) -> bool {
    record.period.is_full_year() && record.metric == Metric::Income(IncomeMetric::Revenue)
}

/// Compares two figures for the same period.
///
/// The relative difference is taken against the primary value.
#[must_use]
pub fn compare(primary: Decimal, secondary: Option<Decimal>, threshold: f64) -> Validation {
    let Some(secondary) = secondary else {
        return Validation::NoCrossCheck;
    };
    if primary <= Decimal::ZERO || secondary <= Decimal::ZERO {
        return Validation::PartialData;
    }
    let relative_diff = ((primary - secondary).abs() / primary).to_f64().unwrap_or(f64::MAX);
    if relative_diff > threshold {
        Validation::Discrepancy {
            primary,
            secondary,
            relative_diff,
        }
    } else {
        Validation::Validated
    }
}

/// Annotates every annual total-revenue record in `primary` with the outcome
/// of comparing it against `secondary`.
///
/// Records of other metrics and periods are left unannotated. Returns the
/// number of discrepancies found.
pub fn cross_check(primary: &mut [FactRecord], secondary: &[FactRecord], threshold: f64) -> usize {
    let index: HashMap<(&Symbol, i32), Decimal> = secondary
        .iter()
        .filter(|r| is_annual_revenue(r))
        .map(|r| ((&r.entity, r.fiscal_year), r.value))
        .collect();

    let mut discrepancies = 0;
    for record in primary.iter_mut().filter(|r| is_annual_revenue(r)) {
        let other = index.get(&(&record.entity, record.fiscal_year)).copied();
        let validation = compare(record.value, other, threshold);
        if let Validation::Discrepancy {
            primary,
            secondary,
            relative_diff,
        } = &validation
        {
            warn!(
                entity = %record.entity,
                fiscal_year = record.fiscal_year,
                primary = %primary,
                secondary = %secondary,
                relative_diff,
                "Revenue discrepancy between providers"
            );
            discrepancies += 1;
        }
        record.validation = Some(validation);
    }
    discrepancies
}
