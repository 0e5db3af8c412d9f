//! Noise floor and parent/child segment suppression.
//!
//! Providers and parsers sometimes report an aggregate segment next to the
//! children it is made of (e.g. "Google Advertising" alongside "Google Search
//! & Other", "YouTube Ads" and "Google Network"). Keeping both double counts
//! revenue, so each (fiscal year, period, segment type, source) group is
//! screened by three rules, in order:
//!
//! 1. duplicate value: two or more segments with the identical, material value
//!    are all dropped, since it is unclear which one is the atomic segment;
//! 2. entity name: a segment named after the company is a restated total;
//! 3. subset sum: a material segment matched by the sum of 2-4 strictly
//!    smaller segments is an aggregate.
//!
//! The rules can drop a legitimate segment whose value coincidentally equals
//! the sum of others. That false-positive risk is accepted.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use finfacts_core::{Entity, FactRecord, FiscalPeriod, ReconcileConfig, SegmentType, Source};
use itertools::Itertools;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use tracing::debug;

type GroupKey = (i32, FiscalPeriod, SegmentType, Source);

/// Drops revenue records (total or segment) below the noise floor.
#[must_use]
pub fn apply_floor(records: Vec<FactRecord>, floor: Decimal) -> Vec<FactRecord> {
    let before = records.len();
    let kept: Vec<FactRecord> = records
        .into_iter()
        .filter(|r| !r.metric.is_revenue() || r.value >= floor)
        .collect();
    if kept.len() < before {
        debug!(dropped = before - kept.len(), floor = %floor, "Dropped records below revenue floor");
    }
    kept
}

/// Removes parent aggregates from segment groups.
///
/// Non-segment records and groups of two or fewer segments pass through
/// untouched.
#[must_use]
pub fn suppress_parents(
    records: Vec<FactRecord>,
    entity: &Entity,
    config: &ReconcileConfig,
) -> Vec<FactRecord> {
    let mut groups: BTreeMap<GroupKey, Vec<(&str, Decimal)>> = BTreeMap::new();
    for record in &records {
        if record.entity != entity.symbol {
            continue;
        }
        if let Some((name, kind)) = record.segment() {
            groups
                .entry((record.fiscal_year, record.period, kind, record.source))
                .or_default()
                .push((name, record.value));
        }
    }

    let mut removed: BTreeSet<(GroupKey, String)> = BTreeSet::new();
    for (key, members) in &groups {
        if members.len() <= 2 {
            continue;
        }
        for name in parents_in_group(members, entity, config) {
            debug!(
                entity = %entity.symbol,
                fiscal_year = key.0,
                period = %key.1,
                segment = %name,
                "Suppressed parent segment"
            );
            removed.insert((*key, name));
        }
    }

    if removed.is_empty() {
        return records;
    }
    records
        .into_iter()
        .filter(|record| {
            let Some((name, kind)) = record.segment() else {
                return true;
            };
            if record.entity != entity.symbol {
                return true;
            }
            let key = (record.fiscal_year, record.period, kind, record.source);
            !removed.contains(&(key, name.to_string()))
        })
        .collect()
}

/// Names of the segments in one group that the three rules remove.
fn parents_in_group(
    members: &[(&str, Decimal)],
    entity: &Entity,
    config: &ReconcileConfig,
) -> BTreeSet<String> {
    let total: Decimal = members
        .iter()
        .map(|(_, value)| *value)
        .filter(|value| *value > Decimal::ZERO)
        .sum();
    let share = |value: Decimal| -> f64 {
        if total > Decimal::ZERO {
            (value / total).to_f64().unwrap_or(0.0)
        } else {
            0.0
        }
    };

    let mut removed = BTreeSet::new();

    let mut by_value: HashMap<Decimal, Vec<&str>> = HashMap::new();
    for (name, value) in members {
        if *value > Decimal::ZERO {
            by_value.entry(*value).or_default().push(*name);
        }
    }
    for (value, names) in &by_value {
        if names.len() > 1 && share(*value) > config.duplicate_share {
            removed.extend(names.iter().map(|n| (*n).to_string()));
        }
    }

    for (name, value) in members {
        if *value > Decimal::ZERO && entity.is_own_name(name) {
            removed.insert((*name).to_string());
        }
    }

    let remaining: Vec<(&str, Decimal)> = members
        .iter()
        .filter(|(name, _)| !removed.contains(*name))
        .copied()
        .collect();
    let mut parents = Vec::new();
    for (idx, (name, value)) in remaining.iter().enumerate() {
        if *value <= Decimal::ZERO || share(*value) < config.subset_materiality {
            continue;
        }
        let smaller: Vec<Decimal> = remaining
            .iter()
            .enumerate()
            .filter(|(other, (_, v))| *other != idx && *v > Decimal::ZERO && v < value)
            .map(|(_, (_, v))| *v)
            .collect();
        if is_subset_sum(*value, &smaller, config) {
            parents.push((*name).to_string());
        }
    }
    removed.extend(parents);
    removed
}

/// Returns true if some combination of `min_parts..=max_parts` of `parts`
/// sums to `target` within the configured tolerance.
fn is_subset_sum(target: Decimal, parts: &[Decimal], config: &ReconcileConfig) -> bool {
    if parts.len() < config.subset_min_parts || target <= Decimal::ZERO {
        return false;
    }
    let max_parts = config.subset_max_parts.min(parts.len());
    (config.subset_min_parts..=max_parts).any(|size| {
        parts.iter().copied().combinations(size).any(|combo| {
            let sum: Decimal = combo.into_iter().sum();
            sum > Decimal::ZERO
                && ((sum - target).abs() / target).to_f64().unwrap_or(f64::MAX)
                    < config.subset_tolerance
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use finfacts_core::{IncomeMetric, Metric, Symbol};

    fn alphabet() -> Entity {
        Entity::new("GOOGL", "1652044", "Alphabet Inc.", 12)
            .unwrap()
            .with_aliases(["google inc", "alphabet"])
    }

    fn billions(n: i64) -> Decimal {
        Decimal::from(n) * Decimal::from(1_000_000_000)
    }

    fn segment(name: &str, value: Decimal) -> FactRecord {
        FactRecord::new(
            Symbol::new("GOOGL"),
            2024,
            FiscalPeriod::Annual,
            Metric::segment(name, SegmentType::Product),
            value,
            Source::Fmp,
        )
    }

    fn names(records: &[FactRecord]) -> Vec<&str> {
        let mut names: Vec<&str> = records.iter().filter_map(|r| r.segment().map(|(n, _)| n)).collect();
        names.sort_unstable();
        names
    }

    #[test]
    fn test_floor_only_touches_revenue() {
        let records = vec![
            segment("Tiny", Decimal::from(9_999_999)),
            segment("Real", Decimal::from(10_000_000)),
            FactRecord::new(
                Symbol::new("GOOGL"),
                2024,
                FiscalPeriod::Fy,
                Metric::Income(IncomeMetric::Eps),
                Decimal::from(8),
                Source::Edgar,
            ),
        ];
        let kept = apply_floor(records, Decimal::from(10_000_000));
        assert_eq!(kept.len(), 2);
        assert_eq!(names(&kept), vec!["Real"]);
    }

    #[test]
    fn test_subset_sum_parent_removed() {
        let records = vec![
            segment("Google Advertising", billions(265)),
            segment("Google Search & Other", billions(198)),
            segment("YouTube Ads", billions(36)),
            segment("Google Network", billions(31)),
            segment("Google Cloud", billions(43)),
        ];
        let kept = suppress_parents(records, &alphabet(), &ReconcileConfig::default());
        assert_eq!(
            names(&kept),
            vec!["Google Cloud", "Google Network", "Google Search & Other", "YouTube Ads"]
        );
    }

    #[test]
    fn test_entity_name_segment_removed() {
        let records = vec![
            segment("Alphabet Total", billions(350)),
            segment("Google Services", billions(300)),
            segment("Google Cloud", billions(43)),
            segment("Other Bets", billions(2)),
        ];
        let kept = suppress_parents(records, &alphabet(), &ReconcileConfig::default());
        assert!(!names(&kept).contains(&"Alphabet Total"));
        assert_eq!(kept.len(), 3);
    }

    #[test]
    fn test_duplicate_material_values_removed() {
        let records = vec![
            segment("Services", billions(90)),
            segment("Services (b)", billions(90)),
            segment("Hardware", billions(60)),
            segment("Other", billions(5)),
        ];
        let kept = suppress_parents(records, &alphabet(), &ReconcileConfig::default());
        assert_eq!(names(&kept), vec!["Hardware", "Other"]);
    }

    #[test]
    fn test_small_coincidences_ignored() {
        // "Licensing" equals "Parts" + "Repairs" but is under 10% of the group.
        let records = vec![
            segment("Core", billions(100)),
            segment("Licensing", billions(5)),
            segment("Parts", billions(3)),
            segment("Repairs", billions(2)),
        ];
        let kept = suppress_parents(records.clone(), &alphabet(), &ReconcileConfig::default());
        assert_eq!(kept, records);
    }

    #[test]
    fn test_two_segment_groups_untouched() {
        let records = vec![segment("A", billions(10)), segment("B", billions(10))];
        let kept = suppress_parents(records.clone(), &alphabet(), &ReconcileConfig::default());
        assert_eq!(kept, records);
    }

    #[test]
    fn test_no_retained_segment_is_sum_of_others() {
        let records = vec![
            segment("Devices", billions(121)),
            segment("Phones", billions(71)),
            segment("Tablets", billions(31)),
            segment("Wearables", billions(19)),
            segment("Services", billions(83)),
            segment("Cloud", billions(47)),
        ];
        let config = ReconcileConfig::default();
        let kept = suppress_parents(records, &alphabet(), &config);
        assert!(!names(&kept).contains(&"Devices"));
        assert_eq!(kept.len(), 5);
        let total: Decimal = kept.iter().map(|r| r.value).sum();
        let values: Vec<Decimal> = kept.iter().map(|r| r.value).collect();
        for (idx, value) in values.iter().enumerate() {
            if (*value / total).to_f64().unwrap() < config.subset_materiality {
                continue;
            }
            let others: Vec<Decimal> = values
                .iter()
                .enumerate()
                .filter(|(j, v)| *j != idx && *v < value)
                .map(|(_, v)| *v)
                .collect();
            assert!(!is_subset_sum(*value, &others, &config), "{value} is an aggregate");
        }
    }

    #[test]
    fn test_groups_are_per_source() {
        let mut records = vec![
            segment("Google Services", billions(300)),
            segment("Google Cloud", billions(43)),
        ];
        let mut table = segment("Google Services", billions(300));
        table.source = Source::FilingTable;
        records.push(table);
        let kept = suppress_parents(records.clone(), &alphabet(), &ReconcileConfig::default());
        assert_eq!(kept, records);
    }
}
