#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/finfacts/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Reconciliation of facts gathered from several sources into one record per
//! key.
//!
//! [`Reconciler::reconcile`] runs the stages in a fixed order:
//!
//! 1. provider priority for annual segments
//! 2. revenue floor ([`apply_floor`](suppress::apply_floor))
//! 3. parent/child suppression ([`suppress_parents`](suppress::suppress_parents))
//! 4. merge with persisted records ([`FactSetBuilder`](factset::FactSetBuilder))
//! 5. Q4 derivation and cross-source collapse of quarterly segments
//! 6. annual totals from four quarters
//! 7. manual overrides
//! 8. cross-provider validation and year-over-year change
//!
//! Running the same input twice, feeding the first result back as persisted
//! records, yields the same [`FactSet`](factset::FactSet).

/// Q4 and annual derivation.
pub mod derive;
/// Keyed accumulation and the frozen fact set.
pub mod factset;
/// Manual overrides.
pub mod overrides;
/// Noise floor and parent suppression.
pub mod suppress;
/// Cross-provider validation.
pub mod validate;
/// Year-over-year change.
pub mod yoy;

pub use derive::{annual_from_quarters, derive_fourth_quarters};
pub use factset::{FactSet, FactSetBuilder, prefer};
pub use overrides::{ManualOverride, apply_overrides};
pub use suppress::{apply_floor, suppress_parents};
pub use validate::{compare, cross_check};
pub use yoy::annotate_yoy;

use finfacts_core::{Entity, FactRecord, ReconcileConfig, Result};
use tracing::{debug, info};

/// Everything gathered for one entity before reconciliation.
#[derive(Clone, Debug, Default)]
pub struct ReconcileInput {
    /// Income statement facts from the primary provider.
    pub income: Vec<FactRecord>,
    /// Income statement facts from the secondary provider, used only for
    /// validation.
    pub income_check: Vec<FactRecord>,
    /// Annual segments from the structured segment provider.
    pub annual_segments: Vec<FactRecord>,
    /// Annual segments parsed from filing tables, used when the provider has
    /// none for the entity.
    pub fallback_segments: Vec<FactRecord>,
    /// Quarterly segments from 10-Q tables and press releases.
    pub quarterly_segments: Vec<FactRecord>,
    /// Manually curated annual segment revenue.
    pub overrides: Vec<ManualOverride>,
    /// Records persisted by earlier runs.
    pub existing: Vec<FactRecord>,
}

/// Applies the reconciliation policy to one entity at a time.
#[derive(Clone, Debug, Default)]
pub struct Reconciler {
    config: ReconcileConfig,
}

impl Reconciler {
    /// Creates a reconciler, validating its configuration.
    ///
    /// # Errors
    /// Returns [`FactError::InvalidParameter`](finfacts_core::FactError::InvalidParameter)
    /// for out-of-range thresholds.
    pub fn new(config: ReconcileConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The active configuration.
    #[must_use]
    pub const fn config(&self) -> &ReconcileConfig {
        &self.config
    }

    /// Reconciles everything gathered for `entity` into a frozen fact set.
    ///
    /// Records of other entities in the input are ignored.
    #[must_use]
    pub fn reconcile(&self, entity: &Entity, input: ReconcileInput) -> FactSet {
        let ReconcileInput {
            income,
            income_check,
            annual_segments,
            fallback_segments,
            quarterly_segments,
            overrides,
            existing,
        } = input;

        let annual = if annual_segments.iter().any(|r| r.entity == entity.symbol) {
            annual_segments
        } else {
            if !fallback_segments.is_empty() {
                info!(
                    entity = %entity.symbol,
                    records = fallback_segments.len(),
                    "Using filing-table segments as fallback"
                );
            }
            fallback_segments
        };

        let fresh: Vec<FactRecord> = income
            .into_iter()
            .chain(annual)
            .chain(quarterly_segments)
            .filter(|r| r.entity == entity.symbol)
            .collect();
        let fresh = apply_floor(fresh, self.config.revenue_floor);
        let fresh = suppress_parents(fresh, entity, &self.config);

        let mut builder = FactSetBuilder::new();
        builder.extend(
            existing
                .into_iter()
                .filter(|r| r.entity == entity.symbol)
                .map(|mut r| {
                    r.validation = None;
                    r.yoy_change = None;
                    r
                }),
        );
        builder.extend(fresh);

        let derived_q4 = derive_fourth_quarters(&builder.iter().cloned().collect::<Vec<_>>());
        debug!(entity = %entity.symbol, derived = derived_q4.len(), "Derived Q4 records");
        builder.extend(derived_q4);
        let collapsed =
            builder.collapse_sources(|r| r.period.is_quarter() && r.metric.as_segment().is_some());
        debug!(entity = %entity.symbol, collapsed, "Collapsed quarterly segments across sources");

        let annual_sums = annual_from_quarters(&builder.iter().cloned().collect::<Vec<_>>());
        builder.extend(annual_sums);

        let applied = apply_overrides(
            &mut builder,
            overrides.into_iter().filter(|o| o.entity == entity.symbol),
            self.config.override_margin,
        );

        let mut records = builder.into_records();
        let check: Vec<FactRecord> = income_check
            .into_iter()
            .filter(|r| r.entity == entity.symbol)
            .collect();
        let discrepancies = cross_check(&mut records, &check, self.config.discrepancy_threshold);
        annotate_yoy(&mut records);

        info!(
            entity = %entity.symbol,
            records = records.len(),
            overrides = applied,
            discrepancies,
            "Reconciled"
        );
        records.into_iter().collect()
    }
}
