//! Fact records and their keys.
//!
//! - [`FactRecord`] - the atomic output unit
//! - [`Metric`] - income-statement metric or segment revenue
//! - [`Source`] - provenance tag of a record
//! - [`FactKey`] - the uniqueness key of a reconciled record
//! - [`IncomeStatement`] - merged per-period income record
//! - [`SegmentObservation`] - parser output before provenance is attached

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::period::FiscalPeriod;
use crate::types::Symbol;

/// Income-statement line items tracked by the extractor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncomeMetric {
    /// Total revenue.
    Revenue,
    /// Gross profit.
    GrossProfit,
    /// Operating income (loss).
    OperatingIncome,
    /// Net income (loss).
    NetIncome,
    /// Diluted earnings per share.
    Eps,
}

impl IncomeMetric {
    /// All tracked metrics.
    pub const ALL: [Self; 5] = [
        Self::Revenue,
        Self::GrossProfit,
        Self::OperatingIncome,
        Self::NetIncome,
        Self::Eps,
    ];

    /// Column-style name of the metric.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Revenue => "revenue",
            Self::GrossProfit => "gross_profit",
            Self::OperatingIncome => "operating_income",
            Self::NetIncome => "net_income",
            Self::Eps => "eps",
        }
    }
}

/// Segment classification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentType {
    /// Product or business-line segment.
    Product,
    /// Geographic segment.
    Geography,
}

impl SegmentType {
    /// Lowercase name of the segment type.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Product => "product",
            Self::Geography => "geography",
        }
    }
}

/// What a fact measures.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// An income-statement metric.
    Income(IncomeMetric),
    /// Revenue of a named segment.
    Segment {
        /// Segment name as disclosed (after normalization).
        name: String,
        /// Product or geography.
        kind: SegmentType,
    },
}

impl Metric {
    /// Segment revenue metric.
    #[must_use]
    pub fn segment(name: impl Into<String>, kind: SegmentType) -> Self {
        Self::Segment {
            name: name.into(),
            kind,
        }
    }

    /// Returns the segment name and type for segment metrics.
    #[must_use]
    pub fn as_segment(&self) -> Option<(&str, SegmentType)> {
        match self {
            Self::Segment { name, kind } => Some((name.as_str(), *kind)),
            Self::Income(_) => None,
        }
    }

    /// Returns true for total revenue and any segment revenue.
    #[must_use]
    pub const fn is_revenue(&self) -> bool {
        matches!(self, Self::Income(IncomeMetric::Revenue) | Self::Segment { .. })
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Income(m) => f.write_str(m.as_str()),
            Self::Segment { name, kind } => write!(f, "{}:{name}", kind.as_str()),
        }
    }
}

/// Provenance tag of a record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    /// SEC EDGAR structured facts API.
    Edgar,
    /// Financial Modeling Prep structured API.
    Fmp,
    /// HTML table parsed out of a 10-K or 10-Q filing.
    FilingTable,
    /// Earnings press release (8-K exhibit).
    PressRelease,
    /// Manual override list.
    Override,
}

impl Source {
    /// Returns true for machine-readable providers.
    #[must_use]
    pub const fn is_structured(&self) -> bool {
        matches!(self, Self::Edgar | Self::Fmp)
    }

    /// Short provenance label.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Edgar => "edgar",
            Self::Fmp => "fmp",
            Self::FilingTable => "filing_table",
            Self::PressRelease => "press_release",
            Self::Override => "override",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of comparing a figure across independent providers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Validation {
    /// Both providers agree within the threshold.
    Validated,
    /// The providers disagree by more than the threshold.
    Discrepancy {
        /// Value of the record being validated.
        primary: Decimal,
        /// Value reported by the other provider.
        secondary: Decimal,
        /// `|primary - secondary| / primary`.
        relative_diff: f64,
    },
    /// Only one provider had a figure for the period.
    PartialData,
    /// No second provider was consulted.
    NoCrossCheck,
}

/// Uniqueness key of a reconciled record.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FactKey {
    /// Entity ticker.
    pub entity: Symbol,
    /// Fiscal year.
    pub fiscal_year: i32,
    /// Fiscal period.
    pub period: FiscalPeriod,
    /// Metric measured.
    pub metric: Metric,
    /// Provenance tag.
    pub source: Source,
}

/// The atomic output unit: one value for one metric in one fiscal period.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FactRecord {
    /// Entity ticker.
    pub entity: Symbol,
    /// Fiscal year.
    pub fiscal_year: i32,
    /// Fiscal period.
    pub period: FiscalPeriod,
    /// Calendar period-end date when known.
    pub period_end: Option<NaiveDate>,
    /// Metric measured.
    pub metric: Metric,
    /// Value in absolute currency (currency per share for EPS).
    pub value: Decimal,
    /// Provenance tag.
    pub source: Source,
    /// Document URL, accession or endpoint the value came from.
    pub provenance: String,
    /// True when computed from other records.
    pub is_derived: bool,
    /// Cross-provider validation outcome.
    pub validation: Option<Validation>,
    /// Year-over-year change in percent.
    pub yoy_change: Option<f64>,
}

impl FactRecord {
    /// Creates an observed (non-derived) record.
    #[must_use]
    pub fn new(
        entity: Symbol,
        fiscal_year: i32,
        period: FiscalPeriod,
        metric: Metric,
        value: Decimal,
        source: Source,
    ) -> Self {
        Self {
            entity,
            fiscal_year,
            period,
            period_end: None,
            metric,
            value,
            source,
            provenance: String::new(),
            is_derived: false,
            validation: None,
            yoy_change: None,
        }
    }

    /// Sets the period-end date.
    #[must_use]
    pub const fn with_period_end(mut self, period_end: NaiveDate) -> Self {
        self.period_end = Some(period_end);
        self
    }

    /// Sets the provenance string.
    #[must_use]
    pub fn with_provenance(mut self, provenance: impl Into<String>) -> Self {
        self.provenance = provenance.into();
        self
    }

    /// Marks the record as derived.
    #[must_use]
    pub const fn derived(mut self) -> Self {
        self.is_derived = true;
        self
    }

    /// Uniqueness key of this record.
    #[must_use]
    pub fn key(&self) -> FactKey {
        FactKey {
            entity: self.entity.clone(),
            fiscal_year: self.fiscal_year,
            period: self.period,
            metric: self.metric.clone(),
            source: self.source,
        }
    }

    /// Segment name and type when this is a segment record.
    #[must_use]
    pub fn segment(&self) -> Option<(&str, SegmentType)> {
        self.metric.as_segment()
    }

    /// Value as `f64` for ratio arithmetic.
    #[must_use]
    pub fn value_f64(&self) -> f64 {
        self.value.to_f64().unwrap_or(0.0)
    }
}

/// Segment revenue produced by a parser before provenance is attached.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentObservation {
    /// Segment name.
    pub segment_name: String,
    /// Product or geography.
    pub segment_type: SegmentType,
    /// Fiscal year.
    pub fiscal_year: i32,
    /// Fiscal period.
    pub period: FiscalPeriod,
    /// Revenue in absolute currency.
    pub revenue: Decimal,
}

impl SegmentObservation {
    /// Creates a product-segment observation.
    #[must_use]
    pub fn product(
        segment_name: impl Into<String>,
        fiscal_year: i32,
        period: FiscalPeriod,
        revenue: Decimal,
    ) -> Self {
        Self {
            segment_name: segment_name.into(),
            segment_type: SegmentType::Product,
            fiscal_year,
            period,
            revenue,
        }
    }

    /// Converts into a fact record attributed to `source`.
    #[must_use]
    pub fn into_fact(self, entity: &Symbol, source: Source, provenance: &str) -> FactRecord {
        FactRecord::new(
            entity.clone(),
            self.fiscal_year,
            self.period,
            Metric::segment(self.segment_name, self.segment_type),
            self.revenue,
            source,
        )
        .with_provenance(provenance)
    }
}

/// Merged income-statement record for one fiscal period.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IncomeStatement {
    /// Entity ticker.
    pub entity: Symbol,
    /// Fiscal year.
    pub fiscal_year: i32,
    /// `Fy` or a quarter.
    pub period: FiscalPeriod,
    /// Calendar period-end date.
    pub period_end: Option<NaiveDate>,
    /// Date the underlying filing was made.
    pub filed: Option<NaiveDate>,
    /// Where the figures came from.
    pub source: Source,
    /// Document or endpoint the figures came from.
    pub provenance: String,
    /// Total revenue.
    pub revenue: Option<Decimal>,
    /// Gross profit.
    pub gross_profit: Option<Decimal>,
    /// Operating income.
    pub operating_income: Option<Decimal>,
    /// Net income.
    pub net_income: Option<Decimal>,
    /// Diluted EPS.
    pub eps: Option<Decimal>,
    /// Gross profit / revenue.
    pub gross_margin: Option<f64>,
    /// Operating income / revenue.
    pub operating_margin: Option<f64>,
    /// Net income / revenue.
    pub net_margin: Option<f64>,
}

impl IncomeStatement {
    /// Creates an empty statement for a period.
    #[must_use]
    pub fn new(entity: Symbol, fiscal_year: i32, period: FiscalPeriod, source: Source) -> Self {
        Self {
            entity,
            fiscal_year,
            period,
            period_end: None,
            filed: None,
            source,
            provenance: String::new(),
            revenue: None,
            gross_profit: None,
            operating_income: None,
            net_income: None,
            eps: None,
            gross_margin: None,
            operating_margin: None,
            net_margin: None,
        }
    }

    /// Returns the value of `metric`.
    #[must_use]
    pub const fn get(&self, metric: IncomeMetric) -> Option<Decimal> {
        match metric {
            IncomeMetric::Revenue => self.revenue,
            IncomeMetric::GrossProfit => self.gross_profit,
            IncomeMetric::OperatingIncome => self.operating_income,
            IncomeMetric::NetIncome => self.net_income,
            IncomeMetric::Eps => self.eps,
        }
    }

    /// Sets the value of `metric`.
    pub fn set(&mut self, metric: IncomeMetric, value: Decimal) {
        match metric {
            IncomeMetric::Revenue => self.revenue = Some(value),
            IncomeMetric::GrossProfit => self.gross_profit = Some(value),
            IncomeMetric::OperatingIncome => self.operating_income = Some(value),
            IncomeMetric::NetIncome => self.net_income = Some(value),
            IncomeMetric::Eps => self.eps = Some(value),
        }
    }

    /// Recomputes gross, operating and net margins.
    ///
    /// Margins are left `None` unless revenue is positive.
    pub fn compute_margins(&mut self) {
        let revenue = self.revenue.and_then(|r| r.to_f64()).filter(|r| *r > 0.0);
        let ratio = |value: Option<Decimal>| -> Option<f64> {
            let revenue = revenue?;
            Some(value?.to_f64()? / revenue)
        };
        self.gross_margin = ratio(self.gross_profit);
        self.operating_margin = ratio(self.operating_income);
        self.net_margin = ratio(self.net_income);
    }

    /// Flattens into one fact record per present metric.
    #[must_use]
    pub fn to_facts(&self) -> Vec<FactRecord> {
        IncomeMetric::ALL
            .iter()
            .filter_map(|metric| {
                let value = self.get(*metric)?;
                let mut record = FactRecord::new(
                    self.entity.clone(),
                    self.fiscal_year,
                    self.period,
                    Metric::Income(*metric),
                    value,
                    self.source,
                )
                .with_provenance(self.provenance.clone());
                record.period_end = self.period_end;
                Some(record)
            })
            .collect()
    }
}
