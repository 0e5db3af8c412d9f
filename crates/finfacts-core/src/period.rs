//! Fiscal period definitions.
//!
//! This module defines [`FiscalPeriod`] for labeling a fact within an entity's
//! fiscal calendar, [`PeriodType`] for provider requests, and
//! [`fiscal_quarter_from_date`] for translating a calendar period-end date into
//! a fiscal (year, quarter) pair under a non-calendar fiscal-year convention.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Fiscal period label of a fact.
///
/// `Fy` is used for income-statement facts reported for a full fiscal year,
/// `Annual` for full-year segment revenue.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FiscalPeriod {
    /// First fiscal quarter.
    Q1,
    /// Second fiscal quarter.
    Q2,
    /// Third fiscal quarter.
    Q3,
    /// Fourth fiscal quarter.
    Q4,
    /// Full fiscal year (income statement).
    #[serde(rename = "FY")]
    Fy,
    /// Full fiscal year (segment revenue).
    #[serde(rename = "annual")]
    Annual,
}

impl FiscalPeriod {
    /// Quarters in fiscal order.
    pub const QUARTERS: [Self; 4] = [Self::Q1, Self::Q2, Self::Q3, Self::Q4];

    /// Sort rank: full year above Q4 above Q3 and so on.
    #[must_use]
    pub const fn rank(&self) -> u8 {
        match self {
            Self::Q1 => 1,
            Self::Q2 => 2,
            Self::Q3 => 3,
            Self::Q4 => 4,
            Self::Fy | Self::Annual => 5,
        }
    }

    /// Returns true for Q1 through Q4.
    #[must_use]
    pub const fn is_quarter(&self) -> bool {
        matches!(self, Self::Q1 | Self::Q2 | Self::Q3 | Self::Q4)
    }

    /// Returns true for full-year periods.
    #[must_use]
    pub const fn is_full_year(&self) -> bool {
        matches!(self, Self::Fy | Self::Annual)
    }

    /// Quarter for a 1-based quarter number.
    #[must_use]
    pub const fn from_quarter(n: u32) -> Option<Self> {
        match n {
            1 => Some(Self::Q1),
            2 => Some(Self::Q2),
            3 => Some(Self::Q3),
            4 => Some(Self::Q4),
            _ => None,
        }
    }

    /// Parses a filing period tag such as `"Q2"` or `"FY"`.
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_uppercase().as_str() {
            "Q1" => Some(Self::Q1),
            "Q2" => Some(Self::Q2),
            "Q3" => Some(Self::Q3),
            "Q4" => Some(Self::Q4),
            "FY" => Some(Self::Fy),
            "ANNUAL" => Some(Self::Annual),
            _ => None,
        }
    }

    /// Quarter for an English ordinal word ("first" .. "fourth").
    #[must_use]
    pub fn from_ordinal(word: &str) -> Option<Self> {
        match word.to_ascii_lowercase().as_str() {
            "first" => Some(Self::Q1),
            "second" => Some(Self::Q2),
            "third" => Some(Self::Q3),
            "fourth" => Some(Self::Q4),
            _ => None,
        }
    }

    /// Returns the canonical tag.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Q1 => "Q1",
            Self::Q2 => "Q2",
            Self::Q3 => "Q3",
            Self::Q4 => "Q4",
            Self::Fy => "FY",
            Self::Annual => "annual",
        }
    }
}

impl fmt::Display for FiscalPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Period type for provider requests.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PeriodType {
    /// Annual reporting period.
    #[default]
    Annual,
    /// Quarterly reporting period.
    Quarterly,
}

/// Resolves the fiscal year and quarter containing `date` for an entity whose
/// fiscal year ends in `fiscal_year_end_month` (1-12).
///
/// A fiscal year is named after the calendar year in which it ends, so for a
/// May year-end the quarter ending 2024-08-31 is Q1 of fiscal 2025.
///
/// ```
/// use chrono::NaiveDate;
/// use finfacts_core::period::{fiscal_quarter_from_date, FiscalPeriod};
///
/// let date = NaiveDate::from_ymd_opt(2024, 8, 31).unwrap();
/// assert_eq!(fiscal_quarter_from_date(date, 5), (2025, FiscalPeriod::Q1));
/// ```
#[must_use]
pub fn fiscal_quarter_from_date(date: NaiveDate, fiscal_year_end_month: u32) -> (i32, FiscalPeriod) {
    let fye = fiscal_year_end_month.clamp(1, 12);
    let fy_start_month = fye % 12 + 1;
    let month = date.month();

    let (months_into_year, fiscal_year) = if month >= fy_start_month {
        let fiscal_year = if fye == 12 { date.year() } else { date.year() + 1 };
        (month - fy_start_month + 1, fiscal_year)
    } else {
        (12 - fy_start_month + 1 + month, date.year())
    };

    let quarter = match months_into_year {
        1..=3 => FiscalPeriod::Q1,
        4..=6 => FiscalPeriod::Q2,
        7..=9 => FiscalPeriod::Q3,
        _ => FiscalPeriod::Q4,
    };
    (fiscal_year, quarter)
}
