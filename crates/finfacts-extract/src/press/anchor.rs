//! Locating the reported fiscal period in press-release text.

use std::sync::LazyLock;

use chrono::NaiveDate;
use finfacts_core::{FiscalPeriod, fiscal_quarter_from_date};
use regex::{Captures, Regex};

const ORDINAL: &str = "(first|second|third|fourth)";
const MONTH: &str =
    "(january|february|march|april|may|june|july|august|september|october|november|december)";

static FISCAL_QUARTER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i){ORDINAL}\s+quarter\s+(?:of\s+)?fiscal\s+(\d{{4}})"))
        .expect("fiscal quarter regex")
});

static CALENDAR_QUARTER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i){ORDINAL}\s+quarter\s+(\d{{4}})")).expect("calendar quarter regex")
});

static THREE_MONTHS_ENDED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)three\s+months\s+ended\s+{MONTH}\s+(\d{{1,2}}),?\s+(\d{{4}})"))
        .expect("three months ended regex")
});

static ORDINAL_QUARTER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i){ORDINAL}\s+quarter")).expect("ordinal quarter regex")
});

static FISCAL_YEAR_TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)fiscal\s+(?:year\s+)?(\d{4})").expect("fiscal year tag regex")
});

static QUARTER_ENDED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)quarter\s+ended\s+{MONTH}\s+(\d{{1,2}}),?\s+(\d{{4}})"))
        .expect("quarter ended regex")
});

static APPLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)q([1-4])\s*fy\s*(\d{{4}}|\d{{2}})\b|fiscal\s+(\d{{4}})\s+{ORDINAL}\s+quarter|{ORDINAL}\s+(?:fiscal\s+)?quarter.*?fiscal\s+(\d{{4}})"
    ))
    .expect("apple anchor regex")
});

/// How an entity names the quarter it is reporting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Anchor {
    /// "Second Quarter Fiscal 2025" or "Second Quarter of Fiscal 2025".
    FiscalQuarter,
    /// "Fourth Quarter 2024", else "Three Months Ended December 31, 2024".
    CalendarQuarter {
        /// Fiscal-year-end month used for the date fallback.
        fiscal_year_end_month: u32,
    },
    /// Ordinal quarter with "Fiscal Year 2025", else "quarter ended <date>".
    FiscalYearTag {
        /// Fiscal-year-end month used for the date fallback.
        fiscal_year_end_month: u32,
    },
    /// "Q1 FY25", "fiscal 2025 first quarter" or "first quarter of fiscal 2025".
    AppleStyle,
}

impl Anchor {
    /// Resolves the reported (fiscal year, quarter), or `None` when the text
    /// carries no recognizable anchor.
    #[must_use]
    pub fn resolve(&self, text: &str) -> Option<(i32, FiscalPeriod)> {
        match *self {
            Self::FiscalQuarter => ordinal_and_year(&FISCAL_QUARTER_RE.captures(text)?, 1, 2),
            Self::CalendarQuarter {
                fiscal_year_end_month,
            } => CALENDAR_QUARTER_RE
                .captures(text)
                .and_then(|caps| ordinal_and_year(&caps, 1, 2))
                .or_else(|| {
                    let date = dated(&THREE_MONTHS_ENDED_RE.captures(text)?)?;
                    Some(fiscal_quarter_from_date(date, fiscal_year_end_month))
                }),
            Self::FiscalYearTag {
                fiscal_year_end_month,
            } => {
                let tagged = ORDINAL_QUARTER_RE.captures(text).and_then(|quarter| {
                    let period = FiscalPeriod::from_ordinal(&quarter[1])?;
                    let year = FISCAL_YEAR_TAG_RE.captures(text)?[1].parse().ok()?;
                    Some((year, period))
                });
                tagged.or_else(|| {
                    let date = dated(&QUARTER_ENDED_RE.captures(text)?)?;
                    Some(fiscal_quarter_from_date(date, fiscal_year_end_month))
                })
            }
            Self::AppleStyle => apple(&APPLE_RE.captures(text)?),
        }
    }
}

fn ordinal_and_year(caps: &Captures<'_>, ordinal: usize, year: usize) -> Option<(i32, FiscalPeriod)> {
    let period = FiscalPeriod::from_ordinal(caps.get(ordinal)?.as_str())?;
    let year = caps.get(year)?.as_str().parse().ok()?;
    Some((year, period))
}

/// Date from (month name, day, year) capture groups 1-3.
fn dated(caps: &Captures<'_>) -> Option<NaiveDate> {
    let month = month_number(&caps[1])?;
    let day = caps[2].parse().ok()?;
    let year = caps[3].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

fn month_number(name: &str) -> Option<u32> {
    const MONTHS: [&str; 12] = [
        "january",
        "february",
        "march",
        "april",
        "may",
        "june",
        "july",
        "august",
        "september",
        "october",
        "november",
        "december",
    ];
    let lower = name.to_lowercase();
    MONTHS
        .iter()
        .position(|m| *m == lower)
        .and_then(|idx| u32::try_from(idx + 1).ok())
}

fn apple(caps: &Captures<'_>) -> Option<(i32, FiscalPeriod)> {
    if let Some(quarter) = caps.get(1) {
        let period = FiscalPeriod::from_quarter(quarter.as_str().parse().ok()?)?;
        let year = caps.get(2)?.as_str();
        let year: i32 = year.parse().ok()?;
        let year = if year < 100 { 2000 + year } else { year };
        return Some((year, period));
    }
    if caps.get(3).is_some() {
        return ordinal_and_year(caps, 4, 3);
    }
    ordinal_and_year(caps, 5, 6)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fiscal_quarter() {
        let text = "NVIDIA Announces Financial Results for Second Quarter Fiscal 2026";
        assert_eq!(Anchor::FiscalQuarter.resolve(text), Some((2026, FiscalPeriod::Q2)));
        let text = "Micron Technology Reports Results for the First Quarter of Fiscal 2025";
        assert_eq!(Anchor::FiscalQuarter.resolve(text), Some((2025, FiscalPeriod::Q1)));
        assert_eq!(Anchor::FiscalQuarter.resolve("Annual meeting notice"), None);
    }

    #[test]
    fn test_calendar_quarter_with_date_fallback() {
        let anchor = Anchor::CalendarQuarter {
            fiscal_year_end_month: 12,
        };
        assert_eq!(
            anchor.resolve("Alphabet Announces Fourth Quarter 2024 Results"),
            Some((2024, FiscalPeriod::Q4))
        );
        assert_eq!(
            anchor.resolve("Consolidated results for the Three Months Ended September 30, 2024"),
            Some((2024, FiscalPeriod::Q3))
        );
        assert_eq!(anchor.resolve("no period here"), None);
    }

    #[test]
    fn test_fiscal_year_tag_with_date_fallback() {
        let anchor = Anchor::FiscalYearTag {
            fiscal_year_end_month: 6,
        };
        assert_eq!(
            anchor.resolve("Microsoft Cloud Strength Drives Second Quarter Results. Fiscal Year 2025"),
            Some((2025, FiscalPeriod::Q2))
        );
        assert_eq!(
            anchor.resolve("Results for the quarter ended December 31, 2024"),
            Some((2025, FiscalPeriod::Q2))
        );
    }

    #[test]
    fn test_apple_styles() {
        let anchor = Anchor::AppleStyle;
        assert_eq!(anchor.resolve("Apple reports Q1 FY25 results"), Some((2025, FiscalPeriod::Q1)));
        assert_eq!(
            anchor.resolve("Apple reports fiscal 2024 fourth quarter results"),
            Some((2024, FiscalPeriod::Q4))
        );
        assert_eq!(
            anchor.resolve("Apple reports third quarter results for fiscal 2024"),
            Some((2024, FiscalPeriod::Q3))
        );
        assert_eq!(anchor.resolve("Apple announces new iPhone"), None);
    }

    #[test]
    fn test_month_number() {
        assert_eq!(month_number("March"), Some(3));
        assert_eq!(month_number("DECEMBER"), Some(12));
        assert_eq!(month_number("Smarch"), None);
    }
}
