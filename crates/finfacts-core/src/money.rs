//! Money parsing and formatting for filing text.
//!
//! Filing tables print amounts as `$ 1,234`, `(1,234)` for negatives and an
//! em-dash for "no value". [`parse_money`] turns those into decimals and
//! [`format_money`] prints a decimal back the same way.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Markers that stand for an absent figure rather than zero.
const MISSING_MARKERS: &[&str] = &["", "-", "\u{2014}", "\u{2013}"];

/// Printed form of an absent figure.
pub const MISSING: &str = "\u{2014}";

/// Parses a formatted money cell.
///
/// Returns `None` for dashes, empty cells and anything that is not a number.
///
/// ```
/// use finfacts_core::money::parse_money;
/// use rust_decimal::Decimal;
///
/// assert_eq!(parse_money("$ 1,234"), Some(Decimal::from(1234)));
/// assert_eq!(parse_money("(56)"), Some(Decimal::from(-56)));
/// assert_eq!(parse_money("\u{2014}"), None);
/// ```
#[must_use]
pub fn parse_money(text: &str) -> Option<Decimal> {
    let cleaned: String = text
        .chars()
        .filter(|c| *c != '$' && *c != ',' && !c.is_whitespace())
        .collect();

    if MISSING_MARKERS.contains(&cleaned.as_str()) {
        return None;
    }

    let (negative, digits) = match cleaned.strip_prefix('(').and_then(|s| s.strip_suffix(')')) {
        Some(inner) => (true, inner),
        None => (false, cleaned.as_str()),
    };

    if digits.is_empty() || MISSING_MARKERS.contains(&digits) {
        return None;
    }

    let value = Decimal::from_str(digits).ok()?;
    Some(if negative { -value } else { value })
}

/// Formats an amount the way filing tables print it.
///
/// Thousands are comma-separated, negatives are parenthesized and `None`
/// prints as an em-dash.
#[must_use]
pub fn format_money(value: Option<Decimal>) -> String {
    let Some(value) = value else {
        return MISSING.to_string();
    };

    let plain = value.abs().normalize().to_string();
    let (int_part, frac_part) = match plain.split_once('.') {
        Some((int_part, frac_part)) => (int_part, Some(frac_part)),
        None => (plain.as_str(), None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if let Some(frac) = frac_part {
        grouped.push('.');
        grouped.push_str(frac);
    }

    if value.is_sign_negative() && !value.is_zero() {
        format!("({grouped})")
    } else {
        grouped
    }
}

/// Magnitude word attached to an amount in narrative text.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Scale {
    /// Plain currency units.
    Units,
    /// Thousands.
    Thousands,
    /// Millions.
    Millions,
    /// Billions.
    Billions,
}

impl Scale {
    /// Parses "billion", "million" and friends, case-insensitively.
    #[must_use]
    pub fn from_word(word: &str) -> Option<Self> {
        match word.trim().to_ascii_lowercase().as_str() {
            "billion" | "billions" | "bn" | "b" => Some(Self::Billions),
            "million" | "millions" | "mm" | "m" => Some(Self::Millions),
            "thousand" | "thousands" | "k" => Some(Self::Thousands),
            _ => None,
        }
    }

    /// Multiplier to absolute currency.
    #[must_use]
    pub fn multiplier(&self) -> Decimal {
        match self {
            Self::Units => Decimal::ONE,
            Self::Thousands => Decimal::from(1_000),
            Self::Millions => Decimal::from(1_000_000),
            Self::Billions => Decimal::from(1_000_000_000),
        }
    }

    /// Scales a native amount to absolute currency, or `None` on overflow.
    #[must_use]
    pub fn apply(&self, amount: Decimal) -> Option<Decimal> {
        amount.checked_mul(self.multiplier())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_parse_money_variants() {
        assert_eq!(parse_money("10,000"), Some(dec("10000")));
        assert_eq!(parse_money(" $ 14,000 "), Some(dec("14000")));
        assert_eq!(parse_money("(1,234.5)"), Some(dec("-1234.5")));
        assert_eq!(parse_money("0"), Some(Decimal::ZERO));
        assert_eq!(parse_money("\u{00a0}2,500\u{00a0}"), Some(dec("2500")));
    }

    #[test]
    fn test_missing_markers_are_not_zero() {
        assert_eq!(parse_money("\u{2014}"), None);
        assert_eq!(parse_money("\u{2013}"), None);
        assert_eq!(parse_money("-"), None);
        assert_eq!(parse_money(""), None);
        assert_eq!(parse_money("$"), None);
        assert_eq!(parse_money("()"), None);
        assert_eq!(parse_money("n/a"), None);
    }

    #[test]
    fn test_format_money() {
        assert_eq!(format_money(Some(dec("1234567"))), "1,234,567");
        assert_eq!(format_money(Some(dec("-1234.50"))), "(1,234.5)");
        assert_eq!(format_money(Some(dec("999"))), "999");
        assert_eq!(format_money(Some(Decimal::ZERO)), "0");
        assert_eq!(format_money(None), MISSING);
    }

    #[test]
    fn test_round_trip() {
        let samples = [
            Some(dec("10000")),
            Some(dec("-42")),
            Some(dec("1234567.89")),
            Some(dec("-98765.4")),
            Some(Decimal::ZERO),
            None,
        ];
        for sample in samples {
            assert_eq!(parse_money(&format_money(sample)), sample, "{sample:?}");
        }
    }

    #[test]
    fn test_scale_words() {
        assert_eq!(Scale::from_word("Billion"), Some(Scale::Billions));
        assert_eq!(Scale::from_word("million"), Some(Scale::Millions));
        assert_eq!(Scale::from_word("dollars"), None);
        assert_eq!(Scale::Billions.apply(dec("30.8")), Some(dec("30800000000")));
    }

    #[test]
    fn test_scale_overflow_is_none() {
        assert_eq!(Scale::Millions.apply(Decimal::MAX), None);
        assert_eq!(Scale::Units.apply(Decimal::MAX), Some(Decimal::MAX));
    }
}
