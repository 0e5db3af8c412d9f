//! Entities and their registry.
//!
//! - [`Symbol`] - ticker symbol
//! - [`Entity`] - a covered organization with its fiscal calendar
//! - [`EntityRegistry`] - the covered set, looked up by ticker

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{FactError, Result};
use crate::period::{FiscalPeriod, fiscal_quarter_from_date};

/// A ticker symbol.
///
/// Symbols are uppercased on creation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Symbol(String);

impl Symbol {
    /// Creates a new symbol from a string, converting to uppercase.
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into().trim().to_uppercase())
    }

    /// Returns the symbol as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Symbol {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl From<&str> for Symbol {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Symbol {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// A covered organization.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    /// Ticker symbol.
    pub symbol: Symbol,
    /// SEC Central Index Key, zero-padded to 10 digits.
    pub cik: String,
    /// Display name.
    pub name: String,
    /// Month (1-12) in which the fiscal year ends.
    pub fiscal_year_end_month: u32,
    /// Lowercase company-name fragments that identify a restated total
    /// disguised as a segment.
    pub name_aliases: Vec<String>,
}

impl Entity {
    /// Creates an entity, validating the fiscal-year-end month and CIK.
    ///
    /// # Errors
    /// Returns [`FactError::InvalidParameter`] for a month outside 1-12 or a
    /// CIK that is not numeric.
    pub fn new(
        symbol: impl Into<Symbol>,
        cik: &str,
        name: impl Into<String>,
        fiscal_year_end_month: u32,
    ) -> Result<Self> {
        let symbol = symbol.into();
        if !(1..=12).contains(&fiscal_year_end_month) {
            return Err(FactError::InvalidParameter(format!(
                "fiscal year end month {fiscal_year_end_month} for {symbol}"
            )));
        }
        let digits = cik.trim();
        if digits.is_empty() || digits.len() > 10 || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(FactError::InvalidParameter(format!("CIK '{cik}' for {symbol}")));
        }
        Ok(Self {
            symbol,
            cik: format!("{digits:0>10}"),
            name: name.into(),
            fiscal_year_end_month,
            name_aliases: Vec::new(),
        })
    }

    /// Sets the company-name aliases.
    #[must_use]
    pub fn with_aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.name_aliases = aliases.into_iter().map(|a| a.into().to_lowercase()).collect();
        self
    }

    /// CIK without leading zeros, as used in archive paths.
    #[must_use]
    pub fn cik_unpadded(&self) -> &str {
        let trimmed = self.cik.trim_start_matches('0');
        if trimmed.is_empty() { "0" } else { trimmed }
    }

    /// Fiscal (year, quarter) containing a calendar period-end date.
    #[must_use]
    pub fn fiscal_quarter(&self, period_end: NaiveDate) -> (i32, FiscalPeriod) {
        fiscal_quarter_from_date(period_end, self.fiscal_year_end_month)
    }

    /// Returns true if `segment_name` names this company rather than a segment.
    #[must_use]
    pub fn is_own_name(&self, segment_name: &str) -> bool {
        let lower = segment_name.trim().to_lowercase();
        if lower == self.symbol.as_str().to_lowercase() {
            return true;
        }
        self.name_aliases.iter().any(|alias| lower.contains(alias.as_str()))
    }
}

/// Registry of covered entities keyed by ticker.
#[derive(Clone, Debug, Default)]
pub struct EntityRegistry {
    entities: BTreeMap<Symbol, Entity>,
}

impl EntityRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with the covered large-cap technology issuers.
    #[must_use]
    pub fn builtin() -> Self {
        const COVERED: &[(&str, &str, &str, u32, &[&str])] = &[
            ("NVDA", "1045810", "NVIDIA Corporation", 1, &["nvidia corp"]),
            ("GOOGL", "1652044", "Alphabet Inc.", 12, &["google inc", "alphabet"]),
            ("AMZN", "1018724", "Amazon.com, Inc.", 12, &["amazon.com", "amazon inc"]),
            ("META", "1326801", "Meta Platforms, Inc.", 12, &["meta platforms"]),
            ("MSFT", "789019", "Microsoft Corporation", 6, &["microsoft corp"]),
            ("AMD", "2488", "Advanced Micro Devices, Inc.", 12, &["advanced micro"]),
            ("AAPL", "320193", "Apple Inc.", 9, &["apple inc"]),
            ("ORCL", "1341439", "Oracle Corporation", 5, &["oracle corp"]),
            ("MU", "723125", "Micron Technology, Inc.", 8, &["micron technology"]),
            ("WDC", "106040", "Western Digital Corporation", 6, &["western digital"]),
            ("QCOM", "804328", "QUALCOMM Incorporated", 9, &["qualcomm inc"]),
            ("DELL", "1571996", "Dell Technologies Inc.", 1, &["dell technologies"]),
            ("HPQ", "47217", "HP Inc.", 10, &["hp inc"]),
        ];

        let mut registry = Self::new();
        for (symbol, cik, name, fye, aliases) in COVERED {
            if let Ok(entity) = Entity::new(*symbol, cik, *name, *fye) {
                registry.insert(entity.with_aliases(aliases.iter().copied()));
            }
        }
        registry
    }

    /// Adds or replaces an entity.
    pub fn insert(&mut self, entity: Entity) {
        self.entities.insert(entity.symbol.clone(), entity);
    }

    /// Looks up an entity by ticker.
    ///
    /// # Errors
    /// Returns [`FactError::UnknownEntity`] when the ticker is not covered.
    pub fn get(&self, symbol: &Symbol) -> Result<&Entity> {
        self.entities
            .get(symbol)
            .ok_or_else(|| FactError::UnknownEntity(symbol.to_string()))
    }

    /// Resolves every ticker, failing on the first unknown one.
    ///
    /// # Errors
    /// Returns [`FactError::UnknownEntity`] for the first ticker not covered.
    pub fn resolve_all(&self, symbols: &[Symbol]) -> Result<Vec<Entity>> {
        symbols.iter().map(|s| self.get(s).cloned()).collect()
    }

    /// Iterates entities in ticker order.
    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    /// Number of covered entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Returns true if no entity is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_creation() {
        assert_eq!(Symbol::new(" aapl ").as_str(), "AAPL");
        assert_eq!(Symbol::from("msft"), Symbol::new("MSFT"));
    }

    #[test]
    fn test_entity_validation() {
        assert!(Entity::new("ORCL", "1341439", "Oracle", 13).is_err());
        assert!(Entity::new("ORCL", "13414x9", "Oracle", 5).is_err());
        let entity = Entity::new("orcl", "1341439", "Oracle", 5).unwrap();
        assert_eq!(entity.cik, "0001341439");
        assert_eq!(entity.cik_unpadded(), "1341439");
    }

    #[test]
    fn test_builtin_registry() {
        let registry = EntityRegistry::builtin();
        assert_eq!(registry.len(), 13);
        let mu = registry.get(&Symbol::new("MU")).unwrap();
        assert_eq!(mu.fiscal_year_end_month, 8);
        assert_eq!(mu.cik, "0000723125");
        assert!(matches!(
            registry.get(&Symbol::new("XYZ")),
            Err(FactError::UnknownEntity(_))
        ));
    }

    #[test]
    fn test_resolve_all_fails_on_unknown() {
        let registry = EntityRegistry::builtin();
        let symbols = vec![Symbol::new("AAPL"), Symbol::new("NOPE")];
        assert!(registry.resolve_all(&symbols).is_err());
    }

    #[test]
    fn test_own_name_detection() {
        let registry = EntityRegistry::builtin();
        let googl = registry.get(&Symbol::new("GOOGL")).unwrap();
        assert!(googl.is_own_name("Alphabet Inc."));
        assert!(googl.is_own_name("GOOGL"));
        assert!(!googl.is_own_name("Google Cloud"));
    }
}
