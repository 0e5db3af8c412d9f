//! Earnings press-release parsing.
//!
//! Every covered entity words its press release differently, so extraction is
//! a [`PressReleaseStrategy`] per entity held in a [`PressReleaseRegistry`].
//! Supporting another entity means registering another strategy.
//!
//! # Example
//!
//! ```rust,ignore
//! use finfacts_extract::press::PressReleaseRegistry;
//!
//! let registry = PressReleaseRegistry::builtin();
//! let segments = registry.extract(&"NVDA".into(), &exhibit_html);
//! ```

mod anchor;
mod narrative;
mod tabular;

pub use anchor::Anchor;
pub use narrative::NarrativeStrategy;
pub use tabular::TabularStrategy;

use std::collections::HashMap;
use std::fmt;

use finfacts_core::{FactError, Result, SegmentObservation, Symbol};
use regex::{Captures, Regex};
use rust_decimal::Decimal;
use tracing::debug;

use crate::html::normalize_text;

/// Smallest segment revenue a strategy accepts unless configured otherwise.
pub const DEFAULT_MIN_REVENUE: Decimal = Decimal::from_parts(10_000_000, 0, 0, false, 0);

/// Extracts quarter-tagged segment revenue from normalized press-release text.
pub trait PressReleaseStrategy: Send + Sync + fmt::Debug {
    /// Entity this strategy parses.
    fn entity(&self) -> &Symbol;

    /// Extracts segment revenue.
    ///
    /// Text without a period anchor yields nothing.
    fn extract(&self, text: &str) -> Vec<SegmentObservation>;
}

/// A named segment and the phrasings that disclose its revenue.
///
/// Patterns are tried in order; the first match wins. Each pattern must have
/// an `amount` capture group and may have a `unit` group.
#[derive(Clone, Debug)]
pub struct SegmentTemplate {
    name: String,
    patterns: Vec<Regex>,
}

impl SegmentTemplate {
    /// Compiles a template.
    ///
    /// # Errors
    /// Returns [`FactError::InvalidParameter`] for an invalid pattern or one
    /// without an `amount` group.
    pub fn new<S: AsRef<str>>(name: impl Into<String>, patterns: &[S]) -> Result<Self> {
        let name = name.into();
        let patterns = patterns
            .iter()
            .map(|pattern| {
                let regex = Regex::new(pattern.as_ref()).map_err(|e| {
                    FactError::InvalidParameter(format!("pattern for segment '{name}': {e}"))
                })?;
                if !regex.capture_names().flatten().any(|group| group == "amount") {
                    return Err(FactError::InvalidParameter(format!(
                        "pattern for segment '{name}' has no amount group"
                    )));
                }
                Ok(regex)
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { name, patterns })
    }

    /// Segment name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    fn find<'t>(&self, text: &'t str) -> Option<Captures<'t>> {
        self.patterns.iter().find_map(|pattern| pattern.captures(text))
    }
}

/// Registry of press-release strategies keyed by entity.
#[derive(Default)]
pub struct PressReleaseRegistry {
    strategies: HashMap<Symbol, Box<dyn PressReleaseStrategy>>,
}

impl PressReleaseRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with strategies for NVDA, GOOGL, MSFT, AMZN, META, AAPL and MU.
    #[must_use]
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        let narrative = [
            NarrativeStrategy::nvidia(),
            NarrativeStrategy::alphabet(),
            NarrativeStrategy::microsoft(),
            NarrativeStrategy::amazon(),
        ];
        for strategy in narrative.into_iter().flatten() {
            registry.register(Box::new(strategy));
        }
        let tabular = [
            TabularStrategy::meta(),
            TabularStrategy::apple(),
            TabularStrategy::micron(),
        ];
        for strategy in tabular.into_iter().flatten() {
            registry.register(Box::new(strategy));
        }
        registry
    }

    /// Adds or replaces the strategy for its entity.
    pub fn register(&mut self, strategy: Box<dyn PressReleaseStrategy>) {
        self.strategies.insert(strategy.entity().clone(), strategy);
    }

    /// Strategy for an entity.
    #[must_use]
    pub fn get(&self, entity: &Symbol) -> Option<&dyn PressReleaseStrategy> {
        self.strategies.get(entity).map(|s| s.as_ref())
    }

    /// Returns true if the entity has a strategy.
    #[must_use]
    pub fn contains(&self, entity: &Symbol) -> bool {
        self.strategies.contains_key(entity)
    }

    /// Registered entities, sorted.
    #[must_use]
    pub fn entities(&self) -> Vec<&Symbol> {
        let mut entities: Vec<_> = self.strategies.keys().collect();
        entities.sort();
        entities
    }

    /// Normalizes a raw press-release document and runs the entity's strategy.
    ///
    /// Entities without a strategy yield nothing.
    #[must_use]
    pub fn extract(&self, entity: &Symbol, raw_html: &str) -> Vec<SegmentObservation> {
        let Some(strategy) = self.get(entity) else {
            debug!(entity = %entity, "No press-release strategy registered");
            return Vec::new();
        };
        let text = normalize_text(raw_html);
        let observations = strategy.extract(&text);
        debug!(
            entity = %entity,
            segments = observations.len(),
            "Parsed press release"
        );
        observations
    }
}

impl fmt::Debug for PressReleaseRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PressReleaseRegistry")
            .field("entities", &self.entities())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use finfacts_core::FiscalPeriod;

    #[derive(Debug)]
    struct FixedStrategy(Symbol);

    impl PressReleaseStrategy for FixedStrategy {
        fn entity(&self) -> &Symbol {
            &self.0
        }

        fn extract(&self, text: &str) -> Vec<SegmentObservation> {
            if text.contains("Widgets") {
                vec![SegmentObservation::product(
                    "Widgets",
                    2025,
                    FiscalPeriod::Q1,
                    Decimal::from(50_000_000),
                )]
            } else {
                Vec::new()
            }
        }
    }

    #[test]
    fn test_builtin_entities() {
        let registry = PressReleaseRegistry::builtin();
        let entities: Vec<&str> = registry.entities().iter().map(|s| s.as_str()).collect();
        assert_eq!(entities, vec!["AAPL", "AMZN", "GOOGL", "META", "MSFT", "MU", "NVDA"]);
        assert!(!registry.contains(&Symbol::new("ORCL")));
    }

    #[test]
    fn test_register_new_entity() {
        let mut registry = PressReleaseRegistry::new();
        registry.register(Box::new(FixedStrategy(Symbol::new("ACME"))));

        let found = registry.extract(&Symbol::new("ACME"), "<p>Widgets&nbsp;sold</p>");
        assert_eq!(found.len(), 1);
        assert!(registry.extract(&Symbol::new("OTHER"), "Widgets").is_empty());
    }

    #[test]
    fn test_extract_normalizes_markup() {
        let registry = PressReleaseRegistry::builtin();
        let html = "<html><body><h1>NVIDIA Announces Financial Results for Second Quarter Fiscal 2026</h1>\
                    <ul><li><b>Data&nbsp;Center</b> revenue of <span>$41.1</span> billion, up 5%</li></ul></body></html>";
        let found = registry.extract(&Symbol::new("NVDA"), html);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].segment_name, "Data Center");
        assert_eq!(found[0].revenue, Decimal::from(41_100_000_000_i64));
    }

    #[test]
    fn test_template_requires_amount_group() {
        assert!(SegmentTemplate::new("X", &[r"X\s+(\d+)"]).is_err());
        assert!(SegmentTemplate::new("X", &[r"X\s+("]).is_err());
        let template = SegmentTemplate::new("X", &[r"X\s+(?P<amount>\d+)"]).unwrap();
        assert_eq!(template.name(), "X");
    }

    #[test]
    fn test_default_min_revenue() {
        assert_eq!(DEFAULT_MIN_REVENUE, Decimal::from(10_000_000));
    }
}
