//! Strategies for press releases that print segment revenue as flattened
//! table rows: "<segment> 58,938 48,013", current quarter first.

use finfacts_core::{Result, Scale, SegmentObservation, Symbol, parse_money};
use rust_decimal::Decimal;

use super::{Anchor, DEFAULT_MIN_REVENUE, PressReleaseStrategy, SegmentTemplate};

const FIRST_NUMBER: &str = r"(?P<amount>\d[\d,]*)\b";

/// Reads the first number after each segment label, in millions.
///
/// Later numbers on the row are prior-period comparatives and are ignored.
#[derive(Clone, Debug)]
pub struct TabularStrategy {
    entity: Symbol,
    anchor: Anchor,
    templates: Vec<SegmentTemplate>,
    scale: Scale,
    min_revenue: Decimal,
}

impl TabularStrategy {
    /// Creates a strategy reading values in millions.
    #[must_use]
    pub fn new(entity: impl Into<Symbol>, anchor: Anchor, templates: Vec<SegmentTemplate>) -> Self {
        Self {
            entity: entity.into(),
            anchor,
            templates,
            scale: Scale::Millions,
            min_revenue: DEFAULT_MIN_REVENUE,
        }
    }

    /// Sets the magnitude of the printed figures.
    #[must_use]
    pub const fn with_scale(mut self, scale: Scale) -> Self {
        self.scale = scale;
        self
    }

    /// Sets the smallest plausible segment revenue.
    #[must_use]
    pub const fn with_min_revenue(mut self, min_revenue: Decimal) -> Self {
        self.min_revenue = min_revenue;
        self
    }

    /// Meta: "Family of Apps 58,938 48,013".
    ///
    /// # Errors
    /// Propagates pattern compilation errors.
    pub fn meta() -> Result<Self> {
        let templates = vec![
            SegmentTemplate::new("Family of Apps", &[format!(r"Family\s+of\s+Apps\s+{FIRST_NUMBER}")])?,
            SegmentTemplate::new("Reality Labs", &[format!(r"Reality\s+Labs\s+{FIRST_NUMBER}")])?,
        ];
        Ok(Self::new(
            "META",
            Anchor::CalendarQuarter {
                fiscal_year_end_month: 12,
            },
            templates,
        ))
    }

    /// Apple: "iPhone 46,222 50,231". Rows under $1B are comparatives or
    /// footnote numbers, not product lines.
    ///
    /// # Errors
    /// Propagates pattern compilation errors.
    pub fn apple() -> Result<Self> {
        let templates = vec![
            SegmentTemplate::new("iPhone", &[format!(r"iPhone\s+{FIRST_NUMBER}")])?,
            SegmentTemplate::new("Mac", &[format!(r"\bMac\s+{FIRST_NUMBER}")])?,
            SegmentTemplate::new("iPad", &[format!(r"iPad\s+{FIRST_NUMBER}")])?,
            SegmentTemplate::new(
                "Wearables, Home and Accessories",
                &[format!(r"Wearables,?\s*Home\s+and\s+Accessories\s+{FIRST_NUMBER}")],
            )?,
            SegmentTemplate::new("Services", &[format!(r"Services\s+{FIRST_NUMBER}")])?,
        ];
        Ok(Self::new("AAPL", Anchor::AppleStyle, templates)
            .with_min_revenue(Decimal::from(1_000_000_000)))
    }

    /// Micron: "Cloud Memory Business Unit Revenue $ 5,284".
    ///
    /// # Errors
    /// Propagates pattern compilation errors.
    pub fn micron() -> Result<Self> {
        const UNITS: &[&str] = &[
            "Cloud Memory",
            "Core Data Center",
            "Mobile and Client",
            "Automotive and Embedded",
            "Compute and Networking",
            "Storage",
        ];
        let templates = UNITS
            .iter()
            .map(|name| {
                let unit = name.split_whitespace().collect::<Vec<_>>().join(r"\s+");
                SegmentTemplate::new(
                    *name,
                    &[format!(
                        r"(?i)\b{unit}\s+Business\s+Unit\s+Revenue[^0-9]{{0,10}}{FIRST_NUMBER}"
                    )],
                )
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new("MU", Anchor::FiscalQuarter, templates))
    }
}

impl PressReleaseStrategy for TabularStrategy {
    fn entity(&self) -> &Symbol {
        &self.entity
    }

    fn extract(&self, text: &str) -> Vec<SegmentObservation> {
        let Some((fiscal_year, period)) = self.anchor.resolve(text) else {
            return Vec::new();
        };

        self.templates
            .iter()
            .filter_map(|template| {
                let caps = template.find(text)?;
                let revenue = self.scale.apply(parse_money(caps.name("amount")?.as_str())?)?;
                (revenue >= self.min_revenue).then(|| {
                    SegmentObservation::product(template.name(), fiscal_year, period, revenue)
                })
            })
            .collect()
    }
}
