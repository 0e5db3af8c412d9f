//! Strategies for press releases that state segment revenue in sentences.

use finfacts_core::{Result, Scale, SegmentObservation, Symbol, parse_money};
use rust_decimal::Decimal;

use super::{Anchor, DEFAULT_MIN_REVENUE, PressReleaseStrategy, SegmentTemplate};

const AMOUNT: &str = r"\$\s*(?P<amount>[\d,]+(?:\.\d+)?)";

/// Reads "<segment> revenue was $X billion" style sentences.
///
/// The magnitude comes from the pattern's `unit` group when present and
/// defaults to billions.
#[derive(Clone, Debug)]
pub struct NarrativeStrategy {
    entity: Symbol,
    anchor: Anchor,
    templates: Vec<SegmentTemplate>,
    min_revenue: Decimal,
}

impl NarrativeStrategy {
    /// Creates a strategy.
    #[must_use]
    pub fn new(entity: impl Into<Symbol>, anchor: Anchor, templates: Vec<SegmentTemplate>) -> Self {
        Self {
            entity: entity.into(),
            anchor,
            templates,
            min_revenue: DEFAULT_MIN_REVENUE,
        }
    }

    /// Sets the smallest plausible segment revenue.
    #[must_use]
    pub const fn with_min_revenue(mut self, min_revenue: Decimal) -> Self {
        self.min_revenue = min_revenue;
        self
    }

    /// NVIDIA: "Data Center revenue of $41.1 billion" or
    /// "Gaming ... third-quarter revenue was $2.86 billion".
    ///
    /// # Errors
    /// Propagates pattern compilation errors.
    pub fn nvidia() -> Result<Self> {
        const SEGMENTS: &[&str] = &[
            "Data Center",
            "Gaming",
            "Gaming and AI PC",
            "Professional Visualization",
            "Automotive",
            "Automotive and Robotics",
            "OEM and Other",
        ];
        let templates = SEGMENTS
            .iter()
            .map(|name| {
                let segment = name.split_whitespace().map(regex::escape).collect::<Vec<_>>().join(r"\s+");
                SegmentTemplate::new(
                    *name,
                    &[
                        format!(
                            r"(?i){segment}\s+revenue\s+(?:of|was)\s+{AMOUNT}\s*(?P<unit>billion|million)"
                        ),
                        format!(
                            r"(?i){segment}[^.]*?(?:quarter|Q\d)\s+revenue\s+(?:of|was)\s+{AMOUNT}\s*(?P<unit>billion|million)"
                        ),
                    ],
                )
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new("NVDA", Anchor::FiscalQuarter, templates))
    }

    /// Alphabet: "Google Cloud revenues increased 34% to $15.2 billion".
    ///
    /// # Errors
    /// Propagates pattern compilation errors.
    pub fn alphabet() -> Result<Self> {
        let templates = vec![
            SegmentTemplate::new(
                "Google Services",
                &[format!(
                    r"(?i)Google\s+Services\s+revenues\s+(?:increased|decreased|grew)[^.]*?to\s+{AMOUNT}\s*billion"
                )],
            )?,
            SegmentTemplate::new(
                "Google Cloud",
                &[
                    format!(
                        r"(?i)Google\s+Cloud\s+revenues\s+(?:increased|decreased|grew)[^.]*?to\s+{AMOUNT}\s*billion"
                    ),
                    format!(
                        r"(?i)Google\s+Cloud\s+(?:saw|had|achieved|reported|posted)[^.]*?revenues\s+(?:increased|decreased|grew)[^.]*?to\s+{AMOUNT}\s*billion"
                    ),
                ],
            )?,
        ];
        Ok(Self::new(
            "GOOGL",
            Anchor::CalendarQuarter {
                fiscal_year_end_month: 12,
            },
            templates,
        ))
    }

    /// Microsoft: "Revenue in Intelligent Cloud was $25.5 billion".
    ///
    /// # Errors
    /// Propagates pattern compilation errors.
    pub fn microsoft() -> Result<Self> {
        const SEGMENTS: &[&str] = &[
            "Productivity and Business Processes",
            "Intelligent Cloud",
            "More Personal Computing",
        ];
        let templates = SEGMENTS
            .iter()
            .map(|name| {
                let segment = name.split_whitespace().collect::<Vec<_>>().join(r"\s+");
                SegmentTemplate::new(
                    *name,
                    &[format!(r"(?i)Revenue\s+in\s+{segment}\s+was\s+{AMOUNT}\s*billion")],
                )
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(
            "MSFT",
            Anchor::FiscalYearTag {
                fiscal_year_end_month: 6,
            },
            templates,
        ))
    }

    /// Amazon: "AWS segment sales increased 19% year-over-year to $27.5 billion".
    ///
    /// # Errors
    /// Propagates pattern compilation errors.
    pub fn amazon() -> Result<Self> {
        const SEGMENTS: &[&str] = &["North America", "International", "AWS"];
        let templates = SEGMENTS
            .iter()
            .map(|name| {
                let segment = name.split_whitespace().collect::<Vec<_>>().join(r"\s+");
                SegmentTemplate::new(
                    *name,
                    &[format!(
                        r"(?i){segment}\s+segment\s+sales\s+(?:increased|decreased).*?to\s+{AMOUNT}\s*billion"
                    )],
                )
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(
            "AMZN",
            Anchor::CalendarQuarter {
                fiscal_year_end_month: 12,
            },
            templates,
        ))
    }
}

impl PressReleaseStrategy for NarrativeStrategy {
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
                let amount = parse_money(caps.name("amount")?.as_str())?;
                let scale = caps
                    .name("unit")
                    .and_then(|unit| Scale::from_word(unit.as_str()))
                    .unwrap_or(Scale::Billions);
                let revenue = scale.apply(amount)?;
                (revenue >= self.min_revenue).then(|| {
                    SegmentObservation::product(template.name(), fiscal_year, period, revenue)
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use finfacts_core::FiscalPeriod;

    fn revenue(observations: &[SegmentObservation], name: &str) -> Option<Decimal> {
        observations
            .iter()
            .find(|o| o.segment_name == name)
            .map(|o| o.revenue)
    }

    #[test]
    fn test_nvidia_release() {
        let text = "NVIDIA Announces Financial Results for Second Quarter Fiscal 2026. \
                    Data Center revenue of $41.1 billion, up 5% from Q1. \
                    Gaming revenue was $4.3 billion, up 14%. \
                    Professional Visualization — Second-quarter revenue was $601 million. \
                    Automotive revenue was $586 million.";
        let found = NarrativeStrategy::nvidia().unwrap().extract(text);

        assert!(found.iter().all(|o| o.fiscal_year == 2026 && o.period == FiscalPeriod::Q2));
        assert_eq!(revenue(&found, "Data Center"), Some(Decimal::from(41_100_000_000_i64)));
        assert_eq!(revenue(&found, "Gaming"), Some(Decimal::from(4_300_000_000_i64)));
        assert_eq!(
            revenue(&found, "Professional Visualization"),
            Some(Decimal::from(601_000_000))
        );
        assert_eq!(revenue(&found, "Automotive"), Some(Decimal::from(586_000_000)));
    }

    #[test]
    fn test_missing_anchor_yields_nothing() {
        let text = "Data Center revenue of $41.1 billion.";
        assert!(NarrativeStrategy::nvidia().unwrap().extract(text).is_empty());
    }

    #[test]
    fn test_alphabet_release() {
        let text = "Alphabet Announces Fourth Quarter and Fiscal Year 2024 Results. \
                    Google Services revenues increased 10% to $84.1 billion. \
                    Google Cloud revenues increased 30% to $12.0 billion, led by AI.";
        let found = NarrativeStrategy::alphabet().unwrap().extract(text);
        // "Fourth Quarter and Fiscal Year 2024" has no "Fourth Quarter 2024".
        assert!(found.is_empty());

        let text = "Alphabet Announces Fourth Quarter 2024 Results. \
                    Google Services revenues increased 10% to $84.1 billion. \
                    Google Cloud saw strong demand; revenues increased 30% to $12.0 billion.";
        let found = NarrativeStrategy::alphabet().unwrap().extract(text);
        assert_eq!(found.len(), 2);
        assert_eq!(revenue(&found, "Google Cloud"), Some(Decimal::from(12_000_000_000_i64)));
        assert!(found.iter().all(|o| o.period == FiscalPeriod::Q4 && o.fiscal_year == 2024));
    }

    #[test]
    fn test_microsoft_release() {
        let text = "Microsoft Cloud Strength Drives Second Quarter Results. \
                    Revenue in Productivity and Business Processes was $29.4 billion. \
                    Revenue in Intelligent Cloud was $25.5 billion. \
                    Revenue in More Personal Computing was $14.7 billion. \
                    Quarter ended December 31, 2024.";
        let found = NarrativeStrategy::microsoft().unwrap().extract(text);
        assert_eq!(found.len(), 3);
        assert!(found.iter().all(|o| o.fiscal_year == 2025 && o.period == FiscalPeriod::Q2));
    }

    #[test]
    fn test_amazon_release() {
        let text = "Amazon.com Announces Third Quarter 2024 Results. \
                    North America segment sales increased 9% year-over-year to $95.5 billion. \
                    International segment sales increased 12% year-over-year to $35.9 billion. \
                    AWS segment sales increased 19% year-over-year to $27.5 billion.";
        let found = NarrativeStrategy::amazon().unwrap().extract(text);
        assert_eq!(found.len(), 3);
        assert_eq!(revenue(&found, "AWS"), Some(Decimal::from(27_500_000_000_i64)));
    }

    #[test]
    fn test_min_revenue_filter() {
        let text = "Second Quarter Fiscal 2026. Automotive revenue was $5 million.";
        let strategy = NarrativeStrategy::nvidia().unwrap();
        assert!(strategy.extract(text).is_empty());
        let permissive = strategy.with_min_revenue(Decimal::ONE);
        assert_eq!(permissive.extract(text).len(), 1);
    }
}
