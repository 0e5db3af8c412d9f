//! Structured-facts extractor.
//!
//! Turns a [`CompanyFacts`] document into per-period [`IncomeStatement`]s.
//! The same (fiscal year, period) tag is usually reported several times: in
//! amendments, as prior-year comparatives, and for quarters both standalone
//! and year-to-date. The selection rules here pick one observation per tag.

use std::collections::{BTreeMap, HashMap};

use finfacts_core::{
    CompanyFacts, ConceptFacts, Entity, FactError, FactObservation, FiscalPeriod, IncomeMetric,
    IncomeStatement, Result, Source,
};
use tracing::debug;

/// Taxonomy holding the income-statement concepts.
const TAXONOMY: &str = "us-gaap";

/// Unit types scanned, in order.
const UNIT_TYPES: [&str; 3] = ["USD", "USD/shares", "pure"];

/// Duration assigned to observations without a start date, so they sort last.
const UNKNOWN_DURATION_DAYS: i64 = 999;

/// Concept names that carry a metric, in order of preference.
#[must_use]
pub const fn concept_aliases(metric: IncomeMetric) -> &'static [&'static str] {
    match metric {
        IncomeMetric::Revenue => &[
            "Revenues",
            "RevenueFromContractWithCustomerExcludingAssessedTax",
            "SalesRevenueNet",
            "RevenueFromContractWithCustomerIncludingAssessedTax",
        ],
        IncomeMetric::GrossProfit => &["GrossProfit"],
        IncomeMetric::OperatingIncome => &["OperatingIncomeLoss"],
        IncomeMetric::NetIncome => &["NetIncomeLoss", "ProfitLoss"],
        IncomeMetric::Eps => &[
            "EarningsPerShareDiluted",
            "EarningsPerShareBasicAndDiluted",
        ],
    }
}

/// Reporting cadence of the observations being selected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cadence {
    /// 10-K filings tagged `FY`.
    Annual,
    /// 10-Q filings tagged `Q1`..`Q4`.
    Quarterly,
}

impl Cadence {
    fn accepts_form(self, form: &str) -> bool {
        match self {
            Self::Annual => matches!(form, "10-K" | "10-K/A"),
            Self::Quarterly => matches!(form, "10-Q" | "10-Q/A"),
        }
    }

    fn accepts_period(self, period: FiscalPeriod) -> bool {
        match self {
            Self::Annual => period == FiscalPeriod::Fy,
            Self::Quarterly => period.is_quarter(),
        }
    }
}

/// Rule for choosing among annual observations of the same fiscal year.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Selection {
    /// Most recently filed observation.
    LatestFiled,
    /// Largest value. Used for revenue, which amended filings occasionally
    /// retag with lower figures.
    MaxValue,
}

/// Selects one observation per (fiscal year, period) from a concept.
///
/// Quarterly candidates are ranked by shortest duration (standalone quarter
/// over year-to-date), then by latest period end (current figure over a
/// prior-year comparative). Annual candidates follow `selection`.
#[must_use]
pub fn select_observations(
    concept: &ConceptFacts,
    cadence: Cadence,
    selection: Selection,
) -> BTreeMap<(i32, FiscalPeriod), &FactObservation> {
    let mut grouped: BTreeMap<(i32, FiscalPeriod), Vec<&FactObservation>> = BTreeMap::new();

    for unit in UNIT_TYPES {
        let Some(observations) = concept.units.get(unit) else {
            continue;
        };
        for obs in observations {
            let (Some(form), Some(fy), Some(fp)) = (obs.form.as_deref(), obs.fy, obs.fp.as_deref())
            else {
                continue;
            };
            if !cadence.accepts_form(form) {
                continue;
            }
            let Some(period) = FiscalPeriod::from_tag(fp) else {
                continue;
            };
            if cadence.accepts_period(period) {
                grouped.entry((fy, period)).or_default().push(obs);
            }
        }
    }

    grouped
        .into_iter()
        .filter_map(|(key, candidates)| pick(cadence, selection, &candidates).map(|obs| (key, obs)))
        .collect()
}

fn pick<'a>(
    cadence: Cadence,
    selection: Selection,
    candidates: &[&'a FactObservation],
) -> Option<&'a FactObservation> {
    let duration = |obs: &FactObservation| obs.duration_days().unwrap_or(UNKNOWN_DURATION_DAYS);
    let candidates = candidates.iter().copied();
    match (cadence, selection) {
        (Cadence::Quarterly, _) => {
            candidates.min_by(|a, b| {
                duration(*a)
                    .cmp(&duration(*b))
                    .then_with(|| b.end.cmp(&a.end))
            })
        }
        (Cadence::Annual, Selection::MaxValue) => candidates.max_by(|a, b| a.val.cmp(&b.val)),
        (Cadence::Annual, Selection::LatestFiled) => candidates.max_by(|a, b| a.filed.cmp(&b.filed)),
    }
}

/// What to extract from a facts document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FactsQuery {
    /// Metrics to extract.
    pub metrics: Vec<IncomeMetric>,
    /// Also extract quarterly records.
    pub include_quarterly: bool,
    /// Fiscal years kept, counting back from the latest observed.
    pub years: u32,
}

impl Default for FactsQuery {
    fn default() -> Self {
        Self {
            metrics: IncomeMetric::ALL.to_vec(),
            include_quarterly: true,
            years: 5,
        }
    }
}

/// Extracts income statements from structured facts documents.
#[derive(Clone, Debug, Default)]
pub struct StructuredFactsExtractor {
    query: FactsQuery,
}

impl StructuredFactsExtractor {
    /// Creates an extractor for a query.
    ///
    /// # Errors
    /// Returns [`FactError::InvalidParameter`] for an empty metric set or a
    /// zero-year lookback.
    pub fn new(query: FactsQuery) -> Result<Self> {
        if query.metrics.is_empty() {
            return Err(FactError::InvalidParameter("no metrics requested".to_string()));
        }
        if query.years == 0 {
            return Err(FactError::InvalidParameter("lookback of 0 years".to_string()));
        }
        Ok(Self { query })
    }

    /// Returns the query.
    #[must_use]
    pub const fn query(&self) -> &FactsQuery {
        &self.query
    }

    /// Extracts annual (and optionally quarterly) statements, ordered by
    /// descending fiscal year then period rank.
    ///
    /// Missing concepts are not an error: the metric is simply absent.
    #[must_use]
    pub fn extract(&self, entity: &Entity, facts: &CompanyFacts) -> Vec<IncomeStatement> {
        let Some(us_gaap) = facts.facts.get(TAXONOMY) else {
            debug!(entity = %entity.symbol, "No us-gaap facts");
            return Vec::new();
        };

        let mut statements = self.extract_cadence(entity, us_gaap, Cadence::Annual);
        if self.query.include_quarterly {
            statements.extend(self.extract_cadence(entity, us_gaap, Cadence::Quarterly));
        }
        statements.sort_by(|a, b| {
            (b.fiscal_year, b.period.rank()).cmp(&(a.fiscal_year, a.period.rank()))
        });

        debug!(
            entity = %entity.symbol,
            count = statements.len(),
            "Extracted income statements"
        );
        statements
    }

    fn extract_cadence(
        &self,
        entity: &Entity,
        us_gaap: &HashMap<String, ConceptFacts>,
        cadence: Cadence,
    ) -> Vec<IncomeStatement> {
        let mut by_period: BTreeMap<(i32, FiscalPeriod), IncomeStatement> = BTreeMap::new();

        for metric in &self.query.metrics {
            let selection = if *metric == IncomeMetric::Revenue {
                Selection::MaxValue
            } else {
                Selection::LatestFiled
            };

            for concept in concept_aliases(*metric) {
                let Some(concept_facts) = us_gaap.get(*concept) else {
                    continue;
                };
                for ((fy, period), obs) in select_observations(concept_facts, cadence, selection) {
                    let statement = by_period.entry((fy, period)).or_insert_with(|| {
                        let mut statement =
                            IncomeStatement::new(entity.symbol.clone(), fy, period, Source::Edgar);
                        statement.period_end = Some(obs.end);
                        statement.filed = obs.filed;
                        statement.provenance = provenance(entity, obs);
                        statement
                    });
                    // First alias with data for the period wins.
                    if statement.get(*metric).is_none() {
                        statement.set(*metric, obs.val);
                    }
                }
            }
        }

        let Some(latest) = by_period.keys().map(|(fy, _)| *fy).max() else {
            return Vec::new();
        };
        let span = i32::try_from(self.query.years).unwrap_or(i32::MAX);
        let earliest = latest.saturating_sub(span.saturating_sub(1));

        by_period
            .into_values()
            .rev()
            .filter(|statement| statement.fiscal_year >= earliest)
            .map(|mut statement| {
                statement.compute_margins();
                statement
            })
            .collect()
    }
}

fn provenance(entity: &Entity, obs: &FactObservation) -> String {
    match &obs.accn {
        Some(accn) => format!("edgar:companyfacts/CIK{}#{accn}", entity.cik),
        None => format!("edgar:companyfacts/CIK{}", entity.cik),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn obs(
        start: Option<&str>,
        end: &str,
        val: i64,
        fy: i32,
        fp: &str,
        form: &str,
        filed: &str,
    ) -> FactObservation {
        FactObservation {
            start: start.map(date),
            end: date(end),
            val: Decimal::from(val),
            accn: Some(format!("acc-{fy}-{fp}-{filed}")),
            fy: Some(fy),
            fp: Some(fp.to_string()),
            form: Some(form.to_string()),
            filed: Some(date(filed)),
            frame: None,
        }
    }

    fn facts(concepts: Vec<(&str, Vec<FactObservation>)>) -> CompanyFacts {
        let mut taxonomy = HashMap::new();
        for (name, observations) in concepts {
            let concept = ConceptFacts {
                units: HashMap::from([("USD".to_string(), observations)]),
                ..Default::default()
            };
            taxonomy.insert(name.to_string(), concept);
        }
        CompanyFacts {
            facts: HashMap::from([(TAXONOMY.to_string(), taxonomy)]),
            ..Default::default()
        }
    }

    fn entity() -> Entity {
        Entity::new("NVDA", "1045810", "NVIDIA", 1).unwrap()
    }

    #[test]
    fn test_standalone_quarter_beats_year_to_date() {
        let doc = facts(vec![(
            "Revenues",
            vec![
                obs(Some("2024-12-30"), "2025-06-30", 250, 2025, "Q2", "10-Q", "2025-08-01"),
                obs(Some("2025-03-31"), "2025-06-30", 100, 2025, "Q2", "10-Q", "2025-08-01"),
            ],
        )]);
        let concept = doc.concept(TAXONOMY, "Revenues").unwrap();
        let selected = select_observations(concept, Cadence::Quarterly, Selection::MaxValue);
        let q2 = selected[&(2025, FiscalPeriod::Q2)];
        assert_eq!(q2.duration_days(), Some(91));
        assert_eq!(q2.val, Decimal::from(100));
    }

    #[test]
    fn test_current_quarter_beats_prior_year_comparative() {
        let doc = facts(vec![(
            "Revenues",
            vec![
                obs(Some("2025-03-31"), "2025-06-30", 100, 2025, "Q2", "10-Q", "2025-08-01"),
                obs(Some("2024-03-31"), "2024-06-30", 80, 2025, "Q2", "10-Q", "2025-08-01"),
            ],
        )]);
        let concept = doc.concept(TAXONOMY, "Revenues").unwrap();
        let selected = select_observations(concept, Cadence::Quarterly, Selection::LatestFiled);
        assert_eq!(selected[&(2025, FiscalPeriod::Q2)].val, Decimal::from(100));
    }

    #[test]
    fn test_annual_selection_rules() {
        let doc = facts(vec![
            (
                "Revenues",
                vec![
                    obs(Some("2024-01-29"), "2025-01-26", 130_497, 2025, "FY", "10-K", "2025-02-26"),
                    obs(Some("2024-01-29"), "2025-01-26", 120_000, 2025, "FY", "10-K/A", "2025-05-01"),
                ],
            ),
            (
                "NetIncomeLoss",
                vec![
                    obs(Some("2024-01-29"), "2025-01-26", 72_000, 2025, "FY", "10-K", "2025-02-26"),
                    obs(Some("2024-01-29"), "2025-01-26", 72_880, 2025, "FY", "10-K/A", "2025-05-01"),
                ],
            ),
        ]);
        let extractor = StructuredFactsExtractor::new(FactsQuery {
            include_quarterly: false,
            ..Default::default()
        })
        .unwrap();
        let statements = extractor.extract(&entity(), &doc);
        assert_eq!(statements.len(), 1);
        let fy = &statements[0];
        assert_eq!(fy.period, FiscalPeriod::Fy);
        assert_eq!(fy.revenue, Some(Decimal::from(130_497)));
        assert_eq!(fy.net_income, Some(Decimal::from(72_880)));
        assert!(fy.net_margin.is_some());
        assert_eq!(fy.gross_margin, None);
    }

    #[test]
    fn test_alias_fallback_and_non_annual_forms_ignored() {
        let doc = facts(vec![(
            "RevenueFromContractWithCustomerExcludingAssessedTax",
            vec![
                obs(Some("2023-07-01"), "2024-06-30", 245_122, 2024, "FY", "10-K", "2024-07-30"),
                obs(Some("2023-07-01"), "2024-06-30", 999_999, 2024, "FY", "8-K", "2024-07-30"),
            ],
        )]);
        let extractor = StructuredFactsExtractor::default();
        let statements = extractor.extract(&entity(), &doc);
        assert_eq!(statements.len(), 1);
        assert_eq!(statements[0].revenue, Some(Decimal::from(245_122)));
    }

    #[test]
    fn test_ordering_and_lookback() {
        let mut observations = Vec::new();
        for fy in 2019..=2025 {
            let end = format!("{fy}-01-26");
            let start = format!("{}-01-29", fy - 1);
            observations.push(obs(Some(&start), &end, 1_000 + i64::from(fy), fy, "FY", "10-K", &end));
        }
        observations.push(obs(Some("2024-04-29"), "2024-07-28", 300, 2025, "Q2", "10-Q", "2024-08-28"));
        observations.push(obs(Some("2024-01-29"), "2024-04-28", 260, 2025, "Q1", "10-Q", "2024-05-29"));
        let doc = facts(vec![("Revenues", observations)]);

        let extractor = StructuredFactsExtractor::new(FactsQuery {
            years: 3,
            ..Default::default()
        })
        .unwrap();
        let statements = extractor.extract(&entity(), &doc);
        let labels: Vec<(i32, FiscalPeriod)> =
            statements.iter().map(|s| (s.fiscal_year, s.period)).collect();
        assert_eq!(
            labels,
            vec![
                (2025, FiscalPeriod::Fy),
                (2025, FiscalPeriod::Q2),
                (2025, FiscalPeriod::Q1),
                (2024, FiscalPeriod::Fy),
                (2023, FiscalPeriod::Fy),
            ]
        );
    }

    #[test]
    fn test_empty_document_and_invalid_query() {
        let extractor = StructuredFactsExtractor::default();
        assert!(extractor.extract(&entity(), &CompanyFacts::default()).is_empty());
        assert!(
            StructuredFactsExtractor::new(FactsQuery {
                years: 0,
                ..Default::default()
            })
            .is_err()
        );
    }
}
