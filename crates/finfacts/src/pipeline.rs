//! Per-entity extraction runs.

use std::fmt;
use std::sync::Arc;

use finfacts_core::{
    Entity, EntityRegistry, FactError, FactRecord, FactStore, FactsRepository, FilingMeta,
    FilingsRepository, FormType, IncomeProvider, PeriodType, Result, SegmentProvider,
    SegmentType, Source, Symbol,
};
use finfacts_extract::{
    FactsQuery, PressReleaseRegistry, SegmentTableParser, StructuredFactsExtractor,
};
use finfacts_reconcile::{FactSet, ManualOverride, ReconcileInput, Reconciler};
use tracing::{debug, info, instrument, warn};

use crate::config::RunConfig;

/// Passes fatal errors through and downgrades the rest to a warning and an
/// empty result.
fn tolerate<T: Default>(result: Result<T>, entity: &Symbol, what: &str) -> Result<T> {
    match result {
        Ok(value) => Ok(value),
        Err(e) if e.is_fatal() => Err(e),
        Err(e) => {
            warn!(entity = %entity, error = %e, what, "Skipping after provider failure");
            Ok(T::default())
        }
    }
}

/// Document counters of one entity run.
#[derive(Debug, Default)]
struct Gathered {
    documents_parsed: usize,
    documents_skipped: usize,
}

/// Outcome of a run for one entity.
#[derive(Clone, Debug)]
pub struct EntityReport {
    /// Entity ticker.
    pub entity: Symbol,
    /// Reconciled records, merged with persisted ones when a store is set.
    pub facts: FactSet,
    /// Income statement records extracted from structured facts.
    pub income_records: usize,
    /// Annual segment records gathered before reconciliation.
    pub annual_segments: usize,
    /// Quarterly segment records gathered before reconciliation.
    pub quarterly_segments: usize,
    /// Filing documents and press releases parsed.
    pub documents_parsed: usize,
    /// Documents skipped after a fetch failure.
    pub documents_skipped: usize,
}

/// An entity whose run failed without stopping the batch.
#[derive(Debug)]
pub struct EntityFailure {
    /// Entity ticker.
    pub entity: Symbol,
    /// What went wrong.
    pub error: FactError,
}

/// Outcome of a batch run.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Per-entity reports, in input order.
    pub reports: Vec<EntityReport>,
    /// Entities that failed.
    pub failures: Vec<EntityFailure>,
}

impl BatchReport {
    /// All reconciled records of the batch.
    #[must_use]
    pub fn records(&self) -> Vec<FactRecord> {
        self.reports
            .iter()
            .flat_map(|report| report.facts.iter().cloned())
            .collect()
    }

    /// Returns true if every entity succeeded.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Wires providers, extractors, the reconciler and an optional store.
///
/// A structured facts repository is required; every other source is
/// optional and simply contributes nothing when absent.
///
/// # Example
///
/// ```rust,ignore
/// use finfacts::{EdgarConfig, FactPipeline, RunConfig};
///
/// let pipeline = FactPipeline::new()
///     .with_edgar(EdgarConfig::new("MyApp/1.0 (contact@example.com)"))?;
/// let entity = pipeline.registry().get(&"NVDA".into())?.clone();
/// let report = pipeline.run_entity(&entity, &RunConfig::default()).await?;
/// ```
pub struct FactPipeline {
    registry: EntityRegistry,
    facts: Option<Arc<dyn FactsRepository>>,
    filings: Option<Arc<dyn FilingsRepository>>,
    segments: Option<Arc<dyn SegmentProvider>>,
    income: Option<Arc<dyn IncomeProvider>>,
    press: PressReleaseRegistry,
    tables: SegmentTableParser,
    reconciler: Reconciler,
    overrides: Vec<ManualOverride>,
    store: Option<Arc<dyn FactStore>>,
}

impl fmt::Debug for FactPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FactPipeline")
            .field("entities", &self.registry.len())
            .field("facts", &self.facts.as_ref().map(|p| p.name()))
            .field("filings", &self.filings.as_ref().map(|p| p.name()))
            .field("segments", &self.segments.as_ref().map(|p| p.name()))
            .field("income", &self.income.as_ref().map(|p| p.name()))
            .field("press", &self.press)
            .field("reconciler", &self.reconciler)
            .field("overrides", &self.overrides.len())
            .field("store", &self.store.as_ref().map(|_| "configured"))
            .finish()
    }
}

impl Default for FactPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl FactPipeline {
    /// Pipeline over the built-in entity registry and press-release
    /// strategies, with no providers registered.
    #[must_use]
    pub fn new() -> Self {
        Self {
            registry: EntityRegistry::builtin(),
            facts: None,
            filings: None,
            segments: None,
            income: None,
            press: PressReleaseRegistry::builtin(),
            tables: SegmentTableParser::default(),
            reconciler: Reconciler::default(),
            overrides: Vec::new(),
            store: None,
        }
    }

    /// Covered entities.
    #[must_use]
    pub const fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    /// Replaces the entity registry.
    #[must_use]
    pub fn with_registry(mut self, registry: EntityRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Sets the structured facts repository.
    #[must_use]
    pub fn with_facts_repository(mut self, repository: Arc<dyn FactsRepository>) -> Self {
        debug!(provider = repository.name(), "Registering facts repository");
        self.facts = Some(repository);
        self
    }

    /// Sets the filings repository.
    #[must_use]
    pub fn with_filings_repository(mut self, repository: Arc<dyn FilingsRepository>) -> Self {
        debug!(provider = repository.name(), "Registering filings repository");
        self.filings = Some(repository);
        self
    }

    /// Sets the structured segment provider.
    #[must_use]
    pub fn with_segment_provider(mut self, provider: Arc<dyn SegmentProvider>) -> Self {
        debug!(provider = provider.name(), "Registering segment provider");
        self.segments = Some(provider);
        self
    }

    /// Sets the income provider used to cross-check revenue.
    #[must_use]
    pub fn with_income_provider(mut self, provider: Arc<dyn IncomeProvider>) -> Self {
        debug!(provider = provider.name(), "Registering income provider");
        self.income = Some(provider);
        self
    }

    /// Replaces the press-release strategies.
    #[must_use]
    pub fn with_press_registry(mut self, press: PressReleaseRegistry) -> Self {
        self.press = press;
        self
    }

    /// Replaces the filing table parser.
    #[must_use]
    pub fn with_table_parser(mut self, tables: SegmentTableParser) -> Self {
        self.tables = tables;
        self
    }

    /// Replaces the reconciler.
    #[must_use]
    pub fn with_reconciler(mut self, reconciler: Reconciler) -> Self {
        self.reconciler = reconciler;
        self
    }

    /// Sets the manual overrides applied during reconciliation.
    #[must_use]
    pub fn with_overrides(mut self, overrides: Vec<ManualOverride>) -> Self {
        self.overrides = overrides;
        self
    }

    /// Sets the store that results are merged into.
    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn FactStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Uses SEC EDGAR for structured facts and filings.
    ///
    /// # Errors
    /// Returns an error for an invalid configuration.
    #[cfg(feature = "edgar")]
    pub fn with_edgar(self, config: finfacts_edgar::EdgarConfig) -> Result<Self> {
        let client = Arc::new(finfacts_edgar::EdgarClient::new(config)?);
        Ok(self
            .with_facts_repository(client.clone())
            .with_filings_repository(client))
    }

    /// Uses Financial Modeling Prep for segments and revenue cross-checks.
    ///
    /// # Errors
    /// Returns an error for an invalid configuration.
    #[cfg(feature = "fmp")]
    pub fn with_fmp(self, config: finfacts_fmp::FmpConfig) -> Result<Self> {
        let client = Arc::new(finfacts_fmp::FmpClient::new(config)?);
        Ok(self
            .with_segment_provider(client.clone())
            .with_income_provider(client))
    }

    /// Runs every source for one entity and reconciles the results.
    ///
    /// Failed documents are skipped; fatal provider errors (rate limits,
    /// rejected credentials) abort the run.
    ///
    /// # Errors
    /// Returns an error for an invalid run configuration, a missing facts
    /// repository, a fatal provider error or a store failure.
    #[instrument(skip_all, fields(entity = %entity.symbol))]
    pub async fn run_entity(&self, entity: &Entity, config: &RunConfig) -> Result<EntityReport> {
        config.validate()?;
        let facts_repository = self.facts.as_ref().ok_or_else(|| {
            FactError::ProviderNotConfigured("No facts repository registered".to_string())
        })?;
        let extractor = StructuredFactsExtractor::new(FactsQuery {
            include_quarterly: config.include_quarterly,
            years: config.years,
            ..Default::default()
        })?;
        let mut gathered = Gathered::default();

        let company_facts = facts_repository.company_facts(entity).await?;
        let income: Vec<FactRecord> = extractor
            .extract(entity, &company_facts)
            .iter()
            .flat_map(|statement| statement.to_facts())
            .collect();

        let income_check = self.income_check(entity, config).await?;

        let annual_segments = self.provider_segments(entity, PeriodType::Annual).await?;
        let fallback_segments = if annual_segments.is_empty() && config.filing_tables {
            self.annual_filing_segments(entity, &mut gathered).await?
        } else {
            Vec::new()
        };

        let mut quarterly_segments = Vec::new();
        if config.include_quarterly {
            quarterly_segments.extend(self.provider_segments(entity, PeriodType::Quarterly).await?);
            if config.filing_tables {
                quarterly_segments.extend(
                    self.quarterly_filing_segments(entity, config.quarterly_filings, &mut gathered)
                        .await?,
                );
            }
            quarterly_segments.extend(
                self.press_release_segments(entity, config.press_releases, &mut gathered)
                    .await?,
            );
        }

        let existing = match &self.store {
            Some(store) => store.load(&entity.symbol).await?,
            None => Vec::new(),
        };

        let income_records = income.len();
        let annual_count = annual_segments.len() + fallback_segments.len();
        let quarterly_count = quarterly_segments.len();

        let facts = self.reconciler.reconcile(
            entity,
            ReconcileInput {
                income,
                income_check,
                annual_segments,
                fallback_segments,
                quarterly_segments,
                overrides: self
                    .overrides
                    .iter()
                    .filter(|o| o.entity == entity.symbol)
                    .cloned()
                    .collect(),
                existing,
            },
        );

        if let Some(store) = &self.store {
            store.save(&entity.symbol, facts.records()).await?;
        }

        info!(
            income = income_records,
            annual_segments = annual_count,
            quarterly_segments = quarterly_count,
            documents = gathered.documents_parsed,
            skipped = gathered.documents_skipped,
            records = facts.len(),
            "Entity run complete"
        );

        Ok(EntityReport {
            entity: entity.symbol.clone(),
            facts,
            income_records,
            annual_segments: annual_count,
            quarterly_segments: quarterly_count,
            documents_parsed: gathered.documents_parsed,
            documents_skipped: gathered.documents_skipped,
        })
    }

    /// Runs a batch of entities one after another.
    ///
    /// Every ticker is resolved before any work starts. Entity failures are
    /// recorded and the batch continues, except for fatal errors, which stop
    /// it.
    ///
    /// # Errors
    /// Returns [`FactError::UnknownEntity`] for a ticker missing from the
    /// registry, an invalid run configuration, or the first fatal error.
    #[instrument(skip_all, fields(entities = symbols.len()))]
    pub async fn run_batch(&self, symbols: &[Symbol], config: &RunConfig) -> Result<BatchReport> {
        config.validate()?;
        let entities = self.registry.resolve_all(symbols)?;

        let mut batch = BatchReport::default();
        for entity in &entities {
            match self.run_entity(entity, config).await {
                Ok(report) => batch.reports.push(report),
                Err(e) if e.is_fatal() => {
                    warn!(entity = %entity.symbol, error = %e, "Aborting batch");
                    return Err(e);
                }
                Err(e) => {
                    warn!(entity = %entity.symbol, error = %e, "Entity run failed");
                    batch.failures.push(EntityFailure {
                        entity: entity.symbol.clone(),
                        error: e,
                    });
                }
            }
        }

        info!(
            succeeded = batch.reports.len(),
            failed = batch.failures.len(),
            "Batch run complete"
        );
        Ok(batch)
    }

    async fn income_check(&self, entity: &Entity, config: &RunConfig) -> Result<Vec<FactRecord>> {
        let Some(provider) = &self.income else {
            return Ok(Vec::new());
        };
        let limit = usize::try_from(config.years).unwrap_or(usize::MAX);
        let statements = tolerate(
            provider.fetch_income(entity, PeriodType::Annual, limit).await,
            &entity.symbol,
            "income statements",
        )?;
        Ok(statements.iter().flat_map(|s| s.to_facts()).collect())
    }

    async fn provider_segments(
        &self,
        entity: &Entity,
        period_type: PeriodType,
    ) -> Result<Vec<FactRecord>> {
        let Some(provider) = &self.segments else {
            return Ok(Vec::new());
        };
        let mut records = Vec::new();
        for segment_type in [SegmentType::Product, SegmentType::Geography] {
            records.extend(tolerate(
                provider.fetch_segments(entity, segment_type, period_type).await,
                &entity.symbol,
                segment_type.as_str(),
            )?);
        }
        Ok(records)
    }

    /// Fetches a filing's primary document, counting it as skipped on a
    /// non-fatal failure.
    async fn fetch_primary(
        &self,
        repository: &dyn FilingsRepository,
        entity: &Entity,
        filing: &FilingMeta,
        gathered: &mut Gathered,
    ) -> Result<Option<String>> {
        match repository
            .fetch_document(entity, &filing.accession, &filing.primary_document)
            .await
        {
            Ok(html) => {
                gathered.documents_parsed += 1;
                Ok(Some(html))
            }
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                warn!(
                    entity = %entity.symbol,
                    accession = %filing.accession,
                    error = %e,
                    "Skipping filing document"
                );
                gathered.documents_skipped += 1;
                Ok(None)
            }
        }
    }

    async fn annual_filing_segments(
        &self,
        entity: &Entity,
        gathered: &mut Gathered,
    ) -> Result<Vec<FactRecord>> {
        let Some(repository) = &self.filings else {
            return Ok(Vec::new());
        };
        let filings = repository.list_filings(entity, FormType::TenK, 1).await?;
        let Some(filing) = filings.first() else {
            debug!(entity = %entity.symbol, "No annual report filed");
            return Ok(Vec::new());
        };
        let Some(html) = self
            .fetch_primary(repository.as_ref(), entity, filing, gathered)
            .await?
        else {
            return Ok(Vec::new());
        };

        let url = repository.document_url(entity, &filing.accession, &filing.primary_document);
        Ok(self
            .tables
            .parse_document(&html)
            .into_iter()
            .map(|o| o.into_fact(&entity.symbol, Source::FilingTable, &url))
            .collect())
    }

    async fn quarterly_filing_segments(
        &self,
        entity: &Entity,
        limit: usize,
        gathered: &mut Gathered,
    ) -> Result<Vec<FactRecord>> {
        let Some(repository) = &self.filings else {
            return Ok(Vec::new());
        };
        if limit == 0 {
            return Ok(Vec::new());
        }

        let mut records = Vec::new();
        for filing in repository.list_filings(entity, FormType::TenQ, limit).await? {
            let Some(report_date) = filing.report_date else {
                debug!(accession = %filing.accession, "Quarterly filing without report date");
                continue;
            };
            let Some(html) = self
                .fetch_primary(repository.as_ref(), entity, &filing, gathered)
                .await?
            else {
                continue;
            };
            let url = repository.document_url(entity, &filing.accession, &filing.primary_document);
            records.extend(
                self.tables
                    .parse_quarterly(&html, entity, report_date)
                    .into_iter()
                    .map(|o| o.into_fact(&entity.symbol, Source::FilingTable, &url)),
            );
        }
        Ok(records)
    }

    async fn press_release_segments(
        &self,
        entity: &Entity,
        limit: usize,
        gathered: &mut Gathered,
    ) -> Result<Vec<FactRecord>> {
        let Some(repository) = &self.filings else {
            return Ok(Vec::new());
        };
        if limit == 0 || !self.press.contains(&entity.symbol) {
            return Ok(Vec::new());
        }

        let mut records = Vec::new();
        for filing in repository.list_filings(entity, FormType::EightK, limit).await? {
            let html = match repository.find_press_release(entity, &filing).await {
                Ok(Some(html)) => html,
                Ok(None) => continue,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!(
                        entity = %entity.symbol,
                        accession = %filing.accession,
                        error = %e,
                        "Skipping press release"
                    );
                    gathered.documents_skipped += 1;
                    continue;
                }
            };
            gathered.documents_parsed += 1;
            let url = repository.document_url(entity, &filing.accession, &filing.primary_document);
            records.extend(
                self.press
                    .extract(&entity.symbol, &html)
                    .into_iter()
                    .map(|o| o.into_fact(&entity.symbol, Source::PressRelease, &url)),
            );
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use finfacts_core::{
        CompanyFacts, ConceptFacts, DataProvider, FactObservation, FiscalPeriod, IncomeMetric,
        IncomeStatement, Metric, SegmentObservation, Validation,
    };
    use finfacts_extract::PressReleaseStrategy;
    use finfacts_store::InMemoryStore;
    use rust_decimal::Decimal;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const TEN_K: &str = r#"<html><body><table>
        <tr><td colspan="3">Revenue by business unit (in millions)</td></tr>
        <tr><td></td><td>2024</td><td>2025</td></tr>
        <tr><td>Cloud Memory</td><td>4,000</td><td>6,000</td></tr>
        <tr><td>Mobile and Client</td><td>9,000</td><td>11,000</td></tr>
    </table></body></html>"#;

    const TEN_Q: &str = r#"<table>
        <tr><td>Revenue by business unit (in millions)</td><td></td><td></td></tr>
        <tr><td>Net revenue</td><td>2024</td><td>2023</td></tr>
        <tr><td>Cloud Memory</td><td>1,500</td><td>1,100</td></tr>
        <tr><td>Mobile and Client</td><td>2,400</td><td>1,900</td></tr>
    </table>"#;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn micron() -> Entity {
        EntityRegistry::builtin().get(&Symbol::new("MU")).unwrap().clone()
    }

    fn filing(accession: &str, form: &str, report_date: Option<&str>, document: &str) -> FilingMeta {
        FilingMeta {
            accession: accession.to_string(),
            form: form.to_string(),
            filing_date: None,
            report_date: report_date.map(date),
            primary_document: document.to_string(),
        }
    }

    fn annual_revenue(fy: i32, end: &str, value: i64) -> FactObservation {
        FactObservation {
            start: None,
            end: date(end),
            val: Decimal::from(value),
            accn: Some(format!("0000723125-{fy}-000001")),
            fy: Some(fy),
            fp: Some("FY".to_string()),
            form: Some("10-K".to_string()),
            filed: Some(date(end)),
            frame: None,
        }
    }

    fn company_facts() -> CompanyFacts {
        let revenues = ConceptFacts {
            units: HashMap::from([(
                "USD".to_string(),
                vec![
                    annual_revenue(2024, "2024-08-29", 25_111_000_000),
                    annual_revenue(2025, "2025-08-28", 37_378_000_000),
                ],
            )]),
            ..Default::default()
        };
        CompanyFacts {
            facts: HashMap::from([(
                "us-gaap".to_string(),
                HashMap::from([("Revenues".to_string(), revenues)]),
            )]),
            ..Default::default()
        }
    }

    /// In-process stand-in for the filings and facts source.
    #[derive(Debug, Default)]
    struct FakeFilings {
        facts: CompanyFacts,
        filings: Vec<FilingMeta>,
        documents: HashMap<String, String>,
        press_releases: HashMap<String, String>,
        facts_requests: AtomicUsize,
    }

    impl DataProvider for FakeFilings {
        fn name(&self) -> &str {
            "fake filings"
        }

        fn description(&self) -> &str {
            "in-process filings"
        }
    }

    #[async_trait]
    impl FactsRepository for FakeFilings {
        async fn company_facts(&self, _entity: &Entity) -> Result<CompanyFacts> {
            self.facts_requests.fetch_add(1, Ordering::SeqCst);
            Ok(self.facts.clone())
        }
    }

    #[async_trait]
    impl FilingsRepository for FakeFilings {
        async fn list_filings(
            &self,
            _entity: &Entity,
            form: FormType,
            limit: usize,
        ) -> Result<Vec<FilingMeta>> {
            Ok(self
                .filings
                .iter()
                .filter(|f| form.matches(&f.form))
                .take(limit)
                .cloned()
                .collect())
        }

        async fn fetch_document(
            &self,
            _entity: &Entity,
            _accession: &str,
            document: &str,
        ) -> Result<String> {
            self.documents
                .get(document)
                .cloned()
                .ok_or_else(|| FactError::Timeout(document.to_string()))
        }

        async fn find_press_release(
            &self,
            _entity: &Entity,
            filing: &FilingMeta,
        ) -> Result<Option<String>> {
            Ok(self.press_releases.get(&filing.accession).cloned())
        }

        fn document_url(&self, _entity: &Entity, accession: &str, document: &str) -> String {
            format!("fake://{accession}/{document}")
        }
    }

    /// In-process stand-in for the structured segment and income provider.
    #[derive(Debug, Default)]
    struct FakeFundamentals {
        segments: Vec<FactRecord>,
        income: Vec<IncomeStatement>,
        rate_limited: bool,
    }

    impl DataProvider for FakeFundamentals {
        fn name(&self) -> &str {
            "fake fundamentals"
        }

        fn description(&self) -> &str {
            "in-process fundamentals"
        }
    }

    impl FakeFundamentals {
        fn check_quota(&self) -> Result<()> {
            if self.rate_limited {
                return Err(FactError::RateLimited {
                    provider: "fake".to_string(),
                    retry_after: None,
                });
            }
            Ok(())
        }
    }

    #[async_trait]
    impl SegmentProvider for FakeFundamentals {
        async fn fetch_segments(
            &self,
            entity: &Entity,
            segment_type: SegmentType,
            period_type: PeriodType,
        ) -> Result<Vec<FactRecord>> {
            self.check_quota()?;
            Ok(self
                .segments
                .iter()
                .filter(|r| r.entity == entity.symbol)
                .filter(|r| r.segment().is_some_and(|(_, kind)| kind == segment_type))
                .filter(|r| (period_type == PeriodType::Annual) == r.period.is_full_year())
                .cloned()
                .collect())
        }
    }

    #[async_trait]
    impl IncomeProvider for FakeFundamentals {
        async fn fetch_income(
            &self,
            _entity: &Entity,
            _period_type: PeriodType,
            limit: usize,
        ) -> Result<Vec<IncomeStatement>> {
            self.check_quota()?;
            Ok(self.income.iter().take(limit).cloned().collect())
        }
    }

    #[derive(Debug)]
    struct MicronRelease(Symbol);

    impl PressReleaseStrategy for MicronRelease {
        fn entity(&self) -> &Symbol {
            &self.0
        }

        fn extract(&self, text: &str) -> Vec<SegmentObservation> {
            if !text.contains("Cloud Memory") {
                return Vec::new();
            }
            vec![SegmentObservation::product(
                "Cloud Memory",
                2025,
                FiscalPeriod::Q2,
                Decimal::from(1_700_000_000_i64),
            )]
        }
    }

    fn filings_source() -> FakeFilings {
        FakeFilings {
            facts: company_facts(),
            filings: vec![
                filing("q1", "10-Q", Some("2024-11-28"), "mu-20241128.htm"),
                filing("q0", "10-Q", None, "mu-undated.htm"),
                filing("k1", "10-K", Some("2025-08-28"), "mu-20250828.htm"),
                filing("e1", "8-K", None, "mu-8k.htm"),
            ],
            documents: HashMap::from([
                ("mu-20241128.htm".to_string(), TEN_Q.to_string()),
                ("mu-20250828.htm".to_string(), TEN_K.to_string()),
            ]),
            press_releases: HashMap::from([(
                "e1".to_string(),
                "<p>Cloud Memory revenue grew</p>".to_string(),
            )]),
            ..Default::default()
        }
    }

    fn fmp_revenue(fy: i32, value: i64) -> IncomeStatement {
        let mut statement = IncomeStatement::new(Symbol::new("MU"), fy, FiscalPeriod::Fy, Source::Fmp);
        statement.set(IncomeMetric::Revenue, Decimal::from(value));
        statement
    }

    fn pipeline(filings: FakeFilings, fundamentals: FakeFundamentals) -> FactPipeline {
        let filings = Arc::new(filings);
        let fundamentals = Arc::new(fundamentals);
        let mut press = PressReleaseRegistry::new();
        press.register(Box::new(MicronRelease(Symbol::new("MU"))));
        FactPipeline::new()
            .with_facts_repository(filings.clone())
            .with_filings_repository(filings)
            .with_segment_provider(fundamentals.clone())
            .with_income_provider(fundamentals)
            .with_press_registry(press)
    }

    fn find<'a>(
        facts: &'a FactSet,
        fy: i32,
        period: FiscalPeriod,
        metric: &Metric,
        source: Source,
    ) -> Option<&'a FactRecord> {
        facts.iter().find(|r| {
            r.fiscal_year == fy && r.period == period && &r.metric == metric && r.source == source
        })
    }

    #[tokio::test]
    async fn test_run_entity_gathers_every_source() {
        let fundamentals = FakeFundamentals {
            income: vec![fmp_revenue(2025, 37_378_000_000), fmp_revenue(2024, 20_000_000_000)],
            ..Default::default()
        };
        let pipeline = pipeline(filings_source(), fundamentals);

        let report = pipeline.run_entity(&micron(), &RunConfig::default()).await.unwrap();
        let revenue = Metric::Income(IncomeMetric::Revenue);
        let cloud = Metric::segment("Cloud Memory", SegmentType::Product);

        let fy2025 = find(&report.facts, 2025, FiscalPeriod::Fy, &revenue, Source::Edgar).unwrap();
        assert_eq!(fy2025.validation, Some(Validation::Validated));
        let fy2024 = find(&report.facts, 2024, FiscalPeriod::Fy, &revenue, Source::Edgar).unwrap();
        assert!(matches!(fy2024.validation, Some(Validation::Discrepancy { .. })));

        // No provider segments, so the latest 10-K tables fill in.
        let annual = find(&report.facts, 2025, FiscalPeriod::Annual, &cloud, Source::FilingTable)
            .unwrap();
        assert_eq!(annual.value, Decimal::from(6_000_000_000_i64));
        assert_eq!(annual.provenance, "fake://k1/mu-20250828.htm");

        let q1 = find(&report.facts, 2025, FiscalPeriod::Q1, &cloud, Source::FilingTable).unwrap();
        assert_eq!(q1.value, Decimal::from(1_500_000_000_i64));
        assert!(find(&report.facts, 2025, FiscalPeriod::Q2, &cloud, Source::PressRelease).is_some());

        assert_eq!(report.income_records, 2);
        assert_eq!(report.documents_parsed, 3);
        assert_eq!(report.documents_skipped, 0);
    }

    #[tokio::test]
    async fn test_provider_segments_take_priority_over_tables() {
        let fundamentals = FakeFundamentals {
            segments: vec![FactRecord::new(
                Symbol::new("MU"),
                2025,
                FiscalPeriod::Annual,
                Metric::segment("Cloud Memory", SegmentType::Product),
                Decimal::from(6_100_000_000_i64),
                Source::Fmp,
            )],
            ..Default::default()
        };
        let pipeline = pipeline(filings_source(), fundamentals);
        let report = pipeline.run_entity(&micron(), &RunConfig::default()).await.unwrap();

        assert!(report.facts.iter().all(|r| !(r.period == FiscalPeriod::Annual
            && r.source == Source::FilingTable)));
        assert_eq!(report.annual_segments, 1);
    }

    #[tokio::test]
    async fn test_failed_document_is_skipped() {
        let mut filings = filings_source();
        filings.documents.remove("mu-20241128.htm");
        let pipeline = pipeline(filings, FakeFundamentals::default());

        let report = pipeline.run_entity(&micron(), &RunConfig::default()).await.unwrap();
        assert_eq!(report.documents_skipped, 1);
        assert!(report.facts.iter().all(|r| r.period != FiscalPeriod::Q1));
    }

    #[tokio::test]
    async fn test_quarterly_sources_can_be_disabled() {
        let pipeline = pipeline(filings_source(), FakeFundamentals::default());
        let config = RunConfig {
            include_quarterly: false,
            filing_tables: false,
            ..Default::default()
        };
        let report = pipeline.run_entity(&micron(), &config).await.unwrap();
        assert_eq!(report.documents_parsed, 0);
        assert_eq!(report.quarterly_segments, 0);
        assert!(report.facts.iter().all(|r| r.period.is_full_year()));
    }

    #[tokio::test]
    async fn test_rerun_against_store_is_stable() {
        let store = Arc::new(InMemoryStore::new());
        let fundamentals = FakeFundamentals {
            income: vec![fmp_revenue(2025, 37_378_000_000)],
            ..Default::default()
        };
        let pipeline = pipeline(filings_source(), fundamentals).with_store(store.clone());

        let first = pipeline.run_entity(&micron(), &RunConfig::default()).await.unwrap();
        let second = pipeline.run_entity(&micron(), &RunConfig::default()).await.unwrap();

        assert_eq!(first.facts.to_json().unwrap(), second.facts.to_json().unwrap());
        assert_eq!(store.load(&Symbol::new("MU")).await.unwrap().len(), second.facts.len());
    }

    #[tokio::test]
    async fn test_missing_facts_repository() {
        let err = FactPipeline::new()
            .run_entity(&micron(), &RunConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, FactError::ProviderNotConfigured(_)));
    }

    #[tokio::test]
    async fn test_batch_rejects_unknown_entity_before_work() {
        let filings = Arc::new(filings_source());
        let pipeline = FactPipeline::new().with_facts_repository(filings.clone());

        let err = pipeline
            .run_batch(&[Symbol::new("MU"), Symbol::new("ZZZZ")], &RunConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, FactError::UnknownEntity(_)));
        assert_eq!(filings.facts_requests.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_batch_aborts_on_rate_limit() {
        let fundamentals = FakeFundamentals {
            rate_limited: true,
            ..Default::default()
        };
        let pipeline = pipeline(filings_source(), fundamentals);
        let err = pipeline
            .run_batch(&[Symbol::new("MU"), Symbol::new("NVDA")], &RunConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, FactError::RateLimited { .. }));
    }

    #[tokio::test]
    async fn test_batch_runs_every_entity() {
        let pipeline = pipeline(filings_source(), FakeFundamentals::default());
        let batch = pipeline
            .run_batch(&[Symbol::new("MU"), Symbol::new("NVDA")], &RunConfig::default())
            .await
            .unwrap();
        assert!(batch.is_complete());
        assert_eq!(batch.reports.len(), 2);
        assert_eq!(batch.reports[1].entity, Symbol::new("NVDA"));
        assert!(!batch.records().is_empty());
    }
}
