//! Financial Modeling Prep API client.

use async_trait::async_trait;
use chrono::NaiveDate;
use finfacts_core::{
    DataProvider, Entity, FactError, FactRecord, FiscalPeriod, IncomeMetric, IncomeProvider,
    IncomeStatement, Metric, PeriodType, Result, SegmentProvider, SegmentType, Source,
};
use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{Instant, sleep};
use tracing::debug;

use crate::config::FmpConfig;
use crate::names::normalize_segment_name;

const PROVIDER: &str = "FMP";

#[derive(Debug)]
struct RateLimiter {
    last_request: Instant,
    min_interval: Duration,
}

impl RateLimiter {
    fn new(min_interval: Duration) -> Self {
        Self {
            last_request: Instant::now() - min_interval,
            min_interval,
        }
    }

    async fn wait(&mut self) {
        let elapsed = self.last_request.elapsed();
        if elapsed < self.min_interval {
            sleep(self.min_interval - elapsed).await;
        }
        self.last_request = Instant::now();
    }
}

const fn period_param(period_type: PeriodType) -> &'static str {
    match period_type {
        PeriodType::Annual => "annual",
        PeriodType::Quarterly => "quarter",
    }
}

/// Financial Modeling Prep client.
///
/// Provides product and geographic revenue segmentation and income
/// statements from the stable API.
#[derive(Clone)]
pub struct FmpClient {
    client: Client,
    rate_limiter: Arc<Mutex<RateLimiter>>,
    config: FmpConfig,
}

impl fmt::Debug for FmpClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FmpClient")
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.config.base_url)
            .finish()
    }
}

impl FmpClient {
    /// Creates a client from a validated configuration.
    ///
    /// # Errors
    /// Returns an error for an invalid configuration or if the HTTP client
    /// cannot be built.
    pub fn new(config: FmpConfig) -> Result<Self> {
        config.validate()?;
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| FactError::Other(format!("failed to build HTTP client: {e}")))?;
        Ok(Self::with_client(client, config))
    }

    /// Creates a client around a pre-configured HTTP client.
    #[must_use]
    pub fn with_client(client: Client, config: FmpConfig) -> Self {
        Self {
            client,
            rate_limiter: Arc::new(Mutex::new(RateLimiter::new(config.min_interval))),
            config,
        }
    }

    /// Build a URL with the API key appended.
    fn url(&self, endpoint: &str) -> String {
        let separator = if endpoint.contains('?') { '&' } else { '?' };
        format!(
            "{}/{endpoint}{separator}apikey={}",
            self.config.base_url, self.config.api_key
        )
    }

    /// Endpoint URL with the key masked, for provenance and logs.
    fn masked_url(&self, endpoint: &str) -> String {
        format!("{}/{endpoint}", self.config.base_url)
    }

    /// Make a GET request and parse the JSON response.
    async fn get<T: serde::de::DeserializeOwned>(&self, endpoint: &str) -> Result<T> {
        self.rate_limiter.lock().await.wait().await;
        debug!("FMP request: {}", endpoint);

        let response = self
            .client
            .get(self.url(endpoint))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    FactError::Timeout(self.masked_url(endpoint))
                } else {
                    FactError::Network(e.without_url().to_string())
                }
            })?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(FactError::RateLimited {
                provider: PROVIDER.to_string(),
                retry_after: None,
            });
        }
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(FactError::AuthenticationFailed(format!("{PROVIDER} ({status})")));
        }
        if !status.is_success() {
            return Err(FactError::Network(format!("HTTP {status}: {endpoint}")));
        }

        let text = response
            .text()
            .await
            .map_err(|e| FactError::Network(e.without_url().to_string()))?;

        // FMP reports quota and key problems in a 200 body
        if text.contains("\"Error Message\"") || text.contains("\"error\"") {
            if text.contains("Limit Reach") {
                return Err(FactError::RateLimited {
                    provider: PROVIDER.to_string(),
                    retry_after: None,
                });
            }
            return Err(FactError::Network(text));
        }

        serde_json::from_str(&text).map_err(|e| FactError::Parse(format!("{endpoint}: {e}")))
    }

    fn segmentation_endpoint(
        entity: &Entity,
        segment_type: SegmentType,
        period_type: PeriodType,
    ) -> String {
        let kind = match segment_type {
            SegmentType::Product => "product",
            SegmentType::Geography => "geographic",
        };
        format!(
            "revenue-{kind}-segmentation?symbol={}&period={}",
            entity.symbol,
            period_param(period_type)
        )
    }
}

/// One fiscal period of a segmentation response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FmpSegmentation {
    #[serde(default)]
    fiscal_year: Option<i32>,
    #[serde(default)]
    period: Option<String>,
    #[serde(default)]
    date: Option<String>,
    #[serde(default)]
    data: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FmpIncomeStatement {
    date: String,
    #[serde(default)]
    period: Option<String>,
    #[serde(default)]
    filing_date: Option<String>,
    #[serde(default)]
    revenue: serde_json::Value,
    #[serde(default)]
    gross_profit: serde_json::Value,
    #[serde(default)]
    operating_income: serde_json::Value,
    #[serde(default)]
    net_income: serde_json::Value,
    #[serde(default)]
    eps_diluted: serde_json::Value,
}

/// Decimal from a JSON number or numeric string; null and "None" are absent.
fn decimal_value(value: &serde_json::Value) -> Option<Decimal> {
    match value {
        serde_json::Value::Number(n) => Decimal::from_str(&n.to_string())
            .or_else(|_| Decimal::from_scientific(&n.to_string()))
            .ok(),
        serde_json::Value::String(s) => Decimal::from_str(s.trim()).ok(),
        _ => None,
    }
}

fn parse_date(value: Option<&str>) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value?, "%Y-%m-%d").ok()
}

impl FmpSegmentation {
    /// Resolves the fiscal period, preferring the response's own labels.
    fn fiscal_period(&self, entity: &Entity, period_type: PeriodType) -> Option<(i32, FiscalPeriod)> {
        let end = parse_date(self.date.as_deref());
        let from_date = end.map(|d| entity.fiscal_quarter(d));
        let fiscal_year = self.fiscal_year.or(from_date.map(|(fy, _)| fy))?;
        let period = match period_type {
            PeriodType::Annual => FiscalPeriod::Annual,
            PeriodType::Quarterly => self
                .period
                .as_deref()
                .and_then(FiscalPeriod::from_tag)
                .filter(FiscalPeriod::is_quarter)
                .or(from_date.map(|(_, q)| q))?,
        };
        Some((fiscal_year, period))
    }

    fn into_records(
        self,
        entity: &Entity,
        segment_type: SegmentType,
        period_type: PeriodType,
        provenance: &str,
    ) -> Vec<FactRecord> {
        let Some((fiscal_year, period)) = self.fiscal_period(entity, period_type) else {
            return Vec::new();
        };
        let end = parse_date(self.date.as_deref());
        self.data
            .iter()
            .filter_map(|(name, value)| {
                let name = normalize_segment_name(&entity.symbol, name)?;
                let value = decimal_value(value)?;
                let mut record = FactRecord::new(
                    entity.symbol.clone(),
                    fiscal_year,
                    period,
                    Metric::segment(name, segment_type),
                    value,
                    Source::Fmp,
                )
                .with_provenance(provenance);
                record.period_end = end;
                Some(record)
            })
            .collect()
    }
}

impl FmpIncomeStatement {
    fn into_statement(self, entity: &Entity, period_type: PeriodType, provenance: &str) -> Option<IncomeStatement> {
        let end = parse_date(Some(&self.date))?;
        let (fiscal_year, quarter) = entity.fiscal_quarter(end);
        let period = match period_type {
            PeriodType::Annual => FiscalPeriod::Fy,
            PeriodType::Quarterly => self
                .period
                .as_deref()
                .and_then(FiscalPeriod::from_tag)
                .filter(FiscalPeriod::is_quarter)
                .unwrap_or(quarter),
        };

        let mut statement = IncomeStatement::new(entity.symbol.clone(), fiscal_year, period, Source::Fmp);
        statement.period_end = Some(end);
        statement.filed = parse_date(self.filing_date.as_deref());
        statement.provenance = provenance.to_string();
        let values = [
            (IncomeMetric::Revenue, &self.revenue),
            (IncomeMetric::GrossProfit, &self.gross_profit),
            (IncomeMetric::OperatingIncome, &self.operating_income),
            (IncomeMetric::NetIncome, &self.net_income),
            (IncomeMetric::Eps, &self.eps_diluted),
        ];
        for (metric, value) in values {
            if let Some(value) = decimal_value(value) {
                statement.set(metric, value);
            }
        }
        statement.compute_margins();
        Some(statement)
    }
}

impl DataProvider for FmpClient {
    fn name(&self) -> &str {
        PROVIDER
    }

    fn description(&self) -> &str {
        "Financial Modeling Prep - revenue segmentation and income statements"
    }
}

#[async_trait]
impl SegmentProvider for FmpClient {
    async fn fetch_segments(
        &self,
        entity: &Entity,
        segment_type: SegmentType,
        period_type: PeriodType,
    ) -> Result<Vec<FactRecord>> {
        let endpoint = Self::segmentation_endpoint(entity, segment_type, period_type);
        let provenance = self.masked_url(&endpoint);
        let periods: Vec<FmpSegmentation> = self.get(&endpoint).await?;

        let records: Vec<FactRecord> = periods
            .into_iter()
            .flat_map(|p| p.into_records(entity, segment_type, period_type, &provenance))
            .collect();
        debug!(
            entity = %entity.symbol,
            segment_type = segment_type.as_str(),
            count = records.len(),
            "Fetched FMP segments"
        );
        Ok(records)
    }
}

#[async_trait]
impl IncomeProvider for FmpClient {
    async fn fetch_income(
        &self,
        entity: &Entity,
        period_type: PeriodType,
        limit: usize,
    ) -> Result<Vec<IncomeStatement>> {
        let endpoint = format!(
            "income-statement?symbol={}&period={}&limit={limit}",
            entity.symbol,
            period_param(period_type)
        );
        let provenance = self.masked_url(&endpoint);
        let statements: Vec<FmpIncomeStatement> = self.get(&endpoint).await?;
        Ok(statements
            .into_iter()
            .filter_map(|s| s.into_statement(entity, period_type, &provenance))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> FmpClient {
        FmpClient::new(FmpConfig::new("test_key")).unwrap()
    }

    fn nvidia() -> Entity {
        Entity::new("NVDA", "1045810", "NVIDIA Corporation", 1).unwrap()
    }

    #[test]
    fn test_url_building() {
        let client = client();
        assert_eq!(
            client.url("income-statement?symbol=NVDA"),
            "https://financialmodelingprep.com/stable/income-statement?symbol=NVDA&apikey=test_key"
        );
        assert!(!client.masked_url("income-statement?symbol=NVDA").contains("test_key"));
    }

    #[test]
    fn test_segmentation_endpoint() {
        assert_eq!(
            FmpClient::segmentation_endpoint(&nvidia(), SegmentType::Geography, PeriodType::Quarterly),
            "revenue-geographic-segmentation?symbol=NVDA&period=quarter"
        );
    }

    #[test]
    fn test_provider_metadata() {
        let client = client();
        assert_eq!(client.name(), "FMP");
        assert!(!client.description().is_empty());
        assert!(!format!("{client:?}").contains("test_key"));
    }

    #[test]
    fn test_segmentation_records() {
        let json = r#"[{
            "symbol": "NVDA", "fiscalYear": 2025, "period": "FY", "reportedCurrency": null,
            "date": "2025-01-26",
            "data": {"Data Center": 115186000000, "Gaming": "11350000000", "EBITDA": 1, "Other": null}
        }]"#;
        let periods: Vec<FmpSegmentation> = serde_json::from_str(json).unwrap();
        let records: Vec<FactRecord> = periods
            .into_iter()
            .flat_map(|p| p.into_records(&nvidia(), SegmentType::Product, PeriodType::Annual, "fmp"))
            .collect();

        assert_eq!(records.len(), 2);
        let dc = records.iter().find(|r| r.segment().is_some_and(|(n, _)| n == "Data Center")).unwrap();
        assert_eq!(dc.fiscal_year, 2025);
        assert_eq!(dc.period, FiscalPeriod::Annual);
        assert_eq!(dc.value, Decimal::from(115_186_000_000_i64));
        assert_eq!(dc.source, Source::Fmp);
        assert_eq!(dc.period_end, NaiveDate::from_ymd_opt(2025, 1, 26));
    }

    #[test]
    fn test_quarterly_period_from_date_when_unlabeled() {
        let json = r#"[{"date": "2024-10-27", "data": {"Gaming": 3279000000}}]"#;
        let periods: Vec<FmpSegmentation> = serde_json::from_str(json).unwrap();
        let records = periods[0]
            .clone()
            .into_records(&nvidia(), SegmentType::Product, PeriodType::Quarterly, "fmp");
        assert_eq!(records[0].fiscal_year, 2025);
        assert_eq!(records[0].period, FiscalPeriod::Q3);
    }

    #[test]
    fn test_income_statement_conversion() {
        let json = r#"[{
            "date": "2025-01-26", "symbol": "NVDA", "period": "FY", "filingDate": "2025-02-26",
            "revenue": 130497000000, "grossProfit": 97858000000, "operatingIncome": 81453000000,
            "netIncome": 72880000000, "epsDiluted": 2.94
        }]"#;
        let rows: Vec<FmpIncomeStatement> = serde_json::from_str(json).unwrap();
        let statement = rows
            .into_iter()
            .next()
            .and_then(|r| r.into_statement(&nvidia(), PeriodType::Annual, "fmp"))
            .unwrap();
        assert_eq!(statement.fiscal_year, 2025);
        assert_eq!(statement.period, FiscalPeriod::Fy);
        assert_eq!(statement.eps, Some(Decimal::new(294, 2)));
        assert!(statement.gross_margin.is_some_and(|m| (m - 0.7499).abs() < 1e-3));
        assert_eq!(statement.filed, NaiveDate::from_ymd_opt(2025, 2, 26));
    }
}
