//! Rate-limited SEC EDGAR client.

use async_trait::async_trait;
use finfacts_core::{
    CompanyFacts, DataProvider, Entity, FactError, FactsRepository, FilingMeta, FilingsRepository,
    FormType, Result,
};
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{Instant, sleep};
use tracing::{debug, instrument, warn};

use crate::config::EdgarConfig;
use crate::exhibit::find_press_release_link;
use crate::submissions::{CompanySubmissions, CompanyTickerInfo, DirectoryResponse, find_cik};

/// SEC company tickers URL
const COMPANY_TICKERS_URL: &str = "https://www.sec.gov/files/company_tickers.json";

const PROVIDER: &str = "SEC EDGAR";

/// Rate limiter to ensure we don't exceed SEC's rate limits
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

fn send_error(e: &reqwest::Error, url: &str) -> FactError {
    if e.is_timeout() {
        FactError::Timeout(url.to_string())
    } else {
        FactError::Network(e.to_string())
    }
}

/// Maps a non-success status to an error, passing 404 through as `None`.
fn check_status(response: Response, url: &str) -> Result<Option<Response>> {
    let status = response.status();
    if status.is_success() {
        return Ok(Some(response));
    }
    match status {
        StatusCode::NOT_FOUND => Ok(None),
        StatusCode::TOO_MANY_REQUESTS => Err(FactError::RateLimited {
            provider: PROVIDER.to_string(),
            retry_after: response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(Duration::from_secs),
        }),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            Err(FactError::AuthenticationFailed(format!("{PROVIDER} ({status})")))
        }
        _ => Err(FactError::Network(format!("HTTP {status} for {url}"))),
    }
}

/// SEC EDGAR client.
///
/// Serves structured facts documents, filing lists and filing documents.
/// Every request waits on a shared rate limiter (10 requests per second by
/// default).
#[derive(Debug, Clone)]
pub struct EdgarClient {
    client: reqwest::Client,
    rate_limiter: Arc<Mutex<RateLimiter>>,
    config: EdgarConfig,
}

impl EdgarClient {
    /// Creates a client from a validated configuration.
    ///
    /// # Errors
    /// Returns an error for an invalid configuration or if the HTTP client
    /// cannot be built.
    pub fn new(config: EdgarConfig) -> Result<Self> {
        config.validate()?;
        let client = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .build()
            .map_err(|e| FactError::Other(format!("failed to build HTTP client: {e}")))?;
        Ok(Self::with_client(client, config))
    }

    /// Creates a client around a pre-configured HTTP client.
    ///
    /// The caller is responsible for the client's user agent.
    #[must_use]
    pub fn with_client(client: reqwest::Client, config: EdgarConfig) -> Self {
        Self {
            client,
            rate_limiter: Arc::new(Mutex::new(RateLimiter::new(config.min_interval))),
            config,
        }
    }

    /// The active configuration.
    #[must_use]
    pub const fn config(&self) -> &EdgarConfig {
        &self.config
    }

    async fn send(&self, url: &str, timeout: Duration) -> Result<Option<Response>> {
        self.rate_limiter.lock().await.wait().await;
        debug!(url, "EDGAR request");
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| send_error(&e, url))?;
        check_status(response, url)
    }

    /// GETs and parses a JSON document; `None` on 404.
    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<Option<T>> {
        let Some(response) = self.send(url, self.config.timeout).await? else {
            return Ok(None);
        };
        let parsed = response
            .json()
            .await
            .map_err(|e| FactError::Parse(format!("{url}: {e}")))?;
        Ok(Some(parsed))
    }

    async fn get_text(&self, url: &str) -> Result<String> {
        let response = self
            .send(url, self.config.document_timeout)
            .await?
            .ok_or_else(|| FactError::Network(format!("HTTP 404 for {url}")))?;
        response.text().await.map_err(|e| send_error(&e, url))
    }

    /// Looks up a company's zero-padded CIK from its ticker.
    ///
    /// # Errors
    /// Returns [`FactError::UnknownEntity`] when the SEC does not list the
    /// ticker, or a network/parse error.
    pub async fn get_cik(&self, ticker: &str) -> Result<String> {
        if ticker.trim().is_empty() {
            return Err(FactError::InvalidParameter("Empty ticker".to_string()));
        }
        let tickers: HashMap<String, CompanyTickerInfo> = self
            .get_json(COMPANY_TICKERS_URL)
            .await?
            .unwrap_or_default();
        let cik = find_cik(&tickers, ticker.trim())
            .ok_or_else(|| FactError::UnknownEntity(ticker.to_string()))?;
        debug!(ticker, cik = %cik, "Resolved CIK");
        Ok(cik)
    }

    /// Builds an entity for a ticker missing from the registry, resolving its
    /// CIK through the SEC ticker list.
    ///
    /// # Errors
    /// Returns an error if the ticker cannot be resolved or the month is invalid.
    pub async fn resolve_entity(
        &self,
        ticker: &str,
        name: &str,
        fiscal_year_end_month: u32,
    ) -> Result<Entity> {
        let cik = self.get_cik(ticker).await?;
        Entity::new(ticker, &cik, name, fiscal_year_end_month)
    }

    async fn submissions(&self, entity: &Entity) -> Result<CompanySubmissions> {
        let url = format!("{}/submissions/CIK{}.json", self.config.base_url, entity.cik);
        Ok(self.get_json(&url).await?.unwrap_or_default())
    }

    fn archive_url(&self, entity: &Entity, accession: &str, document: &str) -> String {
        format!(
            "{}/data/{}/{}/{}",
            self.config.archives_url,
            entity.cik_unpadded(),
            accession.replace('-', ""),
            document
        )
    }

    /// Lists the file names of a filing.
    ///
    /// # Errors
    /// Returns a network or parse error; a missing filing yields an empty list.
    pub async fn filing_files(&self, entity: &Entity, accession: &str) -> Result<Vec<String>> {
        let url = self.archive_url(entity, accession, "index.json");
        let listing: DirectoryResponse = self.get_json(&url).await?.unwrap_or_default();
        Ok(listing.file_names().into_iter().map(str::to_string).collect())
    }
}

impl DataProvider for EdgarClient {
    fn name(&self) -> &str {
        PROVIDER
    }

    fn description(&self) -> &str {
        "SEC EDGAR structured facts, filing lists and filing documents"
    }
}

#[async_trait]
impl FactsRepository for EdgarClient {
    #[instrument(skip_all, fields(entity = %entity.symbol))]
    async fn company_facts(&self, entity: &Entity) -> Result<CompanyFacts> {
        let url = format!(
            "{}/api/xbrl/companyfacts/CIK{}.json",
            self.config.base_url, entity.cik
        );
        let facts: Option<CompanyFacts> = self.get_json(&url).await?;
        if facts.is_none() {
            debug!("No companyfacts document");
        }
        Ok(facts.unwrap_or_default())
    }
}

#[async_trait]
impl FilingsRepository for EdgarClient {
    #[instrument(skip_all, fields(entity = %entity.symbol, form = %form, limit = limit))]
    async fn list_filings(
        &self,
        entity: &Entity,
        form: FormType,
        limit: usize,
    ) -> Result<Vec<FilingMeta>> {
        let submissions = self.submissions(entity).await?;
        let filings = submissions.filings.recent.select(form, limit);
        debug!(count = filings.len(), "Listed filings");
        Ok(filings)
    }

    async fn fetch_document(
        &self,
        entity: &Entity,
        accession: &str,
        document: &str,
    ) -> Result<String> {
        let url = self.archive_url(entity, accession, document);
        self.get_text(&url).await
    }

    async fn find_press_release(
        &self,
        entity: &Entity,
        filing: &FilingMeta,
    ) -> Result<Option<String>> {
        let files = self.filing_files(entity, &filing.accession).await?;
        let Some(document) = find_press_release_link(files.iter().map(String::as_str)) else {
            warn!(
                entity = %entity.symbol,
                accession = %filing.accession,
                "No press release exhibit found"
            );
            return Ok(None);
        };
        debug!(entity = %entity.symbol, document, "Found press release exhibit");
        self.fetch_document(entity, &filing.accession, document)
            .await
            .map(Some)
    }

    fn document_url(&self, entity: &Entity, accession: &str, document: &str) -> String {
        self.archive_url(entity, accession, document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> EdgarClient {
        EdgarClient::new(EdgarConfig::new("finfacts-test/0.1 (test@example.com)")).unwrap()
    }

    fn micron() -> Entity {
        Entity::new("MU", "723125", "Micron Technology, Inc.", 8).unwrap()
    }

    #[test]
    fn test_provider_traits() {
        let client = client();
        assert_eq!(client.name(), "SEC EDGAR");
        assert!(!client.description().is_empty());
    }

    #[test]
    fn test_invalid_config_rejected() {
        assert!(EdgarClient::new(EdgarConfig::default()).is_err());
    }

    #[test]
    fn test_document_url() {
        let url = client().document_url(&micron(), "0000723125-25-000010", "mu-20250227.htm");
        assert_eq!(
            url,
            "https://www.sec.gov/Archives/edgar/data/723125/000072312525000010/mu-20250227.htm"
        );
    }

    #[tokio::test]
    async fn test_rate_limiter_spaces_requests() {
        let mut limiter = RateLimiter::new(Duration::from_millis(20));
        let start = Instant::now();
        limiter.wait().await;
        limiter.wait().await;
        assert!(start.elapsed() >= Duration::from_millis(20));
    }
}
