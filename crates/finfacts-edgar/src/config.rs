//! EDGAR client configuration.

use finfacts_core::{FactError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// SEC data API base URL.
pub const EDGAR_BASE_URL: &str = "https://data.sec.gov";

/// SEC archives base URL.
pub const EDGAR_ARCHIVES_URL: &str = "https://www.sec.gov/Archives/edgar";

/// Default minimum interval between requests (the SEC allows 10 per second).
pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_millis(100);

/// Settings for [`EdgarClient`](crate::EdgarClient).
///
/// The SEC rejects requests without an identifying user agent, so
/// `user_agent` has no usable default and must be set, in the form
/// `"AppName/Version (contact@example.com)"`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EdgarConfig {
    /// Identifying User-Agent header.
    pub user_agent: String,
    /// Base URL of the JSON APIs (submissions, companyfacts).
    pub base_url: String,
    /// Base URL of the filing archives.
    pub archives_url: String,
    /// Minimum interval between consecutive requests.
    pub min_interval: Duration,
    /// Timeout for JSON API requests.
    pub timeout: Duration,
    /// Timeout for filing document downloads.
    pub document_timeout: Duration,
}

impl Default for EdgarConfig {
    fn default() -> Self {
        Self {
            user_agent: String::new(),
            base_url: EDGAR_BASE_URL.to_string(),
            archives_url: EDGAR_ARCHIVES_URL.to_string(),
            min_interval: DEFAULT_MIN_INTERVAL,
            timeout: Duration::from_secs(30),
            document_timeout: Duration::from_secs(60),
        }
    }
}

impl EdgarConfig {
    /// Default configuration with the given user agent.
    #[must_use]
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
            ..Self::default()
        }
    }

    /// Overrides both base URLs, e.g. to point at a mirror.
    #[must_use]
    pub fn with_base_urls(mut self, base_url: impl Into<String>, archives_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self.archives_url = archives_url.into();
        self
    }

    /// Loads a configuration from JSON, filling unspecified fields with defaults.
    ///
    /// # Errors
    /// Returns an error for malformed JSON or an invalid configuration.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| FactError::Parse(format!("edgar config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the configuration.
    ///
    /// # Errors
    /// Returns [`FactError::InvalidParameter`] for an empty user agent, an
    /// empty base URL or a zero timeout.
    pub fn validate(&self) -> Result<()> {
        if self.user_agent.trim().is_empty() {
            return Err(FactError::InvalidParameter(
                "EDGAR requires an identifying user agent".to_string(),
            ));
        }
        if self.base_url.is_empty() || self.archives_url.is_empty() {
            return Err(FactError::InvalidParameter("empty EDGAR base URL".to_string()));
        }
        if self.timeout.is_zero() || self.document_timeout.is_zero() {
            return Err(FactError::InvalidParameter("zero EDGAR timeout".to_string()));
        }
        Ok(())
    }
}
