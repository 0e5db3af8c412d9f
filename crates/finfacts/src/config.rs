//! Per-run settings.

use finfacts_core::{FactError, Result};
use serde::{Deserialize, Serialize};

/// What a pipeline run fetches for each entity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Fiscal years of income statements kept, counting back from the latest.
    pub years: u32,
    /// Also extract quarterly income statements and quarterly segments.
    pub include_quarterly: bool,
    /// Most recent 10-Q filings parsed for quarterly segment tables.
    pub quarterly_filings: usize,
    /// Most recent 8-K filings searched for earnings press releases.
    pub press_releases: usize,
    /// Parse segment tables out of 10-K and 10-Q documents.
    pub filing_tables: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            years: 5,
            include_quarterly: true,
            quarterly_filings: 8,
            press_releases: 8,
            filing_tables: true,
        }
    }
}

impl RunConfig {
    /// Parses a configuration from JSON; missing fields take their defaults.
    ///
    /// # Errors
    /// Returns [`FactError::Parse`] for malformed JSON or
    /// [`FactError::InvalidParameter`] if validation fails.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| FactError::Parse(format!("run config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the configuration before any work starts.
    ///
    /// # Errors
    /// Returns [`FactError::InvalidParameter`] for a lookback of 0 years.
    pub fn validate(&self) -> Result<()> {
        if self.years == 0 {
            return Err(FactError::InvalidParameter("lookback of 0 years".to_string()));
        }
        Ok(())
    }
}
