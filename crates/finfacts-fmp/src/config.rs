//! FMP client configuration.

use finfacts_core::{FactError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Base URL for the FMP stable API.
pub const FMP_BASE_URL: &str = "https://financialmodelingprep.com/stable";

/// Settings for [`FmpClient`](crate::FmpClient).
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FmpConfig {
    /// API key appended to every request.
    pub api_key: String,
    /// Base URL of the stable API.
    pub base_url: String,
    /// Minimum interval between consecutive requests.
    pub min_interval: Duration,
    /// Request timeout.
    pub timeout: Duration,
}

impl fmt::Debug for FmpConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FmpConfig")
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .field("min_interval", &self.min_interval)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Default for FmpConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: FMP_BASE_URL.to_string(),
            min_interval: Duration::from_millis(500),
            timeout: Duration::from_secs(30),
        }
    }
}

impl FmpConfig {
    /// Default configuration with the given API key.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Self::default()
        }
    }

    /// Reads the API key from the `FMP_API_KEY` environment variable.
    ///
    /// # Errors
    /// Returns [`FactError::ProviderNotConfigured`] when the variable is unset
    /// or empty.
    pub fn from_env() -> Result<Self> {
        match std::env::var("FMP_API_KEY") {
            Ok(key) if !key.trim().is_empty() => Ok(Self::new(key.trim())),
            _ => Err(FactError::ProviderNotConfigured("FMP (FMP_API_KEY not set)".to_string())),
        }
    }

    /// Checks the configuration.
    ///
    /// # Errors
    /// Returns [`FactError::ProviderNotConfigured`] for an empty key and
    /// [`FactError::InvalidParameter`] for an empty base URL or zero timeout.
    pub fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(FactError::ProviderNotConfigured("FMP (empty API key)".to_string()));
        }
        if self.base_url.is_empty() {
            return Err(FactError::InvalidParameter("empty FMP base URL".to_string()));
        }
        if self.timeout.is_zero() {
            return Err(FactError::InvalidParameter("zero FMP timeout".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_api_key() {
        let config = FmpConfig::new("secret_key_12345");
        let debug_str = format!("{config:?}");
        assert!(!debug_str.contains("secret_key_12345"));
        assert!(debug_str.contains("[REDACTED]"));
    }

    #[test]
    fn test_validate() {
        assert!(FmpConfig::default().validate().is_err());
        assert!(FmpConfig::new("key").validate().is_ok());
        let config = FmpConfig {
            timeout: Duration::ZERO,
            ..FmpConfig::new("key")
        };
        assert!(config.validate().is_err());
    }
}
