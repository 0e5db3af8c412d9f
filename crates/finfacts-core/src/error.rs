//! Error types for fact extraction.
//!
//! [`FactError`] covers fetch, parse, store and configuration failures. Parse
//! ambiguity inside the extractors is never an error: it yields no records.

use thiserror::Error;

/// Errors that can occur while fetching, extracting or storing facts.
#[derive(Error, Debug)]
pub enum FactError {
    /// Network-related errors (connection failures, non-success HTTP status).
    #[error("Network error: {0}")]
    Network(String),

    /// A single request exceeded its timeout.
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Quota or rate limit signalled by a provider.
    #[error("Rate limited by {provider}: retry after {retry_after:?}")]
    RateLimited {
        /// The provider that rate limited the request.
        provider: String,
        /// Suggested time to wait before retrying.
        retry_after: Option<std::time::Duration>,
    },

    /// The entity is not part of the configured registry.
    #[error("Unknown entity: {0}")]
    UnknownEntity(String),

    /// An invalid parameter or configuration value was provided.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Error parsing a provider response or persisted record.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Error interacting with the fact store.
    #[error("Store error: {0}")]
    Store(String),

    /// The requested provider is not configured.
    #[error("Provider not configured: {0}")]
    ProviderNotConfigured(String),

    /// Authentication failed for a provider.
    #[error("Authentication failed for provider {0}")]
    AuthenticationFailed(String),

    /// Any other error.
    #[error("{0}")]
    Other(String),
}

impl FactError {
    /// Returns true for errors that should stop a whole batch rather than a
    /// single entity or document.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. }
                | Self::UnknownEntity(_)
                | Self::InvalidParameter(_)
                | Self::AuthenticationFailed(_)
        )
    }
}

/// Result type alias using [`FactError`].
pub type Result<T> = std::result::Result<T, FactError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        let limited = FactError::RateLimited {
            provider: "FMP".to_string(),
            retry_after: None,
        };
        assert!(limited.is_fatal());
        assert!(FactError::UnknownEntity("XYZ".into()).is_fatal());
        assert!(!FactError::Network("reset".into()).is_fatal());
        assert!(!FactError::Timeout("doc".into()).is_fatal());
    }

    #[test]
    fn test_error_display() {
        let err = FactError::UnknownEntity("XYZ".to_string());
        assert_eq!(err.to_string(), "Unknown entity: XYZ");
    }
}
