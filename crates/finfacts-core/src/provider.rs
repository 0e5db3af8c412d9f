//! Provider traits for fetching filings and structured facts.
//!
//! - [`DataProvider`] - Base trait for all providers
//! - [`FilingsRepository`] - filing lists, documents and press-release exhibits
//! - [`FactsRepository`] - structured facts documents
//! - [`SegmentProvider`] - segment revenue from a structured provider
//! - [`IncomeProvider`] - income statements from a second structured provider

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug};

use crate::{
    companyfacts::CompanyFacts,
    error::Result,
    fact::{FactRecord, IncomeStatement, SegmentType},
    period::PeriodType,
    types::Entity,
};

/// Base trait for all providers.
pub trait DataProvider: Send + Sync + Debug {
    /// Returns the name of this provider (e.g., "SEC EDGAR").
    fn name(&self) -> &str;

    /// Returns a description of this provider.
    fn description(&self) -> &str;
}

/// Filing form types consumed by the extractors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FormType {
    /// Annual report.
    TenK,
    /// Quarterly report.
    TenQ,
    /// Current report (earnings releases are attached as exhibits).
    EightK,
}

impl FormType {
    /// Form name as it appears in filing indexes.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::TenK => "10-K",
            Self::TenQ => "10-Q",
            Self::EightK => "8-K",
        }
    }

    /// Returns true if `form` is this form or its amendment.
    #[must_use]
    pub fn matches(&self, form: &str) -> bool {
        let base = self.as_str();
        form == base || form.strip_prefix(base) == Some("/A")
    }
}

impl fmt::Display for FormType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata of a single filing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilingMeta {
    /// Accession number with dashes.
    pub accession: String,
    /// Form as filed (may carry an `/A` suffix).
    pub form: String,
    /// Filing date.
    pub filing_date: Option<NaiveDate>,
    /// Period-end date the filing reports on.
    pub report_date: Option<NaiveDate>,
    /// Primary document file name.
    pub primary_document: String,
}

impl FilingMeta {
    /// Accession number without dashes, as used in archive paths.
    #[must_use]
    pub fn accession_path(&self) -> String {
        self.accession.replace('-', "")
    }
}

/// Repository of filings keyed by entity and form type.
#[async_trait]
pub trait FilingsRepository: DataProvider {
    /// Lists the most recent filings of `form` (amendments included), newest
    /// first, at most `limit`.
    ///
    /// An entity with no filings yields an empty list, not an error.
    async fn list_filings(
        &self,
        entity: &Entity,
        form: FormType,
        limit: usize,
    ) -> Result<Vec<FilingMeta>>;

    /// Fetches a document of a filing as text.
    async fn fetch_document(&self, entity: &Entity, accession: &str, document: &str)
    -> Result<String>;

    /// Locates and fetches the earnings press release attached to a filing.
    ///
    /// Returns `Ok(None)` when the filing carries no recognizable exhibit.
    async fn find_press_release(&self, entity: &Entity, filing: &FilingMeta)
    -> Result<Option<String>>;

    /// URL of a document, for provenance.
    fn document_url(&self, entity: &Entity, accession: &str, document: &str) -> String;
}

/// Repository of structured facts documents.
#[async_trait]
pub trait FactsRepository: DataProvider {
    /// Fetches the facts document for an entity.
    ///
    /// An entity unknown to the repository yields an empty document.
    async fn company_facts(&self, entity: &Entity) -> Result<CompanyFacts>;
}

/// Structured provider of segment revenue.
#[async_trait]
pub trait SegmentProvider: DataProvider {
    /// Fetches segment revenue records of one type.
    async fn fetch_segments(
        &self,
        entity: &Entity,
        segment_type: SegmentType,
        period_type: PeriodType,
    ) -> Result<Vec<FactRecord>>;
}

/// Structured provider of income statements.
#[async_trait]
pub trait IncomeProvider: DataProvider {
    /// Fetches income statements, most recent first.
    async fn fetch_income(
        &self,
        entity: &Entity,
        period_type: PeriodType,
        limit: usize,
    ) -> Result<Vec<IncomeStatement>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_form_matching() {
        assert!(FormType::TenK.matches("10-K"));
        assert!(FormType::TenK.matches("10-K/A"));
        assert!(!FormType::TenK.matches("10-K405"));
        assert!(!FormType::TenQ.matches("10-K"));
        assert!(FormType::EightK.matches("8-K"));
    }

    #[test]
    fn test_accession_path() {
        let filing = FilingMeta {
            accession: "0001045810-25-000023".to_string(),
            form: "10-K".to_string(),
            filing_date: None,
            report_date: None,
            primary_document: "nvda-20250126.htm".to_string(),
        };
        assert_eq!(filing.accession_path(), "000104581025000023");
    }
}
