#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/finfacts/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Core traits and types for financial fact extraction.
//!
//! This crate provides the foundational abstractions shared by the extractors,
//! providers and the reconciliation engine:
//!
//! - [`FactRecord`](fact::FactRecord) - the atomic output unit
//! - [`Entity`](types::Entity) - a covered organization and its fiscal calendar
//! - [`FilingsRepository`](provider::FilingsRepository) - filings and documents
//! - [`FactsRepository`](provider::FactsRepository) - structured facts documents
//! - [`FactStore`](store::FactStore) - persistence abstraction
//! - [`ReconcileConfig`](config::ReconcileConfig) - policy thresholds

/// Structured facts document types.
pub mod companyfacts;
/// Policy configuration.
pub mod config;
/// Error types.
pub mod error;
/// Fact records, metrics and keys.
pub mod fact;
/// Money parsing and formatting.
pub mod money;
/// Fiscal periods and fiscal-quarter resolution.
pub mod period;
/// Provider traits.
pub mod provider;
/// Fact store trait.
pub mod store;
/// Symbols and entities.
pub mod types;

// Re-export commonly used items at crate root
pub use companyfacts::{CompanyFacts, ConceptFacts, FactObservation};
pub use config::{ReconcileConfig, TableConfig};
pub use error::{FactError, Result};
pub use fact::{
    FactKey, FactRecord, IncomeMetric, IncomeStatement, Metric, SegmentObservation, SegmentType,
    Source, Validation,
};
pub use money::{Scale, format_money, parse_money};
pub use period::{FiscalPeriod, PeriodType, fiscal_quarter_from_date};
pub use provider::{
    DataProvider, FactsRepository, FilingMeta, FilingsRepository, FormType, IncomeProvider,
    SegmentProvider,
};
pub use store::FactStore;
pub use types::{Entity, EntityRegistry, Symbol};
