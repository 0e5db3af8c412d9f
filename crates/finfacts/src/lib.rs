#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/finfacts/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Financial fact extraction and reconciliation.
//!
//! This crate re-exports the core types, extractors, reconciler, stores and
//! provider clients, and provides [`FactPipeline`] to run them per entity.
//!
//! # Features
//!
//! - `edgar` - SEC EDGAR filings and structured facts
//! - `fmp` - Financial Modeling Prep segments and income statements

// Core types and traits
pub use finfacts_core::*;

// Extraction and reconciliation
pub use finfacts_extract::{
    FactsQuery, PressReleaseRegistry, PressReleaseStrategy, SegmentTableParser,
    StructuredFactsExtractor,
};
pub use finfacts_reconcile::{FactSet, ManualOverride, ReconcileInput, Reconciler};

// Stores
pub use finfacts_store::{InMemoryStore, SqliteStore};

// Providers
#[cfg(feature = "edgar")]
pub use finfacts_edgar::{EdgarClient, EdgarConfig};
#[cfg(feature = "fmp")]
pub use finfacts_fmp::{FmpClient, FmpConfig};

/// Run configuration.
pub mod config;
/// Polars rendering of fact records.
pub mod frame;
mod pipeline;

pub use config::RunConfig;
pub use pipeline::{BatchReport, EntityFailure, EntityReport, FactPipeline};
