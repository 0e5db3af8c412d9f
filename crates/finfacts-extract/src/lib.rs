#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/finfacts/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Extractors that turn raw filings into period-tagged facts.
//!
//! - [`StructuredFactsExtractor`](facts::StructuredFactsExtractor) selects one
//!   observation per fiscal period from a structured facts document
//! - [`SegmentTableParser`](segments::SegmentTableParser) finds segment
//!   revenue tables in long-form filing HTML
//! - [`PressReleaseRegistry`](press::PressReleaseRegistry) dispatches earnings
//!   press releases to per-entity strategies
//!
//! None of the extractors perform I/O and none of them fail on unrecognized
//! input: a document they cannot read yields no records.

/// Structured facts selection.
pub mod facts;
/// HTML table accumulation and text normalization.
pub mod html;
/// Press-release strategies.
pub mod press;
/// Segment table detection.
pub mod segments;

pub use facts::{Cadence, FactsQuery, Selection, StructuredFactsExtractor, concept_aliases};
pub use html::{Table, normalize_text, parse_tables};
pub use press::{
    Anchor, NarrativeStrategy, PressReleaseRegistry, PressReleaseStrategy, SegmentTemplate,
    TabularStrategy,
};
pub use segments::{SegmentTableParser, classify_segment};
