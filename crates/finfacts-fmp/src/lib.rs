#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/finfacts/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Financial Modeling Prep (FMP) provider.
//!
//! [`FmpClient`] implements [`SegmentProvider`](finfacts_core::SegmentProvider)
//! for product and geographic revenue segmentation and
//! [`IncomeProvider`](finfacts_core::IncomeProvider) for income statements,
//! used as the secondary source when validating annual revenue.
//!
//! # Usage
//!
//! ```rust,ignore
//! use finfacts_core::{PeriodType, SegmentProvider, SegmentType};
//! use finfacts_fmp::{FmpClient, FmpConfig};
//!
//! let client = FmpClient::new(FmpConfig::from_env()?)?;
//! let segments = client
//!     .fetch_segments(&entity, SegmentType::Product, PeriodType::Annual)
//!     .await?;
//! ```

/// HTTP client and response conversion.
pub mod client;
/// Client configuration.
pub mod config;
/// Segment name normalization.
pub mod names;

pub use client::FmpClient;
pub use config::{FMP_BASE_URL, FmpConfig};
pub use names::normalize_segment_name;
