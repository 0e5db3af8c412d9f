#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/finfacts/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! SEC EDGAR repository for filings and structured facts.
//!
//! [`EdgarClient`] implements [`FactsRepository`](finfacts_core::FactsRepository)
//! (companyfacts JSON) and [`FilingsRepository`](finfacts_core::FilingsRepository)
//! (submissions, archive documents and press-release exhibits).
//!
//! # Example
//!
//! ```rust,ignore
//! use finfacts_core::{EntityRegistry, FilingsRepository, FormType, Symbol};
//! use finfacts_edgar::{EdgarClient, EdgarConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = EdgarClient::new(EdgarConfig::new("MyApp/1.0 (contact@example.com)"))?;
//!     let registry = EntityRegistry::builtin();
//!     let nvda = registry.get(&Symbol::new("NVDA"))?;
//!
//!     for filing in client.list_filings(nvda, FormType::EightK, 4).await? {
//!         if let Some(release) = client.find_press_release(nvda, &filing).await? {
//!             println!("{}: {} bytes", filing.accession, release.len());
//!         }
//!     }
//!     Ok(())
//! }
//! ```

/// Rate-limited HTTP client.
pub mod client;
/// Client configuration.
pub mod config;
/// Press-release exhibit discovery.
pub mod exhibit;
mod submissions;

pub use client::EdgarClient;
pub use config::{EDGAR_ARCHIVES_URL, EDGAR_BASE_URL, EdgarConfig};
pub use exhibit::find_press_release_link;
