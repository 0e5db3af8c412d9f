//! SEC API response types.

use chrono::NaiveDate;
use finfacts_core::{FilingMeta, FormType};
use serde::Deserialize;
use std::collections::HashMap;

/// Company ticker entry from `company_tickers.json`.
#[derive(Debug, Deserialize)]
pub(crate) struct CompanyTickerInfo {
    /// CIK as a number (SEC returns this as an integer)
    pub(crate) cik_str: u64,
    pub(crate) ticker: String,
}

/// Finds the zero-padded CIK of `ticker` in the tickers document.
pub(crate) fn find_cik(tickers: &HashMap<String, CompanyTickerInfo>, ticker: &str) -> Option<String> {
    tickers
        .values()
        .find(|company| company.ticker.eq_ignore_ascii_case(ticker))
        .map(|company| format!("{:0>10}", company.cik_str))
}

/// Response from the submissions API.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct CompanySubmissions {
    #[serde(default)]
    pub(crate) filings: Filings,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct Filings {
    #[serde(default)]
    pub(crate) recent: RecentFilings,
}

/// Recent filings as parallel arrays, newest first.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RecentFilings {
    #[serde(default)]
    pub(crate) accession_number: Vec<String>,
    #[serde(default)]
    pub(crate) filing_date: Vec<String>,
    #[serde(default)]
    pub(crate) report_date: Vec<String>,
    #[serde(default)]
    pub(crate) form: Vec<String>,
    #[serde(default)]
    pub(crate) primary_document: Vec<String>,
}

fn parse_date(value: Option<&String>) -> Option<NaiveDate> {
    value
        .filter(|s| !s.is_empty())
        .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
}

impl RecentFilings {
    /// Filings of `form` (amendments included), in the order listed, at most
    /// `limit`.
    pub(crate) fn select(&self, form: FormType, limit: usize) -> Vec<FilingMeta> {
        self.form
            .iter()
            .enumerate()
            .filter(|(_, f)| form.matches(f))
            .filter_map(|(i, f)| {
                let accession = self.accession_number.get(i)?.clone();
                Some(FilingMeta {
                    accession,
                    form: f.clone(),
                    filing_date: parse_date(self.filing_date.get(i)),
                    report_date: parse_date(self.report_date.get(i)),
                    primary_document: self.primary_document.get(i).cloned().unwrap_or_default(),
                })
            })
            .take(limit)
            .collect()
    }
}

/// Filing directory listing (`index.json`).
#[derive(Debug, Default, Deserialize)]
pub(crate) struct DirectoryResponse {
    #[serde(default)]
    pub(crate) directory: Directory,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct Directory {
    #[serde(default)]
    pub(crate) item: Vec<DirectoryItem>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DirectoryItem {
    pub(crate) name: String,
}

impl DirectoryResponse {
    /// File names in the filing directory.
    pub(crate) fn file_names(&self) -> Vec<&str> {
        self.directory.item.iter().map(|item| item.name.as_str()).collect()
    }
}
