//! Segment-revenue detection in filing tables.
//!
//! Long-form filings contain hundreds of tables. [`SegmentTableParser`] admits
//! the few that look like a segment revenue breakdown, anchors each on its
//! year header and reads one value per (segment row, year column). A second
//! pass handles the transposed layout, with segments as column headers and a
//! single revenue row.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use chrono::NaiveDate;
use finfacts_core::{
    Entity, FiscalPeriod, Scale, SegmentObservation, SegmentType, TableConfig, parse_money,
};
use regex::Regex;
use rust_decimal::Decimal;
use tracing::debug;

use crate::html::{Table, parse_tables};

/// Phrases that mark a revenue breakdown table.
const REVENUE_HEADERS: &[&str] = &[
    "revenues:",
    "total revenues",
    "total revenue",
    "revenue by end market",
    "revenue by geography",
    "net revenue",
    "revenue, net",
];

/// Row-name fragments of non-segment lines.
const DENY_FRAGMENTS: &[&str] = &[
    "total",
    "subtotal",
    "elimination",
    "operating expense",
    "margin",
    "percent",
    "(in millions)",
    "(dollars",
    "expenses",
    "cost",
    "income",
    "loss",
    "depreciation",
    "amortization",
    "restructur",
    "research and development",
    "sales and marketing",
    "general and administrative",
    "selling",
    "interest",
    "stock-based",
    "provision",
    "diluted",
    "basic",
    "earnings",
    "profit",
    "impairment",
    "compensation",
    "weighted",
    "shares outstanding",
    "litigation",
    "realignment",
    "charges",
    "acquisition",
    "tax",
    "dividend",
    "net revenue",
    "revenue, net",
];

/// Row names rejected only on an exact match.
const DENY_EXACT: &[&str] = &["revenue", "revenues", "net", "other", "exabytes"];

/// Column labels of transposed tables that are not segments.
const NON_SEGMENT_COLUMNS: &[&str] = &["total", "unallocated", "all other"];

/// Region tokens that make a segment geographic.
const GEOGRAPHY_TOKENS: &[&str] = &[
    "america",
    "europe",
    "asia",
    "china",
    "japan",
    "international",
    "emea",
    "united states",
    "hong kong",
    "rest of",
    "middle east",
    "africa",
    "apac",
    "pacific",
    "singapore",
    "taiwan",
    "korea",
    "india",
    "united kingdom",
    "germany",
    "canada",
];

static LARGE_NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{1,2},\d{3}").expect("large number regex"));

static YEAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|\D)(20[12]\d)(?:\D|$)").expect("year regex"));

static FOOTNOTE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\(\d+\)$").expect("footnote regex"));

static TRANSPOSED_ANCHOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:year\s+ended|fiscal(?:\s+year)?)[^0-9]{0,30}(?:\d{1,2},\s*)?(20[12]\d)")
        .expect("transposed anchor regex")
});

static LABEL_EXCLUDE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(for|year|fiscal|\d{4}|\(?in millions)").expect("label exclude regex")
});

static UK_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\buk\b").expect("uk regex"));

/// Classifies a segment name as geographic or product by region tokens.
#[must_use]
pub fn classify_segment(name: &str) -> SegmentType {
    let lower = name.to_lowercase();
    if GEOGRAPHY_TOKENS.iter().any(|token| lower.contains(token)) || UK_RE.is_match(&lower) {
        SegmentType::Geography
    } else {
        SegmentType::Product
    }
}

/// A value read from one table before cross-table dedup.
#[derive(Clone, Debug, PartialEq, Eq)]
struct Candidate {
    name: String,
    fiscal_year: i32,
    revenue: Decimal,
    table_index: usize,
}

/// Extracts segment revenue from filing tables.
#[derive(Clone, Debug, Default)]
pub struct SegmentTableParser {
    config: TableConfig,
}

impl SegmentTableParser {
    /// Creates a parser with custom heuristics.
    #[must_use]
    pub const fn new(config: TableConfig) -> Self {
        Self { config }
    }

    /// Extracts annual segment revenue from a filing document.
    ///
    /// Returns one observation per (segment, fiscal year), ordered by
    /// descending fiscal year then name. Documents without an admissible
    /// table yield nothing.
    #[must_use]
    pub fn parse_document(&self, html: &str) -> Vec<SegmentObservation> {
        let tables = parse_tables(html);
        self.parse_tables(&tables)
    }

    /// Same as [`parse_document`](Self::parse_document) over pre-parsed tables.
    #[must_use]
    pub fn parse_tables(&self, tables: &[Table]) -> Vec<SegmentObservation> {
        let tables: Vec<&Table> = tables
            .iter()
            .filter(|table| table.len() >= self.config.min_rows)
            .collect();

        let mut candidates = Vec::new();
        let mut table_index = 0;

        for table in &tables {
            if let Some(found) = self.read_vertical(table, table_index) {
                candidates.extend(found);
                table_index += 1;
            }
        }
        for table in &tables {
            if let Some(found) = self.read_transposed(table, table_index) {
                candidates.extend(found);
                table_index += 1;
            }
        }

        debug!(
            tables = tables.len(),
            candidates = candidates.len(),
            "Scanned filing tables"
        );
        dedupe(candidates)
    }

    /// Extracts the current quarter's segment revenue from a 10-Q document.
    ///
    /// Only the latest fiscal year in the document is kept, which drops the
    /// prior-year comparative columns. The fiscal quarter comes from the
    /// filing's report date and the entity's fiscal calendar.
    #[must_use]
    pub fn parse_quarterly(
        &self,
        html: &str,
        entity: &Entity,
        report_date: NaiveDate,
    ) -> Vec<SegmentObservation> {
        let observations = self.parse_document(html);
        let Some(latest) = observations.iter().map(|o| o.fiscal_year).max() else {
            return Vec::new();
        };
        let (fiscal_year, period) = entity.fiscal_quarter(report_date);

        observations
            .into_iter()
            .filter(|o| o.fiscal_year == latest)
            .map(|mut o| {
                o.fiscal_year = fiscal_year;
                o.period = period;
                o
            })
            .collect()
    }

    fn is_admitted(&self, table: &Table) -> bool {
        let text = table.text(self.config.admission_scan_rows);
        let lower = text.to_lowercase();
        REVENUE_HEADERS.iter().any(|phrase| lower.contains(phrase))
            && LARGE_NUMBER_RE.is_match(&text)
    }

    fn scale(&self, table: &Table, default: Scale) -> Scale {
        let lower = table.text(self.config.admission_scan_rows).to_lowercase();
        if lower.contains("(in millions") || lower.contains("(dollars in millions") {
            Scale::Millions
        } else if lower.contains("(in thousands") || lower.contains("(dollars in thousands") {
            Scale::Thousands
        } else {
            default
        }
    }

    /// Reads a table laid out with segments as rows and years as columns.
    fn read_vertical(&self, table: &Table, table_index: usize) -> Option<Vec<Candidate>> {
        if !self.is_admitted(table) {
            return None;
        }
        let (header_idx, year_columns) = self.year_header(table)?;
        let scale = self.scale(table, Scale::Units);

        let mut found = Vec::new();
        for row in table.rows.iter().skip(header_idx + 1) {
            let Some((name_idx, name)) = self.row_name(row) else {
                continue;
            };
            if is_denied(&name) {
                continue;
            }
            for (fiscal_year, column) in &year_columns {
                if let Some(revenue) = self
                    .value_near(row, *column, name_idx)
                    .and_then(|value| scale.apply(value))
                {
                    found.push(Candidate {
                        name: name.clone(),
                        fiscal_year: *fiscal_year,
                        revenue,
                        table_index,
                    });
                }
            }
        }
        Some(found)
    }

    /// First row among the leading rows that names years, with each year's
    /// column index.
    fn year_header(&self, table: &Table) -> Option<(usize, Vec<(i32, usize)>)> {
        table
            .rows
            .iter()
            .take(self.config.header_scan_rows)
            .enumerate()
            .find_map(|(row_idx, row)| {
                let mut columns: Vec<(i32, usize)> = Vec::new();
                for (col, cell) in row.iter().enumerate() {
                    let Some(year) = YEAR_RE
                        .captures(cell)
                        .and_then(|caps| caps[1].parse::<i32>().ok())
                    else {
                        continue;
                    };
                    if !columns.iter().any(|(y, _)| *y == year) {
                        columns.push((year, col));
                    }
                }
                (!columns.is_empty()).then_some((row_idx, columns))
            })
    }

    /// Segment name of a row and its cell index.
    fn row_name(&self, row: &[String]) -> Option<(usize, String)> {
        let (idx, name) = row.iter().enumerate().find_map(|(idx, cell)| {
            let cell = cell.trim();
            if cell.is_empty() || cell == "$" || cell.starts_with('(') || cell.chars().count() <= 1 {
                return None;
            }
            if is_numeric_cell(cell) {
                return None;
            }
            let name = clean_name(cell);
            (!name.is_empty()).then_some((idx, name))
        })?;
        // An overlong first label drops the row rather than yielding to a later cell.
        (name.chars().count() <= self.config.max_name_len).then_some((idx, name))
    }

    /// Searches the cells around `column`, nearest first, for a figure.
    fn value_near(&self, row: &[String], column: usize, name_idx: usize) -> Option<Decimal> {
        let window = self.config.value_window;
        let mut offsets: Vec<isize> = vec![0];
        for step in 1..=window {
            let step = isize::try_from(step).ok()?;
            offsets.push(step);
            offsets.push(-step);
        }

        offsets.into_iter().find_map(|offset| {
            let idx = column.checked_add_signed(offset)?;
            if idx <= name_idx {
                return None;
            }
            let cell = row.get(idx)?.trim();
            if cell.is_empty() || cell == "$" {
                return None;
            }
            parse_money(cell).filter(|value| *value >= self.config.min_native_value)
        })
    }

    /// Reads a table with segments as column headers and one revenue row.
    fn read_transposed(&self, table: &Table, table_index: usize) -> Option<Vec<Candidate>> {
        let scan = self.config.header_scan_rows;
        let anchor_text = table.text(scan);
        let fiscal_year: i32 = TRANSPOSED_ANCHOR_RE
            .captures(&anchor_text)
            .and_then(|caps| caps[1].parse().ok())?;

        let (header_idx, header) = table
            .rows
            .iter()
            .take(scan)
            .enumerate()
            .find(|(_, row)| row.iter().filter(|c| !c.trim().is_empty()).count() >= 3)?;

        let labels: Vec<&str> = header
            .iter()
            .map(|cell| cell.trim())
            .filter(|cell| !cell.is_empty() && !LABEL_EXCLUDE_RE.is_match(cell))
            .collect();
        let segment_count = labels
            .iter()
            .filter(|label| !NON_SEGMENT_COLUMNS.contains(&label.to_lowercase().as_str()))
            .count();
        if segment_count < 2 {
            return None;
        }

        let revenue_row = table.rows.iter().skip(header_idx + 1).find(|row| {
            row.iter().find(|c| !c.trim().is_empty()).is_some_and(|label| {
                let lower = label.to_lowercase();
                lower.contains("revenue") && !lower.contains("cost") && !lower.contains("deferred")
            })
        })?;

        let values: Vec<Decimal> = revenue_row
            .iter()
            .filter(|cell| {
                let cell = cell.trim();
                !cell.is_empty() && cell != "$" && !cell.to_lowercase().contains("revenue")
            })
            .filter_map(|cell| parse_money(cell))
            .filter(|value| value.abs() > Decimal::ONE)
            .collect();

        let scale = self.scale(table, Scale::Millions);
        let found = labels
            .iter()
            .zip(values)
            .filter(|(label, value)| {
                !NON_SEGMENT_COLUMNS.contains(&label.to_lowercase().as_str()) && *value > Decimal::ZERO
            })
            .filter_map(|(label, value)| {
                Some(Candidate {
                    name: clean_name(label),
                    fiscal_year,
                    revenue: scale.apply(value)?,
                    table_index,
                })
            })
            .collect();
        Some(found)
    }
}

fn is_numeric_cell(cell: &str) -> bool {
    let digits: String = cell
        .chars()
        .filter(|c| !matches!(c, ',' | '.' | '-' | '$' | '%' | ' '))
        .collect();
    !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
}

fn clean_name(cell: &str) -> String {
    let trimmed = cell.trim().trim_end_matches(':').trim();
    FOOTNOTE_RE.replace(trimmed, "").trim().to_string()
}

fn is_denied(name: &str) -> bool {
    let lower = name.to_lowercase();
    DENY_EXACT.contains(&lower.as_str()) || DENY_FRAGMENTS.iter().any(|f| lower.contains(f))
}

/// Keeps the first table per fiscal year, then the largest value per
/// (segment, fiscal year).
fn dedupe(candidates: Vec<Candidate>) -> Vec<SegmentObservation> {
    let mut first_table: BTreeMap<i32, usize> = BTreeMap::new();
    for candidate in &candidates {
        first_table
            .entry(candidate.fiscal_year)
            .and_modify(|idx| *idx = (*idx).min(candidate.table_index))
            .or_insert(candidate.table_index);
    }

    let mut best: BTreeMap<(i32, String), Decimal> = BTreeMap::new();
    for candidate in candidates {
        if first_table.get(&candidate.fiscal_year) != Some(&candidate.table_index) {
            continue;
        }
        let slot = best
            .entry((candidate.fiscal_year, candidate.name))
            .or_insert(candidate.revenue);
        if candidate.revenue > *slot {
            *slot = candidate.revenue;
        }
    }

    let mut observations: Vec<SegmentObservation> = best
        .into_iter()
        .map(|((fiscal_year, name), revenue)| SegmentObservation {
            segment_type: classify_segment(&name),
            segment_name: name,
            fiscal_year,
            period: FiscalPeriod::Annual,
            revenue,
        })
        .collect();
    observations.sort_by(|a, b| {
        b.fiscal_year
            .cmp(&a.fiscal_year)
            .then_with(|| a.segment_name.cmp(&b.segment_name))
    });
    observations
}
