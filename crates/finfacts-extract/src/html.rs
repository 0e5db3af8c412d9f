//! HTML table accumulation and text normalization.
//!
//! Filing documents are large, loosely valid HTML. Instead of building a DOM,
//! a tag lexer feeds an explicit state machine that only tracks the table,
//! row and cell it is currently inside:
//!
//! ```text
//! Outside --<table>--> InTable --<tr>--> InRow --<td>/<th>--> InCell
//!    ^                    |  ^             |  ^                  |
//!    +-----</table>-------+  +----</tr>----+  +--</td>/</th>-----+
//! ```
//!
//! Tables nested inside a cell are flattened into that cell's text.

use std::sync::LazyLock;

use html_escape::decode_html_entities;
use regex::Regex;

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<!--.*?-->|<(/?)([A-Za-z][A-Za-z0-9:]*)([^>]*)>").expect("tag regex")
});

static COLSPAN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)colspan\s*=\s*["']?(\d+)"#).expect("colspan regex")
});

static SCRIPT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<script\b.*?</script\s*>|<style\b.*?</style\s*>").expect("script regex")
});

/// Upper bound on colspan padding, guarding against malformed attributes.
const MAX_COLSPAN: usize = 16;

/// A parsed table: rows of trimmed cell text.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Table {
    /// Rows in document order.
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Creates a table from rows.
    #[must_use]
    pub const fn new(rows: Vec<Vec<String>>) -> Self {
        Self { rows }
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if the table has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Space-joined text of the first `rows` rows.
    #[must_use]
    pub fn text(&self, rows: usize) -> String {
        self.rows
            .iter()
            .take(rows)
            .flat_map(|row| row.iter())
            .filter(|cell| !cell.is_empty())
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    Outside,
    InTable,
    InRow,
    InCell,
}

#[derive(Debug)]
struct TableAccumulator {
    state: State,
    /// Depth of tables nested inside the current cell.
    nested: usize,
    tables: Vec<Table>,
    rows: Vec<Vec<String>>,
    row: Vec<String>,
    cell: String,
    colspan: usize,
}

impl TableAccumulator {
    const fn new() -> Self {
        Self {
            state: State::Outside,
            nested: 0,
            tables: Vec::new(),
            rows: Vec::new(),
            row: Vec::new(),
            cell: String::new(),
            colspan: 1,
        }
    }

    fn open(&mut self, name: &str, attrs: &str) {
        if self.state == State::InCell && self.nested > 0 {
            if name == "table" {
                self.nested += 1;
            }
            self.cell.push(' ');
            return;
        }

        match (self.state, name) {
            (State::Outside, "table") => {
                self.rows.clear();
                self.state = State::InTable;
            }
            (State::InTable, "tr") => {
                self.row.clear();
                self.state = State::InRow;
            }
            (State::InRow, "tr") => {
                self.end_row();
                self.state = State::InRow;
            }
            (State::InRow, "td" | "th") => self.start_cell(attrs),
            (State::InCell, "td" | "th") => {
                self.end_cell();
                self.start_cell(attrs);
            }
            (State::InCell, "tr") => {
                self.end_cell();
                self.end_row();
                self.state = State::InRow;
            }
            (State::InCell, "table") => {
                self.nested = 1;
                self.cell.push(' ');
            }
            (State::InCell, _) => self.cell.push(' '),
            _ => {}
        }
    }

    fn close(&mut self, name: &str) {
        if self.state == State::InCell && self.nested > 0 {
            if name == "table" {
                self.nested -= 1;
            }
            self.cell.push(' ');
            return;
        }

        match (self.state, name) {
            (State::InCell, "td" | "th") => {
                self.end_cell();
                self.state = State::InRow;
            }
            (State::InCell, "tr") => {
                self.end_cell();
                self.end_row();
                self.state = State::InTable;
            }
            (State::InCell, "table") => {
                self.end_cell();
                self.end_row();
                self.end_table();
            }
            (State::InCell, _) => self.cell.push(' '),
            (State::InRow, "tr") => {
                self.end_row();
                self.state = State::InTable;
            }
            (State::InRow | State::InTable, "table") => {
                self.end_row();
                self.end_table();
            }
            _ => {}
        }
    }

    fn text(&mut self, text: &str) {
        if self.state == State::InCell {
            self.cell.push_str(text);
        }
    }

    fn start_cell(&mut self, attrs: &str) {
        self.cell.clear();
        self.colspan = COLSPAN_RE
            .captures(attrs)
            .and_then(|caps| caps[1].parse::<usize>().ok())
            .unwrap_or(1)
            .clamp(1, MAX_COLSPAN);
        self.state = State::InCell;
    }

    fn end_cell(&mut self) {
        let decoded = decode_html_entities(&self.cell);
        self.row.push(collapse_whitespace(&decoded));
        for _ in 1..self.colspan {
            self.row.push(String::new());
        }
        self.cell.clear();
        self.colspan = 1;
        self.nested = 0;
    }

    fn end_row(&mut self) {
        if !self.row.is_empty() {
            self.rows.push(std::mem::take(&mut self.row));
        }
    }

    fn end_table(&mut self) {
        if !self.rows.is_empty() {
            self.tables.push(Table::new(std::mem::take(&mut self.rows)));
        }
        self.state = State::Outside;
    }

    fn finish(mut self) -> Vec<Table> {
        match self.state {
            State::InCell => {
                self.end_cell();
                self.end_row();
                self.end_table();
            }
            State::InRow | State::InTable => {
                self.end_row();
                self.end_table();
            }
            State::Outside => {}
        }
        self.tables
    }
}

/// Parses every table in an HTML document, in document order.
///
/// Empty rows and empty tables are dropped. Cell text is entity-decoded and
/// whitespace-collapsed; a cell spanning `n` columns is followed by `n - 1`
/// empty cells so that columns line up across rows.
#[must_use]
pub fn parse_tables(html: &str) -> Vec<Table> {
    let mut acc = TableAccumulator::new();
    let mut cursor = 0;

    for caps in TAG_RE.captures_iter(html) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        acc.text(&html[cursor..whole.start()]);
        cursor = whole.end();

        let Some(name) = caps.get(2) else {
            // Comment.
            continue;
        };
        let name = name.as_str().to_ascii_lowercase();
        let closing = caps.get(1).is_some_and(|m| !m.as_str().is_empty());
        if closing {
            acc.close(&name);
        } else {
            let attrs = caps.get(3).map_or("", |m| m.as_str());
            acc.open(&name, attrs);
        }
    }
    acc.text(&html[cursor..]);
    acc.finish()
}

/// Reduces markup to plain text: scripts and styles dropped, tags replaced by
/// spaces, entities decoded and whitespace collapsed.
#[must_use]
pub fn normalize_text(html: &str) -> String {
    let without_scripts = SCRIPT_RE.replace_all(html, " ");
    let without_tags = TAG_RE.replace_all(&without_scripts, " ");
    let decoded = decode_html_entities(&without_tags);
    collapse_whitespace(&decoded)
}

/// Collapses runs of whitespace (including non-breaking spaces) into single
/// spaces and trims the ends.
#[must_use]
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
