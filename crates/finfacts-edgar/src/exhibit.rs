//! Earnings press-release exhibit discovery.
//!
//! Current reports attach the press release as an exhibit whose file name
//! follows one of a handful of conventions. Patterns are tried in priority
//! order across every candidate before the next pattern is considered.

use regex::Regex;
use std::sync::LazyLock;

static EXHIBIT_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"q\dfy\d{2}pr",
        r"ex99[-_]?1",
        r"exhibit99[-_]?1",
        r"pressrelease",
        r"earnings",
        r"press.*release",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid exhibit pattern"))
    .collect()
});

/// Picks the press-release document among the files of a filing.
///
/// Only `.htm`/`.html` documents are candidates; index pages are ignored.
/// Returns the original file name.
#[must_use]
pub fn find_press_release_link<'a, I>(file_names: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    let candidates: Vec<(&str, String)> = file_names
        .into_iter()
        .filter_map(|name| {
            let base = name.rsplit('/').next().unwrap_or(name);
            let lower = base.to_ascii_lowercase();
            let is_html = lower.ends_with(".htm") || lower.ends_with(".html");
            (is_html && !lower.contains("index")).then_some((base, lower))
        })
        .collect();

    EXHIBIT_PATTERNS.iter().find_map(|pattern| {
        candidates
            .iter()
            .find(|(_, lower)| pattern.is_match(lower))
            .map(|(name, _)| *name)
    })
}
