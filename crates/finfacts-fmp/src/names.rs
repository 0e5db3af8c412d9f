//! Segment name normalization.
//!
//! Providers rename segments between filings ("Xbox" vs "Gaming", business
//! unit codes vs. names). Renames map variants onto one canonical name per
//! entity so a segment forms a single series. Skipped labels are aggregates,
//! non-revenue lines or footnoted duplicates that should never become
//! segment records.

use finfacts_core::Symbol;

/// (entity, variant, canonical)
const RENAMES: &[(&str, &str, &str)] = &[
    ("GOOGL", "YouTube Advertising Revenue", "YouTube Ads"),
    ("GOOGL", "Google Subscriptions, Platforms, And Devices", "Google Subscriptions"),
    ("GOOGL", "Google Subscriptions , Platforms, And Devices", "Google Subscriptions"),
    ("GOOGL", "Google Network Members' Properties", "Google Network"),
    ("GOOGL", "Google Properties", "Google Search & Other"),
    ("GOOGL", "Other Bets Revenues", "Other Bets"),
    ("MSFT", "Xbox", "Gaming"),
    ("MSFT", "Microsoft Three Six Five Commercial Products And Cloud Services", "Microsoft Office"),
    ("MSFT", "Microsoft Three Six Five Consumer Products and Cloud Services", "Microsoft Office"),
    ("MSFT", "Microsoft Office System", "Microsoft Office"),
    ("MSFT", "Consulting And Product Support Services", "Enterprise Services"),
    ("AAPL", "Service", "Services"),
    ("MU", "CMBU", "Cloud Memory"),
    ("MU", "MCBU", "Mobile and Client"),
    ("MU", "CDBU", "Core Data Center"),
    ("MU", "AEBU", "Automotive and Edge"),
    ("MU", "CNBU", "Compute and Networking"),
    ("MU", "MBU", "Mobile"),
    ("MU", "EBU", "Embedded"),
    ("MU", "SBU", "Storage"),
    ("QCOM", "IoT (internet of things)", "IoT"),
];

/// Labels skipped for one entity only.
const ENTITY_SKIPS: &[(&str, &str)] = &[
    ("QCOM", "EBT"),
    ("QCOM", "Equipment and services"),
    ("QCOM", "RFFE"),
    ("MU", "Compute and Networking"),
    ("MU", "Patent cross-license agreement"),
    ("WDC", "China"),
    ("WDC", "Hong Kong"),
    ("WDC", "Rest of Asia"),
    ("WDC", "United States"),
];

/// Labels skipped for every entity.
const GLOBAL_SKIPS: &[&str] = &[
    "EBITDA",
    "Adjusted EBITDA",
    "Cash flow from operations",
    "Free cash flow",
    "Adjusted free cash flow",
    "Products (a)",
    "Services (b)",
];

/// Canonical name of a segment label, or `None` if the label is skipped.
///
/// Whitespace runs (including line breaks) are collapsed before lookup, and
/// skips apply to the canonical name.
#[must_use]
pub fn normalize_segment_name(entity: &Symbol, name: &str) -> Option<String> {
    let collapsed = name.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        return None;
    }
    let canonical = RENAMES
        .iter()
        .find(|(symbol, variant, _)| *symbol == entity.as_str() && *variant == collapsed)
        .map_or(collapsed.as_str(), |(_, _, canonical)| *canonical)
        .to_string();

    let skipped = GLOBAL_SKIPS.contains(&canonical.as_str())
        || ENTITY_SKIPS
            .iter()
            .any(|(symbol, label)| *symbol == entity.as_str() && *label == canonical);
    (!skipped).then_some(canonical)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_renames_are_per_entity() {
        let msft = Symbol::new("MSFT");
        assert_eq!(normalize_segment_name(&msft, "Xbox").as_deref(), Some("Gaming"));
        assert_eq!(
            normalize_segment_name(&Symbol::new("NVDA"), "Xbox").as_deref(),
            Some("Xbox")
        );
    }

    #[test]
    fn test_whitespace_collapsed_before_lookup() {
        let googl = Symbol::new("GOOGL");
        assert_eq!(
            normalize_segment_name(&googl, "Google Subscriptions\n, Platforms, And Devices").as_deref(),
            Some("Google Subscriptions")
        );
        assert_eq!(
            normalize_segment_name(&googl, "  Google   Cloud ").as_deref(),
            Some("Google Cloud")
        );
    }

    #[test]
    fn test_skips() {
        assert_eq!(normalize_segment_name(&Symbol::new("AAPL"), "EBITDA"), None);
        assert_eq!(normalize_segment_name(&Symbol::new("MU"), "CNBU"), None);
        assert_eq!(normalize_segment_name(&Symbol::new("WDC"), "China"), None);
        assert_eq!(
            normalize_segment_name(&Symbol::new("AAPL"), "United States").as_deref(),
            Some("United States")
        );
        assert_eq!(normalize_segment_name(&Symbol::new("AAPL"), "   "), None);
    }
}
