//! Geo Classifier
//!
//! Maps a domain to an approximate region from its top-level suffix.
//! Exact-match lookup only: no wildcards, no subdomain rules.

use std::collections::HashMap;
use once_cell::sync::Lazy;

/// Region returned for unknown suffixes and malformed domains
pub const FALLBACK_REGION: &str = "Global";

// ============================================================================
// SUFFIX TABLE
// ============================================================================

const SUFFIX_REGIONS: &[(&str, &str)] = &[
    // Generic TLDs carry no location signal
    ("com", FALLBACK_REGION),
    ("net", FALLBACK_REGION),
    ("org", FALLBACK_REGION),
    ("info", FALLBACK_REGION),
    ("io", FALLBACK_REGION),
    ("xyz", FALLBACK_REGION),
    ("top", FALLBACK_REGION),
    // Country codes
    ("ru", "Russia"),
    ("su", "Russia"),
    ("cn", "China"),
    ("hk", "Hong Kong"),
    ("tw", "Taiwan"),
    ("kp", "North Korea"),
    ("kr", "South Korea"),
    ("jp", "Japan"),
    ("ir", "Iran"),
    ("in", "India"),
    ("pk", "Pakistan"),
    ("vn", "Vietnam"),
    ("id", "Indonesia"),
    ("th", "Thailand"),
    ("ph", "Philippines"),
    ("ua", "Ukraine"),
    ("by", "Belarus"),
    ("kz", "Kazakhstan"),
    ("tr", "Turkey"),
    ("de", "Germany"),
    ("fr", "France"),
    ("nl", "Netherlands"),
    ("uk", "United Kingdom"),
    ("it", "Italy"),
    ("es", "Spain"),
    ("pl", "Poland"),
    ("ro", "Romania"),
    ("ch", "Switzerland"),
    ("se", "Sweden"),
    ("us", "United States"),
    ("ca", "Canada"),
    ("mx", "Mexico"),
    ("br", "Brazil"),
    ("ar", "Argentina"),
    ("ng", "Nigeria"),
    ("za", "South Africa"),
    ("eg", "Egypt"),
    ("au", "Australia"),
    ("tk", "Tokelau"),
];

static SUFFIX_TABLE: Lazy<HashMap<&'static str, &'static str>> =
    Lazy::new(|| SUFFIX_REGIONS.iter().copied().collect());

// ============================================================================
// CLASSIFICATION
// ============================================================================

/// Classify a domain into a region label. Never fails.
pub fn classify(domain: &str) -> &'static str {
    match top_level_suffix(domain) {
        Some(suffix) => SUFFIX_TABLE
            .get(suffix.to_ascii_lowercase().as_str())
            .copied()
            .unwrap_or(FALLBACK_REGION),
        None => FALLBACK_REGION,
    }
}

/// Classify an optional domain; absent counts as [`FALLBACK_REGION`]
pub fn classify_opt(domain: Option<&str>) -> &'static str {
    domain.map(classify).unwrap_or(FALLBACK_REGION)
}

/// Label after the final `.`, or `None` for malformed input
/// (`""`, `"ru"`, `".ru"`, `"evil.ru."`).
fn top_level_suffix(domain: &str) -> Option<&str> {
    let domain = domain.trim();
    let (head, suffix) = domain.rsplit_once('.')?;
    if head.is_empty() || suffix.is_empty() {
        return None;
    }
    Some(suffix)
}
