//! Item name canonicalization used for all matching and cache keys.
//!
//! Marketplace listings decorate the same item inconsistently: star glyphs,
//! trademark marks, pipe separators, and a handful of wear/variant phrasings
//! that appear with spaces, hyphens, or nothing at all. Normalization folds
//! all of those into one spelling so lookups compare apples to apples.
//! Normalized strings are keys only and are never displayed.

use regex::Regex;
use std::sync::OnceLock;

/// Wear/variant phrasings collapsed into a single canonical spelling before
/// the punctuation pass.
const VARIANT_SPELLINGS: &[(&str, &str)] = &[
    (r"(?i)stat[\s_\-]*trak", "stattrak"),
    (r"(?i)factory[\s_\-]*new", "factory-new"),
    (r"(?i)minimal[\s_\-]*wear", "minimal-wear"),
    (r"(?i)field[\s_\-]*tested", "field-tested"),
    (r"(?i)well[\s_\-]*worn", "well-worn"),
    (r"(?i)battle[\s_\-]*scarred", "battle-scarred"),
];

fn variant_patterns() -> &'static Vec<(Regex, &'static str)> {
    static PATTERNS: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        VARIANT_SPELLINGS
            .iter()
            .map(|(pattern, canonical)| {
                (
                    Regex::new(pattern).expect("variant pattern is valid"),
                    *canonical,
                )
            })
            .collect()
    })
}

fn non_alnum_run() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^a-zA-Z0-9]+").expect("pattern is valid"))
}

/// Canonicalize an item name for matching. Deterministic, total, and
/// idempotent: `normalize_name(normalize_name(x)) == normalize_name(x)`.
///
/// Steps, in order: strip decorative glyphs, collapse known wear/variant
/// phrasings, replace every run of non-alphanumerics with a single space,
/// trim, case-fold.
pub fn normalize_name(raw: &str) -> String {
    let mut name = raw.replace(['★', '☆', '™', '|'], " ");
    for (pattern, canonical) in variant_patterns() {
        name = pattern.replace_all(&name, *canonical).into_owned();
    }
    let name = non_alnum_run().replace_all(&name, " ");
    name.trim().to_lowercase()
}
