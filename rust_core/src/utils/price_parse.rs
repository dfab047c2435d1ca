//! Locale-tolerant parsing of upstream price strings.
//!
//! Upstreams return prices as display strings in whatever locale the
//! currency implies: `"$1,234.56"`, `"0,75€"`, `"CDN$ 12.50"`. Both comma
//! and period are overloaded as thousands and decimal separators, so parsing
//! is a best-effort heuristic; callers must treat the result accordingly.

use regex::Regex;
use std::sync::OnceLock;

fn numeric_run() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[0-9.,]+").expect("pattern is valid"))
}

/// Extract the first numeric substring and disambiguate its separators:
///
/// - both `,` and `.` present: `,` is a thousands separator, strip it;
/// - only `,` present: a trailing 3-digit group reads as a thousands
///   separator, anything else as a decimal point;
/// - only `.` or neither: parse as-is.
///
/// Returns `None` when no numeric substring exists or the cleaned string
/// still fails to parse. The lone-comma rule cannot distinguish `"1,234"`
/// thousands from a 3-digit-fraction decimal; thousands wins.
pub fn parse_price_str(raw: &str) -> Option<f64> {
    let run = numeric_run().find(raw)?.as_str();

    let has_comma = run.contains(',');
    let has_period = run.contains('.');

    let cleaned = if has_comma && has_period {
        run.replace(',', "")
    } else if has_comma {
        let trailing_group = run.rsplit(',').next().unwrap_or_default();
        if trailing_group.len() == 3 {
            run.replace(',', "")
        } else {
            run.replace(',', ".")
        }
    } else {
        run.to_string()
    };

    cleaned.parse::<f64>().ok()
}
