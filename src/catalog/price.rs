//! Price text parsing.
//!
//! Scraped prices are currency-prefixed strings ("£51.77"). Parsing is total:
//! anything that doesn't contain a decimal number yields 0.0, which the
//! aggregation layer treats as "no valid price".

use std::sync::OnceLock;

use regex::Regex;

/// Matches the numeric run of a currency-formatted price, thousands
/// separators included.
fn price_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(\d[\d,]*(?:\.\d+)?)").expect("price pattern is valid")
    })
}

/// Parse a currency-formatted price string.
///
/// Strips the currency prefix and thousands separators; returns 0.0 on any
/// parse failure rather than an error.
pub fn parse_price(raw: &str) -> f64 {
    let Some(caps) = price_pattern().captures(raw) else {
        return 0.0;
    };
    caps[1].replace(',', "").parse().unwrap_or(0.0)
}

/// Round to two decimal places, half away from zero.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
