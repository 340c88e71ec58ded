//! Human-readable price and time formatting

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};

/// `YYYY-MM-DD HH:MM:SS`, always UTC
const DISPLAY_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
/// RFC 822 date as RSS readers expect it, zero-padded and in `+0000`
const RSS_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S +0000";

/// Format a price with two decimals and `,` thousands separators
///
/// Midpoints round to even, so `0.125` becomes `0.12`.
pub fn format_price(price: Decimal) -> String {
    let rounded = price.round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven);
    let fixed = format!("{:.2}", rounded.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, digit) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };
    format!("{}{}.{}", sign, grouped, frac_part)
}

/// Parse a price rendered by [`format_price`], optionally prefixed with `$`
pub fn parse_price(text: &str) -> Option<Decimal> {
    let cleaned: String = text
        .trim()
        .trim_start_matches('$')
        .chars()
        .filter(|c| *c != ',')
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse().ok()
}

/// `2024-01-01 00:00:00 UTC`
pub fn format_display_time(at: DateTime<Utc>) -> String {
    format!("{} UTC", at.format(DISPLAY_TIME_FORMAT))
}

/// `Mon, 01 Jan 2024 00:00:00 +0000`
pub fn format_rss_date(at: DateTime<Utc>) -> String {
    at.format(RSS_DATE_FORMAT).to_string()
}

/// Parse an RFC 2822 date into UTC
pub fn parse_rss_date(text: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(text.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
