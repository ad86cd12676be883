//! Display helpers shared by notification templates and printed reports.

use chrono::{Datelike, NaiveDate, NaiveTime};
use rust_decimal::Decimal;

pub const NO_TIME_LABEL: &str = "時間未指定";
pub const DEFAULT_CUSTOMER_NAME: &str = "顧客";

/// `¥1,980`. Amounts are whole yen; any fraction is rounded.
pub fn format_yen(amount: Decimal) -> String {
    let rounded = amount.round();
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let digits = rounded.abs().trunc().to_string();

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    if negative {
        format!("-¥{}", grouped)
    } else {
        format!("¥{}", grouped)
    }
}

/// `2025/3/9`
pub fn format_date(date: NaiveDate) -> String {
    format!("{}/{}/{}", date.year(), date.month(), date.day())
}

pub fn format_time(time: NaiveTime) -> String {
    time.format("%H:%M").to_string()
}

/// `09:00 - 12:00`, or the no-time label when the start is unknown.
pub fn format_time_range(start: Option<NaiveTime>, end: Option<NaiveTime>) -> String {
    match (start, end) {
        (Some(start), Some(end)) => format!("{} - {}", format_time(start), format_time(end)),
        (Some(start), None) => format_time(start),
        _ => NO_TIME_LABEL.to_string(),
    }
}

/// Key used to bucket reservations by pickup slot: `09:00-12:00`.
pub fn time_slot_key(start: Option<NaiveTime>, end: Option<NaiveTime>) -> String {
    match (start, end) {
        (Some(start), Some(end)) => format!("{}-{}", format_time(start), format_time(end)),
        (Some(start), None) => format_time(start),
        _ => NO_TIME_LABEL.to_string(),
    }
}

pub fn display_name(name: Option<&str>) -> &str {
    name.map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or(DEFAULT_CUSTOMER_NAME)
}

/// Escapes text for inclusion in HTML element content or quoted attributes.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}
