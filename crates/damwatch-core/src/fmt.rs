//! Pure display formatters shared by every consumer.
//!
//! All of these are total: malformed input falls back to something
//! renderable instead of erroring, because the upstream scrape is lossy
//! and a kiosk display must never blank out over one bad field.

use chrono::{DateTime, Datelike, Local, NaiveDate, NaiveDateTime};

use crate::fields::Unit;

/// Placeholder for absent values.
pub const MISSING: &str = "--";

/// Format a numeric metric with two decimals and its unit, `"--"` when absent.
///
/// `12.345` metres renders as `"12.35 m"`, an unscraped value as `"--"`.
pub fn format_metric(value: Option<f64>, unit: Unit) -> String {
    match value {
        Some(v) => format!("{v:.2} {}", unit.suffix()),
        None => MISSING.to_owned(),
    }
}

/// Shorten an ISO date to month-and-day: `"2024-03-07"` becomes `"Mar 7"`.
///
/// Malformed input is returned unchanged so the operator still sees what
/// the backend stored.
pub fn format_month_day(date: &str) -> String {
    match NaiveDate::parse_from_str(date, "%Y-%m-%d") {
        Ok(d) => format!("{} {}", d.format("%b"), d.day()),
        Err(_) => date.to_owned(),
    }
}

/// Canonicalize a timestamp to `"Mon-DD HH AM/PM"`.
///
/// Accepts ISO `"YYYY-MM-DD HH:MM"` (with or without seconds); anything
/// else -- including an already-canonical value -- is returned unchanged.
pub fn format_month_day_with_time(value: &str) -> String {
    let parsed = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S"));
    match parsed {
        Ok(dt) => dt.format("%b-%d %I %p").to_string(),
        Err(_) => value.to_owned(),
    }
}

/// Render a scrape timestamp as `"Mon DD HH:MM"` local time.
///
/// The backend writes a zone-naive local ISO timestamp with fractional
/// seconds; older builds wrote RFC 3339. Anything unparseable is returned
/// unchanged.
pub fn format_fetched_at(raw: &str) -> String {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.with_timezone(&Local).format("%b %d %H:%M").to_string();
    }
    for pattern in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, pattern) {
            return dt.format("%b %d %H:%M").to_string();
        }
    }
    raw.to_owned()
}

/// Compact an operator name to `"F.Last"`: `"john smith"` becomes `"J.Smith"`.
///
/// Single-word names are just capitalized.
pub fn compact_operator(name: &str) -> String {
    let mut words = name.split_whitespace();
    let Some(first) = words.next() else {
        return MISSING.to_owned();
    };
    match words.next_back() {
        Some(last) => {
            let initial: String = first.chars().take(1).flat_map(char::to_uppercase).collect();
            format!("{initial}.{}", capitalize(last))
        }
        None => capitalize(first),
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn metric_two_decimals_with_unit() {
        assert_eq!(format_metric(Some(12.345), Unit::Metres), "12.35 m");
        assert_eq!(format_metric(Some(0.5), Unit::Ntu), "0.50 NTU");
        assert_eq!(format_metric(Some(86.0), Unit::Percent), "86.00 %");
    }

    #[test]
    fn metric_missing_is_dashes() {
        assert_eq!(format_metric(None, Unit::Metres), "--");
    }

    #[test]
    fn month_day_drops_year() {
        assert_eq!(format_month_day("2024-03-07"), "Mar 7");
        assert_eq!(format_month_day("2024-12-25"), "Dec 25");
    }

    #[test]
    fn month_day_malformed_unchanged() {
        assert_eq!(format_month_day("07/03/2024"), "07/03/2024");
        assert_eq!(format_month_day(""), "");
    }

    #[test]
    fn month_day_with_time_from_iso() {
        assert_eq!(format_month_day_with_time("2024-03-07 14:00"), "Mar-07 02 PM");
        assert_eq!(format_month_day_with_time("2024-03-07 00:00"), "Mar-07 12 AM");
        assert_eq!(
            format_month_day_with_time("2024-03-07 09:30:00"),
            "Mar-07 09 AM"
        );
    }

    #[test]
    fn month_day_with_time_canonical_unchanged() {
        assert_eq!(format_month_day_with_time("Mar-07 02 PM"), "Mar-07 02 PM");
    }

    #[test]
    fn fetched_at_naive_iso() {
        assert_eq!(
            format_fetched_at("2024-03-07T14:05:11.042117"),
            "Mar 07 14:05"
        );
        assert_eq!(format_fetched_at("2024-03-07 14:05:11"), "Mar 07 14:05");
        assert_eq!(format_fetched_at("2024-03-07 14:05"), "Mar 07 14:05");
    }

    #[test]
    fn fetched_at_malformed_unchanged() {
        assert_eq!(format_fetched_at("just now"), "just now");
        assert_eq!(format_fetched_at(""), "");
    }

    #[test]
    fn operator_compacted() {
        assert_eq!(compact_operator("john smith"), "J.Smith");
        assert_eq!(compact_operator("MARY ANNE o'brien"), "M.O'brien");
    }

    #[test]
    fn operator_single_word() {
        assert_eq!(compact_operator("john"), "John");
    }

    #[test]
    fn operator_empty_is_dashes() {
        assert_eq!(compact_operator("  "), "--");
    }
}
