//! Chlorine tank cycle status.
//!
//! The tank is swapped roughly every week; the dashboard badges the stored
//! change date by how many whole days have passed. Day counting uses
//! calendar dates (local midnights), not 24-hour spans, so "yesterday"
//! is always one day regardless of clock time.

use chrono::NaiveDate;
use strum::Display;

/// How far into the chlorine cycle the plant is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ChlorineCycleStatus {
    /// 0-6 days since the last change.
    #[strum(serialize = "normal")]
    Normal,
    /// 7-9 days -- change due.
    #[strum(serialize = "warning")]
    Warning,
    /// 10 days or more -- overdue.
    #[strum(serialize = "critical")]
    Critical,
    /// No stored date, or one that doesn't parse.
    #[strum(serialize = "unknown")]
    Unknown,
}

/// Whole days elapsed since the stored ISO change date.
///
/// Negative when the stored date is in the future (clock skew on the
/// scraped source); callers treat that like day zero.
pub fn days_since(date: &str, today: NaiveDate) -> Option<i64> {
    let changed = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d").ok()?;
    Some((today - changed).num_days())
}

/// Classify the stored change date against `today`.
pub fn cycle_status(date: Option<&str>, today: NaiveDate) -> ChlorineCycleStatus {
    let Some(days) = date.and_then(|d| days_since(d, today)) else {
        return ChlorineCycleStatus::Unknown;
    };
    match days {
        ..=6 => ChlorineCycleStatus::Normal,
        7..=9 => ChlorineCycleStatus::Warning,
        _ => ChlorineCycleStatus::Critical,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid test date")
    }

    #[test]
    fn whole_day_difference() {
        let today = day(2024, 3, 10);
        assert_eq!(days_since("2024-03-10", today), Some(0));
        assert_eq!(days_since("2024-03-09", today), Some(1));
        assert_eq!(days_since("2024-03-01", today), Some(9));
        assert_eq!(days_since("2024-03-12", today), Some(-2));
    }

    #[test]
    fn status_thresholds() {
        let today = day(2024, 3, 10);
        assert_eq!(
            cycle_status(Some("2024-03-10"), today),
            ChlorineCycleStatus::Normal
        );
        assert_eq!(
            cycle_status(Some("2024-03-04"), today),
            ChlorineCycleStatus::Normal
        );
        assert_eq!(
            cycle_status(Some("2024-03-03"), today),
            ChlorineCycleStatus::Warning
        );
        assert_eq!(
            cycle_status(Some("2024-03-01"), today),
            ChlorineCycleStatus::Warning
        );
        assert_eq!(
            cycle_status(Some("2024-02-29"), today),
            ChlorineCycleStatus::Critical
        );
    }

    #[test]
    fn future_date_counts_as_normal() {
        let today = day(2024, 3, 10);
        assert_eq!(
            cycle_status(Some("2024-03-15"), today),
            ChlorineCycleStatus::Normal
        );
    }

    #[test]
    fn unparseable_is_unknown() {
        let today = day(2024, 3, 10);
        assert_eq!(cycle_status(None, today), ChlorineCycleStatus::Unknown);
        assert_eq!(
            cycle_status(Some("last tuesday"), today),
            ChlorineCycleStatus::Unknown
        );
        assert_eq!(cycle_status(Some(""), today), ChlorineCycleStatus::Unknown);
    }
}
