//! Codec for the "last active dosing" value.
//!
//! The backend stores a free-form string but both ends agree on the
//! canonical shape `"Mon-DD HH AM/PM"` (e.g. `"Mar-07 02 PM"`). The edit
//! form works on a structured draft; this module converts between the two.
//! The canonical form carries no year, so parsing takes a fallback year.

use chrono::{NaiveDate, NaiveDateTime};

/// AM/PM half of a 12-hour clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Meridiem {
    Am,
    Pm,
}

impl Meridiem {
    pub fn label(self) -> &'static str {
        match self {
            Self::Am => "AM",
            Self::Pm => "PM",
        }
    }
}

/// Structured dosing draft: a calendar date plus a 12-hour clock position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DosingDraft {
    pub date: NaiveDate,
    /// 1..=12
    pub hour: u32,
    pub meridiem: Meridiem,
}

impl DosingDraft {
    /// The 24-hour clock hour (0..=23) this draft denotes.
    pub fn hour24(&self) -> u32 {
        match (self.hour, self.meridiem) {
            (12, Meridiem::Am) => 0,
            (h, Meridiem::Am) => h,
            (12, Meridiem::Pm) => 12,
            (h, Meridiem::Pm) => h + 12,
        }
    }
}

/// Build the canonical value string from a draft: `"Mar-07 02 PM"`.
pub fn build_value(draft: &DosingDraft) -> String {
    format!(
        "{} {:02} {}",
        draft.date.format("%b-%d"),
        draft.hour,
        draft.meridiem.label()
    )
}

/// Parse a stored dosing value into a draft.
///
/// Accepts the canonical `"Mon-DD HH AM/PM"` (year taken from
/// `fallback_year`) and ISO `"YYYY-MM-DD HH:MM"`. Returns `None` for
/// anything else; callers then start from an empty draft.
pub fn parse_value(value: &str, fallback_year: i32) -> Option<DosingDraft> {
    let value = value.trim();

    if let Ok(dt) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M") {
        return Some(from_datetime(&dt));
    }

    // Canonical form: stitch the fallback year in front so chrono can parse
    // a complete date.
    let mut parts = value.split_whitespace();
    let month_day = parts.next()?;
    let hour: u32 = parts.next()?.parse().ok()?;
    let meridiem = match parts.next()? {
        "AM" | "am" => Meridiem::Am,
        "PM" | "pm" => Meridiem::Pm,
        _ => return None,
    };
    if parts.next().is_some() || !(1..=12).contains(&hour) {
        return None;
    }
    let date =
        NaiveDate::parse_from_str(&format!("{fallback_year} {month_day}"), "%Y %b-%d").ok()?;
    Some(DosingDraft {
        date,
        hour,
        meridiem,
    })
}

/// Draft for an arbitrary datetime (e.g. "now" as the empty-draft default).
pub fn from_datetime(dt: &NaiveDateTime) -> DosingDraft {
    use chrono::Timelike;
    let h24 = dt.time().hour();
    let (meridiem, hour) = match h24 {
        0 => (Meridiem::Am, 12),
        1..=11 => (Meridiem::Am, h24),
        12 => (Meridiem::Pm, 12),
        _ => (Meridiem::Pm, h24 - 12),
    };
    DosingDraft {
        date: dt.date(),
        hour,
        meridiem,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid test date")
    }

    #[test]
    fn build_canonical_value() {
        let draft = DosingDraft {
            date: date(2024, 3, 7),
            hour: 2,
            meridiem: Meridiem::Pm,
        };
        assert_eq!(build_value(&draft), "Mar-07 02 PM");
    }

    #[test]
    fn parse_canonical_value() {
        let draft = parse_value("Mar-07 02 PM", 2024).expect("parses");
        assert_eq!(draft.date, date(2024, 3, 7));
        assert_eq!(draft.hour, 2);
        assert_eq!(draft.meridiem, Meridiem::Pm);
    }

    #[test]
    fn parse_iso_value() {
        let draft = parse_value("2024-03-07 14:00", 1999).expect("parses");
        assert_eq!(draft.date, date(2024, 3, 7));
        assert_eq!(draft.hour, 2);
        assert_eq!(draft.meridiem, Meridiem::Pm);
    }

    #[test]
    fn parse_iso_midnight_and_noon() {
        let midnight = parse_value("2024-03-07 00:15", 2024).expect("parses");
        assert_eq!((midnight.hour, midnight.meridiem), (12, Meridiem::Am));
        assert_eq!(midnight.hour24(), 0);

        let noon = parse_value("2024-03-07 12:00", 2024).expect("parses");
        assert_eq!((noon.hour, noon.meridiem), (12, Meridiem::Pm));
        assert_eq!(noon.hour24(), 12);
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(parse_value("", 2024).is_none());
        assert!(parse_value("yesterday", 2024).is_none());
        assert!(parse_value("Mar-07 13 PM", 2024).is_none());
        assert!(parse_value("Mar-07 02 XX", 2024).is_none());
    }

    #[test]
    fn roundtrip_is_idempotent() {
        for (hour, meridiem) in [(1, Meridiem::Am), (12, Meridiem::Am), (11, Meridiem::Pm)] {
            let draft = DosingDraft {
                date: date(2024, 6, 15),
                hour,
                meridiem,
            };
            let reparsed = parse_value(&build_value(&draft), 2024).expect("roundtrips");
            assert_eq!(reparsed, draft);
        }
    }

    #[test]
    fn hour24_mapping() {
        let d = |hour, meridiem| DosingDraft {
            date: date(2024, 1, 1),
            hour,
            meridiem,
        };
        assert_eq!(d(12, Meridiem::Am).hour24(), 0);
        assert_eq!(d(1, Meridiem::Am).hour24(), 1);
        assert_eq!(d(11, Meridiem::Am).hour24(), 11);
        assert_eq!(d(12, Meridiem::Pm).hour24(), 12);
        assert_eq!(d(1, Meridiem::Pm).hour24(), 13);
        assert_eq!(d(11, Meridiem::Pm).hour24(), 23);
    }
}
