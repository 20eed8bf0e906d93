//! Display-only turbidity substitutions.
//!
//! Some deployments pin the displayed turbidity for specific wall-clock
//! hours (sensor known-bad windows). The substitution is a rendering
//! patch: the stored snapshot and everything sent to the backend keep the
//! scraped values. The map is supplied through config and is empty by
//! default.

use std::collections::HashMap;

use damwatch_api::LiveSnapshot;
use serde::Deserialize;

/// 12-hour wall-clock label for a 24-hour clock hour: `13` -> `"1 PM"`.
pub fn hour_label(hour24: u32) -> String {
    let h = hour24 % 24;
    let (display, meridiem) = match h {
        0 => (12, "AM"),
        1..=11 => (h, "AM"),
        12 => (12, "PM"),
        _ => (h - 12, "PM"),
    };
    format!("{display} {meridiem}")
}

/// Parse a wall-clock label back to a 24-hour clock hour.
///
/// Accepts both the bare config form (`"1 PM"`) and the backend's
/// `target_hour` form (`"1:00 PM"`); minutes are ignored.
pub fn parse_hour_label(label: &str) -> Option<u32> {
    let mut parts = label.trim().split_whitespace();
    let clock = parts.next()?;
    let hour_text = match clock.split_once(':') {
        Some((h, minutes)) => {
            if minutes.len() != 2 || !minutes.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            h
        }
        None => clock,
    };
    let hour: u32 = hour_text.parse().ok()?;
    let meridiem = parts.next()?;
    if parts.next().is_some() || !(1..=12).contains(&hour) {
        return None;
    }
    match (hour, meridiem) {
        (12, "AM" | "am") => Some(0),
        (h, "AM" | "am") => Some(h),
        (12, "PM" | "pm") => Some(12),
        (h, "PM" | "pm") => Some(h + 12),
        _ => None,
    }
}

/// Turbidity substitutions keyed by wall-clock hour.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(try_from = "HashMap<String, f64>")]
pub struct HourlyOverrides {
    by_hour: HashMap<u32, f64>,
}

impl TryFrom<HashMap<String, f64>> for HourlyOverrides {
    type Error = String;

    fn try_from(labels: HashMap<String, f64>) -> Result<Self, Self::Error> {
        let mut by_hour = HashMap::with_capacity(labels.len());
        for (label, value) in labels {
            let hour = parse_hour_label(&label)
                .ok_or_else(|| format!("invalid hour label {label:?} (expected e.g. \"1 PM\")"))?;
            by_hour.insert(hour, value);
        }
        Ok(Self { by_hour })
    }
}

impl HourlyOverrides {
    pub fn is_empty(&self) -> bool {
        self.by_hour.is_empty()
    }

    /// The substitute turbidity for a 24-hour clock hour, if any.
    pub fn get(&self, hour24: u32) -> Option<f64> {
        self.by_hour.get(&(hour24 % 24)).copied()
    }

    /// Return a render copy of the snapshot with substitutions applied.
    ///
    /// The current turbidity follows the snapshot's `target_hour`; the
    /// 1/2/3-hours-prior fields follow the correspondingly earlier hours,
    /// wrapping across midnight.
    pub fn patched(&self, snapshot: &LiveSnapshot) -> LiveSnapshot {
        let mut patched = snapshot.clone();
        if self.by_hour.is_empty() {
            return patched;
        }
        let Some(hour) = snapshot.target_hour.as_deref().and_then(parse_hour_label) else {
            return patched;
        };

        if let Some(v) = self.get(hour) {
            patched.turbidity = Some(v);
        }
        if let Some(v) = self.get((hour + 23) % 24) {
            patched.turbidity_1_hour_prior = Some(v);
        }
        if let Some(v) = self.get((hour + 22) % 24) {
            patched.turbidity_2_hours_prior = Some(v);
        }
        if let Some(v) = self.get((hour + 21) % 24) {
            patched.turbidity_3_hours_prior = Some(v);
        }
        patched
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn overrides(pairs: &[(&str, f64)]) -> HourlyOverrides {
        let map: HashMap<String, f64> =
            pairs.iter().map(|(l, v)| ((*l).to_owned(), *v)).collect();
        HourlyOverrides::try_from(map).expect("valid labels")
    }

    #[test]
    fn labels_round_trip() {
        for h in 0..24 {
            assert_eq!(parse_hour_label(&hour_label(h)), Some(h), "hour {h}");
        }
    }

    #[test]
    fn label_edges() {
        assert_eq!(hour_label(0), "12 AM");
        assert_eq!(hour_label(12), "12 PM");
        assert_eq!(hour_label(13), "1 PM");
        assert_eq!(hour_label(23), "11 PM");
        assert_eq!(parse_hour_label("12 AM"), Some(0));
        assert_eq!(parse_hour_label("bogus"), None);
        assert_eq!(parse_hour_label("13 PM"), None);
    }

    #[test]
    fn clock_style_labels_accepted() {
        // The backend writes target_hour as "H:00 AM/PM".
        assert_eq!(parse_hour_label("2:00 PM"), Some(14));
        assert_eq!(parse_hour_label("12:00 AM"), Some(0));
        assert_eq!(parse_hour_label("11:30 PM"), Some(23));
        assert_eq!(parse_hour_label("2:0 PM"), None);
        assert_eq!(parse_hour_label("2:xx PM"), None);
    }

    #[test]
    fn invalid_label_rejected_at_construction() {
        let mut map = HashMap::new();
        map.insert("25 o'clock".to_owned(), 1.0);
        assert!(HourlyOverrides::try_from(map).is_err());
    }

    #[test]
    fn substitutes_current_and_prior_hours() {
        let ov = overrides(&[("2 PM", 9.9), ("1 PM", 8.8), ("11 AM", 6.6)]);
        let snap = LiveSnapshot {
            turbidity: Some(0.5),
            turbidity_1_hour_prior: Some(0.4),
            turbidity_2_hours_prior: Some(0.3),
            turbidity_3_hours_prior: Some(0.2),
            target_hour: Some("2 PM".into()),
            ..LiveSnapshot::default()
        };

        let patched = ov.patched(&snap);

        assert_eq!(patched.turbidity, Some(9.9));
        assert_eq!(patched.turbidity_1_hour_prior, Some(8.8));
        // 12 PM not mapped -- scraped value stays.
        assert_eq!(patched.turbidity_2_hours_prior, Some(0.3));
        assert_eq!(patched.turbidity_3_hours_prior, Some(6.6));
        // Source snapshot untouched.
        assert_eq!(snap.turbidity, Some(0.5));
    }

    #[test]
    fn substitutes_against_backend_target_hour_labels() {
        let ov = overrides(&[("2 PM", 9.9)]);
        let snap = LiveSnapshot {
            turbidity: Some(0.5),
            target_hour: Some("2:00 PM".into()),
            ..LiveSnapshot::default()
        };

        let patched = ov.patched(&snap);

        assert_eq!(patched.turbidity, Some(9.9));
    }

    #[test]
    fn wraps_across_midnight() {
        let ov = overrides(&[("11 PM", 7.7), ("10 PM", 5.5)]);
        let snap = LiveSnapshot {
            target_hour: Some("1 AM".into()),
            ..LiveSnapshot::default()
        };

        let patched = ov.patched(&snap);

        // 1 AM minus 2 hours is 11 PM, minus 3 is 10 PM.
        assert_eq!(patched.turbidity, None);
        assert_eq!(patched.turbidity_1_hour_prior, None);
        assert_eq!(patched.turbidity_2_hours_prior, Some(7.7));
        assert_eq!(patched.turbidity_3_hours_prior, Some(5.5));
    }

    #[test]
    fn empty_map_and_missing_target_hour_are_no_ops() {
        let snap = LiveSnapshot {
            turbidity: Some(0.5),
            ..LiveSnapshot::default()
        };
        assert_eq!(HourlyOverrides::default().patched(&snap), snap);

        let ov = overrides(&[("2 PM", 9.9)]);
        assert_eq!(ov.patched(&snap), snap);
    }
}
