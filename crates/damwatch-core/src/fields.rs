//! The dashboard metric catalogue.
//!
//! Every card on the live dashboard is a `MetricField`: one enum carrying
//! the label, unit, and value accessor for each metric, so screens iterate
//! `MetricField::ALL` instead of dispatching on label strings.

use damwatch_api::LiveSnapshot;
use strum::Display;

use crate::fmt;

/// Measurement unit for numeric metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Unit {
    /// Nephelometric turbidity units.
    #[strum(serialize = "NTU")]
    Ntu,
    /// Metres of water.
    #[strum(serialize = "m")]
    Metres,
    /// Percent full.
    #[strum(serialize = "%")]
    Percent,
}

impl Unit {
    pub fn suffix(self) -> &'static str {
        match self {
            Self::Ntu => "NTU",
            Self::Metres => "m",
            Self::Percent => "%",
        }
    }
}

/// One metric on the live dashboard.
///
/// `Prior` variants carry how many hours back they look (1..=3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricField {
    Turbidity,
    TurbidityPrior(u8),
    DamLevel,
    DamLevelPrior(u8),
    OldResBigTankLevel,
    TankALevel,
    TankBLevel,
    TankCdLevel,
    OldResStatus,
    LastActiveDosing,
    TotalTreatmentHoursMonth,
    CurrentOperator,
    LastChlorineChange,
}

impl MetricField {
    /// Every dashboard metric in render order.
    pub const ALL: [Self; 17] = [
        Self::Turbidity,
        Self::TurbidityPrior(1),
        Self::TurbidityPrior(2),
        Self::TurbidityPrior(3),
        Self::DamLevel,
        Self::DamLevelPrior(1),
        Self::DamLevelPrior(2),
        Self::DamLevelPrior(3),
        Self::OldResBigTankLevel,
        Self::TankALevel,
        Self::TankBLevel,
        Self::TankCdLevel,
        Self::OldResStatus,
        Self::LastActiveDosing,
        Self::TotalTreatmentHoursMonth,
        Self::CurrentOperator,
        Self::LastChlorineChange,
    ];

    pub fn label(self) -> String {
        match self {
            Self::Turbidity => "Turbidity".into(),
            Self::TurbidityPrior(1) => "Turbidity (1 hr prior)".into(),
            Self::TurbidityPrior(n) => format!("Turbidity ({n} hrs prior)"),
            Self::DamLevel => "Dam Level".into(),
            Self::DamLevelPrior(1) => "Dam Level (1 hr prior)".into(),
            Self::DamLevelPrior(n) => format!("Dam Level ({n} hrs prior)"),
            Self::OldResBigTankLevel => "Old Res Big Tank".into(),
            Self::TankALevel => "Tank A".into(),
            Self::TankBLevel => "Tank B".into(),
            Self::TankCdLevel => "Tank C/D".into(),
            Self::OldResStatus => "Old Res Status".into(),
            Self::LastActiveDosing => "Last Active Dosing".into(),
            Self::TotalTreatmentHoursMonth => "Treatment Hours (month)".into(),
            Self::CurrentOperator => "Operator".into(),
            Self::LastChlorineChange => "Chlorine Tank Change".into(),
        }
    }

    /// Unit for numeric metrics, `None` for textual ones.
    pub fn unit(self) -> Option<Unit> {
        match self {
            Self::Turbidity | Self::TurbidityPrior(_) => Some(Unit::Ntu),
            Self::DamLevel | Self::DamLevelPrior(_) => Some(Unit::Metres),
            Self::OldResBigTankLevel | Self::TankALevel | Self::TankBLevel | Self::TankCdLevel => {
                Some(Unit::Percent)
            }
            _ => None,
        }
    }

    /// Raw numeric value from a snapshot, for numeric metrics.
    pub fn numeric_value(self, snapshot: &LiveSnapshot) -> Option<f64> {
        match self {
            Self::Turbidity => snapshot.turbidity,
            Self::TurbidityPrior(1) => snapshot.turbidity_1_hour_prior,
            Self::TurbidityPrior(2) => snapshot.turbidity_2_hours_prior,
            Self::TurbidityPrior(_) => snapshot.turbidity_3_hours_prior,
            Self::DamLevel => snapshot.current_dam_level,
            Self::DamLevelPrior(1) => snapshot.dam_level_1_hour_prior,
            Self::DamLevelPrior(2) => snapshot.dam_level_2_hours_prior,
            Self::DamLevelPrior(_) => snapshot.dam_level_3_hours_prior,
            Self::OldResBigTankLevel => snapshot.old_res_big_tank_level,
            Self::TankALevel => snapshot.tank_a_level,
            Self::TankBLevel => snapshot.tank_b_level,
            Self::TankCdLevel => snapshot.tank_cd_level,
            _ => None,
        }
    }

    /// Rendered value for this metric, `"--"` when absent.
    pub fn value_text(self, snapshot: &LiveSnapshot) -> String {
        if let Some(unit) = self.unit() {
            return fmt::format_metric(self.numeric_value(snapshot), unit);
        }
        match self {
            Self::OldResStatus => text_or_missing(snapshot.old_res_status.as_deref()),
            Self::LastActiveDosing => snapshot
                .last_active_dosing
                .as_deref()
                .map_or_else(|| fmt::MISSING.to_owned(), fmt::format_month_day_with_time),
            Self::TotalTreatmentHoursMonth => {
                text_or_missing(snapshot.total_treatment_hours_month.as_deref())
            }
            Self::CurrentOperator => snapshot
                .current_operator
                .as_deref()
                .map_or_else(|| fmt::MISSING.to_owned(), fmt::compact_operator),
            Self::LastChlorineChange => snapshot
                .reserved_metric
                .as_deref()
                .map_or_else(|| fmt::MISSING.to_owned(), fmt::format_month_day),
            _ => fmt::MISSING.to_owned(),
        }
    }

    /// Whether this metric has an edit flow.
    pub fn is_editable(self) -> bool {
        matches!(self, Self::LastChlorineChange | Self::LastActiveDosing)
    }
}

fn text_or_missing(value: Option<&str>) -> String {
    match value {
        Some(s) if !s.trim().is_empty() => s.to_owned(),
        _ => fmt::MISSING.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn snapshot() -> LiveSnapshot {
        LiveSnapshot {
            turbidity: Some(0.52),
            turbidity_2_hours_prior: Some(0.48),
            current_dam_level: Some(12.345),
            tank_a_level: Some(86.0),
            old_res_status: Some("FILLING".into()),
            last_active_dosing: Some("Mar-07 02 PM".into()),
            current_operator: Some("john smith".into()),
            reserved_metric: Some("2024-03-01".into()),
            ..LiveSnapshot::default()
        }
    }

    #[test]
    fn numeric_fields_use_unit_formatting() {
        let snap = snapshot();
        assert_eq!(MetricField::Turbidity.value_text(&snap), "0.52 NTU");
        assert_eq!(MetricField::DamLevel.value_text(&snap), "12.35 m");
        assert_eq!(MetricField::TankALevel.value_text(&snap), "86.00 %");
        assert_eq!(MetricField::TurbidityPrior(2).value_text(&snap), "0.48 NTU");
        assert_eq!(MetricField::TurbidityPrior(1).value_text(&snap), "--");
    }

    #[test]
    fn textual_fields_formatted() {
        let snap = snapshot();
        assert_eq!(MetricField::OldResStatus.value_text(&snap), "FILLING");
        assert_eq!(MetricField::CurrentOperator.value_text(&snap), "J.Smith");
        assert_eq!(MetricField::LastChlorineChange.value_text(&snap), "Mar 1");
        assert_eq!(
            MetricField::LastActiveDosing.value_text(&snap),
            "Mar-07 02 PM"
        );
    }

    #[test]
    fn empty_snapshot_is_all_missing() {
        let snap = LiveSnapshot::default();
        for field in MetricField::ALL {
            assert_eq!(field.value_text(&snap), "--", "{}", field.label());
        }
    }

    #[test]
    fn only_the_two_editors_are_editable() {
        let editable: Vec<_> = MetricField::ALL
            .into_iter()
            .filter(|f| f.is_editable())
            .collect();
        assert_eq!(
            editable,
            vec![MetricField::LastActiveDosing, MetricField::LastChlorineChange]
        );
    }
}
