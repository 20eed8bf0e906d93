// Wire models for the screen-data backend.
//
// The backend emits snake_case for the live snapshot and camelCase for the
// history/session payloads. Decoding is tolerant: every field defaults so a
// partially-scraped snapshot still parses.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Per-section capability flags carried in the session payload.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct SectionCapability {
    #[serde(default)]
    pub view: bool,
    #[serde(default)]
    pub edit: bool,
}

/// Authenticated user as returned by `/api/auth/me` and login.
///
/// `section_access` is absent on deployments that don't run the permission
/// layer; callers treat absence as "no gating".
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct SessionUser {
    pub username: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(rename = "sectionAccess", default)]
    pub section_access: Option<HashMap<String, SectionCapability>>,
}

impl SessionUser {
    /// Whether this user may edit the given section.
    ///
    /// No capability map at all means the deployment doesn't gate edits.
    pub fn can_edit(&self, section: &str) -> bool {
        match &self.section_access {
            None => true,
            Some(map) => map.get(section).is_some_and(|cap| cap.edit),
        }
    }
}

/// One full poll of the live telemetry endpoint.
///
/// Replaced wholesale on every fetch; all fields are nullable because the
/// upstream scrape can fail per-metric.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct LiveSnapshot {
    #[serde(default)]
    pub turbidity: Option<f64>,
    #[serde(default)]
    pub turbidity_1_hour_prior: Option<f64>,
    #[serde(default)]
    pub turbidity_2_hours_prior: Option<f64>,
    #[serde(default)]
    pub turbidity_3_hours_prior: Option<f64>,
    #[serde(default)]
    pub current_dam_level: Option<f64>,
    #[serde(default)]
    pub dam_level_1_hour_prior: Option<f64>,
    #[serde(default)]
    pub dam_level_2_hours_prior: Option<f64>,
    #[serde(default)]
    pub dam_level_3_hours_prior: Option<f64>,
    #[serde(default)]
    pub old_res_big_tank_level: Option<f64>,
    #[serde(default)]
    pub tank_a_level: Option<f64>,
    #[serde(default)]
    pub tank_b_level: Option<f64>,
    #[serde(default)]
    pub tank_cd_level: Option<f64>,
    #[serde(default)]
    pub old_res_status: Option<String>,
    #[serde(default)]
    pub last_active_dosing: Option<String>,
    #[serde(default)]
    pub total_treatment_hours_month: Option<String>,
    #[serde(default)]
    pub current_operator: Option<String>,
    /// Last chlorine tank change date (ISO), kept under its scraped name.
    #[serde(default)]
    pub reserved_metric: Option<String>,
    /// 12-hour label of the telemetry hour this snapshot describes, e.g. `"2 PM"`.
    #[serde(default)]
    pub target_hour: Option<String>,
    #[serde(default)]
    pub fetched_at: Option<String>,
    #[serde(default)]
    pub scrape_error: Option<String>,
}

/// One hourly history row.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub slot_datetime: String,
    pub date: String,
    pub time: String,
    #[serde(default)]
    pub dam_level: Option<f64>,
    #[serde(default)]
    pub turbidity: Option<f64>,
}

/// History rows grouped per calendar day, newest day first.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct HistoryDay {
    pub date: String,
    pub entries: Vec<HistoryEntry>,
}

/// Result of a missing-hours scan: hourly slots where both dam level and
/// turbidity are absent, grouped per day like history rows.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MissingHoursReport {
    #[serde(default)]
    pub total_missing_hours: u32,
    #[serde(default)]
    pub groups: Vec<HistoryDay>,
}

/// One backfill row for the bulk manual-entries upload.
///
/// Fields left `None` are omitted from the payload; the backend skips
/// entries that carry no numeric value at all.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ManualEntry {
    pub slot_datetime: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dam_level: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub turbidity: Option<f64>,
}

/// Backend acknowledgement of a bulk manual-entries upload.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ManualEntriesResult {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub saved_count: u32,
}
