// Screen-data endpoints
//
// Live snapshot, history browsing, missing-hours scan, the two editable
// fields, and the bulk manual-entries backfill.

use serde::Deserialize;
use serde_json::json;
use url::Url;

use crate::client::ScreenClient;
use crate::error::Error;
use crate::models::{
    HistoryDay, LiveSnapshot, ManualEntriesResult, ManualEntry, MissingHoursReport,
};

/// PUT last-chlorine-tank-change echoes the canonical date (null when cleared).
#[derive(Deserialize)]
struct ChlorineDateResult {
    date: Option<String>,
}

/// PUT last-active-dosing echoes the canonical value string.
#[derive(Deserialize)]
struct DosingValueResult {
    value: String,
}

impl ScreenClient {
    /// Fetch the current live telemetry snapshot.
    pub async fn live(&self) -> Result<LiveSnapshot, Error> {
        let url = self.api_url("screen-data/live")?;
        self.get(url).await
    }

    /// Fetch hourly history rows grouped per day, newest first.
    ///
    /// Both bounds are ISO dates and the end bound is inclusive; a
    /// single-day view passes the same date twice.
    pub async fn history(
        &self,
        start_date: Option<&str>,
        end_date: Option<&str>,
    ) -> Result<Vec<HistoryDay>, Error> {
        let url = self.api_url("screen-data/history")?;
        let url = Self::with_date_range(url, start_date, end_date);
        self.get(url).await
    }

    /// Scan for hourly slots with neither a dam level nor a turbidity value.
    pub async fn missing_hours(
        &self,
        start_date: Option<&str>,
        end_date: Option<&str>,
    ) -> Result<MissingHoursReport, Error> {
        let url = self.api_url("screen-data/history/missing-hours")?;
        let url = Self::with_date_range(url, start_date, end_date);
        self.get(url).await
    }

    /// Update the last chlorine tank change date.
    ///
    /// `None` clears the stored date. The backend validates the ISO format
    /// and echoes the canonical value back.
    pub async fn put_chlorine_date(&self, date: Option<&str>) -> Result<Option<String>, Error> {
        let url = self.api_url("screen-data/last-chlorine-tank-change")?;
        let body = json!({ "date": date });
        let result: ChlorineDateResult = self.put(url, &body).await?;
        Ok(result.date)
    }

    /// Update the last active dosing value (canonical `"Mon-DD HH AM/PM"`).
    pub async fn put_last_active_dosing(&self, value: &str) -> Result<String, Error> {
        let url = self.api_url("screen-data/last-active-dosing")?;
        let body = json!({ "value": value });
        let result: DosingValueResult = self.put(url, &body).await?;
        Ok(result.value)
    }

    /// Upload a batch of manual backfill entries.
    ///
    /// The backend skips entries with no numeric field and rejects the
    /// whole batch on a malformed `slotDatetime`.
    pub async fn post_manual_entries(
        &self,
        entries: &[ManualEntry],
    ) -> Result<ManualEntriesResult, Error> {
        let url = self.api_url("screen-data/history/manual-entries")?;
        let body = json!({ "entries": entries });
        self.post(url, &body).await
    }

    fn with_date_range(mut url: Url, start_date: Option<&str>, end_date: Option<&str>) -> Url {
        if start_date.is_none() && end_date.is_none() {
            return url;
        }
        {
            let mut pairs = url.query_pairs_mut();
            if let Some(start) = start_date {
                pairs.append_pair("start_date", start);
            }
            if let Some(end) = end_date {
                pairs.append_pair("end_date", end);
            }
        }
        url
    }
}
