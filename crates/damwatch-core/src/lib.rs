// damwatch-core: Reactive data layer between damwatch-api and consumers.

pub mod chlorine;
pub mod config;
pub mod controller;
pub mod dosing;
pub mod error;
pub mod fields;
pub mod fmt;
pub mod overrides;

// ── Primary re-exports ──────────────────────────────────────────────
pub use chlorine::ChlorineCycleStatus;
pub use config::{ControllerConfig, SessionCredentials};
pub use controller::{ManualEntryDraft, ScreenController, SessionState};
pub use dosing::{DosingDraft, Meridiem};
pub use error::CoreError;
pub use fields::{MetricField, Unit};
pub use overrides::HourlyOverrides;

// Re-export the wire types consumers render directly.
pub use damwatch_api::{
    HistoryDay, HistoryEntry, LiveSnapshot, ManualEntriesResult, ManualEntry, MissingHoursReport,
    SessionUser,
};
