// damwatch-api: Async Rust client for the screen-data telemetry backend.

pub mod auth;
pub mod client;
pub mod error;
pub mod models;
pub mod screen_data;
pub mod transport;

pub use client::ScreenClient;
pub use error::Error;
pub use models::{
    HistoryDay, HistoryEntry, LiveSnapshot, ManualEntry, ManualEntriesResult, MissingHoursReport,
    SectionCapability, SessionUser,
};
pub use transport::TransportConfig;
