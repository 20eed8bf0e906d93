//! All possible UI actions. Actions are the sole mechanism for state mutation.

use std::fmt;
use std::sync::Arc;

use damwatch_core::{HistoryDay, LiveSnapshot, MissingHoursReport, SessionState};

use crate::screen::ScreenId;

/// Notification severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// A toast notification.
#[derive(Debug, Clone)]
pub struct Notification {
    pub message: String,
    pub level: NotificationLevel,
}

impl Notification {
    pub fn success(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
            level: NotificationLevel::Success,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
            level: NotificationLevel::Error,
        }
    }

    pub fn warning(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
            level: NotificationLevel::Warning,
        }
    }

    pub fn info(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
            level: NotificationLevel::Info,
        }
    }
}

/// Pending confirmation action.
#[derive(Debug, Clone)]
pub enum ConfirmAction {
    /// Bulk-upload backfill entries for missing history slots.
    SubmitBackfill { count: usize },
}

impl fmt::Display for ConfirmAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SubmitBackfill { count: 1 } => write!(f, "Save 1 backfill entry?"),
            Self::SubmitBackfill { count } => write!(f, "Save {count} backfill entries?"),
        }
    }
}

/// Every state transition in the TUI is expressed as an Action.
#[derive(Debug, Clone)]
pub enum Action {
    // ── Lifecycle ──────────────────────────────────────────────────
    Quit,
    Tick,
    Render,
    Resize(u16, u16),

    // ── Navigation ────────────────────────────────────────────────
    SwitchScreen(ScreenId),
    GoBack,
    ToggleHelp,
    ToggleTvMode,

    // ── Session & data (from the data bridge) ─────────────────────
    SessionChanged(SessionState),
    SnapshotUpdated(Arc<LiveSnapshot>),
    PollError(Option<String>),

    // ── Session commands ──────────────────────────────────────────
    Logout,
    RefreshNow,
    /// Login attempt rejected; carries the server's message.
    LoginFailed(String),

    // ── Dashboard editors ─────────────────────────────────────────
    /// A field save succeeded; closes the open editor.
    EditSaved(String),
    /// A field save failed; the editor stays open with the error inline.
    EditFailed(String),

    // ── History screen ────────────────────────────────────────────
    HistoryLoaded(Arc<Vec<HistoryDay>>),
    /// A history reload failed; previously loaded rows stay on screen.
    HistoryLoadFailed(String),
    MissingHoursLoaded(Arc<MissingHoursReport>),
    /// The user confirmed the backfill dialog; the history screen uploads.
    BackfillConfirmed,
    BackfillSaved(u32),
    BackfillFailed(String),

    // ── Confirm Dialog ────────────────────────────────────────────
    ShowConfirm(ConfirmAction),
    ConfirmYes,
    ConfirmNo,

    // ── Notifications ─────────────────────────────────────────────
    Notify(Notification),
    DismissNotification,
}
