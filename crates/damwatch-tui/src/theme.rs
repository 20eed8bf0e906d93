//! Reservoir palette and semantic styling for the TUI.

use damwatch_core::ChlorineCycleStatus;
use ratatui::style::{Color, Modifier, Style};

// ── Core Palette ──────────────────────────────────────────────────────

pub const DEEP_TEAL: Color = Color::Rgb(38, 166, 154); // #26a69a
pub const SKY_CYAN: Color = Color::Rgb(129, 212, 250); // #81d4fa
pub const SAND: Color = Color::Rgb(255, 213, 128); // #ffd580
pub const WARN_AMBER: Color = Color::Rgb(255, 183, 77); // #ffb74d
pub const OK_GREEN: Color = Color::Rgb(129, 199, 132); // #81c784
pub const ALERT_RED: Color = Color::Rgb(239, 108, 99); // #ef6c63

// ── Extended Palette ──────────────────────────────────────────────────

pub const DIM_WHITE: Color = Color::Rgb(197, 203, 212); // #c5cbd4
pub const BORDER_SLATE: Color = Color::Rgb(84, 110, 122); // #546e7a
pub const BG_HIGHLIGHT: Color = Color::Rgb(38, 50, 56); // #263238
pub const BG_DARK: Color = Color::Rgb(23, 32, 38); // #172026

// ── Semantic Styles ───────────────────────────────────────────────────

/// Title text for blocks/panels.
pub fn title_style() -> Style {
    Style::default().fg(SKY_CYAN).add_modifier(Modifier::BOLD)
}

/// Border for a focused panel.
pub fn border_focused() -> Style {
    Style::default().fg(DEEP_TEAL)
}

/// Border for an unfocused panel.
pub fn border_default() -> Style {
    Style::default().fg(BORDER_SLATE)
}

/// Metric card label (the small caption above the value).
pub fn card_label() -> Style {
    Style::default().fg(BORDER_SLATE)
}

/// Metric card value.
pub fn card_value() -> Style {
    Style::default().fg(DIM_WHITE).add_modifier(Modifier::BOLD)
}

/// Table header row.
pub fn table_header() -> Style {
    Style::default()
        .fg(SKY_CYAN)
        .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
}

/// Normal table row text.
pub fn table_row() -> Style {
    Style::default().fg(DIM_WHITE)
}

/// Selected / highlighted table row.
pub fn table_selected() -> Style {
    Style::default()
        .fg(DEEP_TEAL)
        .bg(BG_HIGHLIGHT)
        .add_modifier(Modifier::BOLD)
}

/// Active tab in the tab bar.
pub fn tab_active() -> Style {
    Style::default().fg(DEEP_TEAL).add_modifier(Modifier::BOLD)
}

/// Inactive tab in the tab bar.
pub fn tab_inactive() -> Style {
    Style::default().fg(DIM_WHITE)
}

/// Key hint text (e.g., "q quit  ? help").
pub fn key_hint() -> Style {
    Style::default().fg(BORDER_SLATE)
}

/// Key hint key character.
pub fn key_hint_key() -> Style {
    Style::default().fg(SKY_CYAN).add_modifier(Modifier::BOLD)
}

/// Tone color for a chlorine cycle status badge.
pub fn chlorine_tone(status: ChlorineCycleStatus) -> Color {
    match status {
        ChlorineCycleStatus::Normal => OK_GREEN,
        ChlorineCycleStatus::Warning => WARN_AMBER,
        ChlorineCycleStatus::Critical => ALERT_RED,
        ChlorineCycleStatus::Unknown => BORDER_SLATE,
    }
}
