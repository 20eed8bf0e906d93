//! Historical data browser — day tables, the missing-hours scan, and the
//! backfill form.
//!
//! The backfill upload is gated by the app-level confirm dialog: Enter on
//! the form emits `ShowConfirm`, the app sends `BackfillConfirmed` on a
//! yes, and only then does the POST go out. After a successful upload the
//! scan and the table are both reloaded; nothing is patched optimistically.

use std::sync::Arc;

use chrono::Local;
use color_eyre::eyre::Result;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Paragraph};
use tokio::sync::mpsc::UnboundedSender;
use tui_input::Input;
use tui_input::backend::crossterm::EventHandler;

use damwatch_core::{
    HistoryDay, ManualEntryDraft, MissingHoursReport, ScreenController, SessionState, Unit,
    controller::collect_valid_entries, fmt,
};

use crate::action::{Action, ConfirmAction, Notification};
use crate::component::Component;
use crate::theme;

/// One row of the backfill form.
struct BackfillRow {
    slot_datetime: String,
    time_label: String,
    dam_level: Input,
    turbidity: Input,
}

/// Which column of the backfill form has focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BackfillCol {
    DamLevel,
    Turbidity,
}

enum Mode {
    Browse,
    /// Editing the single-day filter.
    DateInput,
    /// Filling backfill drafts for missing slots.
    Backfill,
}

pub struct HistoryScreen {
    controller: ScreenController,
    action_tx: Option<UnboundedSender<Action>>,
    mode: Mode,

    day_input: Input,
    /// Active single-day filter; `None` means the backend's full range.
    filter: Option<String>,
    days: Arc<Vec<HistoryDay>>,
    loading: bool,

    missing: Option<Arc<MissingHoursReport>>,
    scanning: bool,

    rows: Vec<BackfillRow>,
    selected_row: usize,
    selected_col: BackfillCol,
    form_error: Option<String>,
    submitting: bool,

    scroll: u16,
    throbber_state: throbber_widgets_tui::ThrobberState,
}

impl HistoryScreen {
    pub fn new(controller: ScreenController) -> Self {
        Self {
            controller,
            action_tx: None,
            mode: Mode::Browse,
            day_input: Input::new(Local::now().date_naive().format("%Y-%m-%d").to_string()),
            filter: None,
            days: Arc::new(Vec::new()),
            loading: false,
            missing: None,
            scanning: false,
            rows: Vec::new(),
            selected_row: 0,
            selected_col: BackfillCol::DamLevel,
            form_error: None,
            submitting: false,
            scroll: 0,
            throbber_state: throbber_widgets_tui::ThrobberState::default(),
        }
    }

    fn spawn_load(&mut self) {
        self.loading = true;
        let day = self.filter.clone();
        let controller = self.controller.clone();
        let Some(tx) = self.action_tx.clone() else {
            return;
        };
        tokio::spawn(async move {
            match controller.history(day.as_deref()).await {
                Ok(days) => {
                    let _ = tx.send(Action::HistoryLoaded(Arc::new(days)));
                }
                Err(e) => {
                    let _ = tx.send(Action::HistoryLoadFailed(e.to_string()));
                }
            }
        });
    }

    fn spawn_scan(&mut self) {
        self.scanning = true;
        let controller = self.controller.clone();
        let Some(tx) = self.action_tx.clone() else {
            return;
        };
        tokio::spawn(async move {
            match controller.missing_hours().await {
                Ok(report) => {
                    let _ = tx.send(Action::MissingHoursLoaded(Arc::new(report)));
                }
                Err(e) => {
                    let _ = tx.send(Action::Notify(Notification::error(format!(
                        "Missing-hours scan failed: {e}"
                    ))));
                }
            }
        });
    }

    /// Build the backfill form from the last scan.
    fn open_backfill(&mut self) {
        let Some(report) = self.missing.as_ref() else {
            if let Some(tx) = &self.action_tx {
                let _ = tx.send(Action::Notify(Notification::info(
                    "Run a missing-hours scan first (m)",
                )));
            }
            return;
        };
        if report.total_missing_hours == 0 {
            if let Some(tx) = &self.action_tx {
                let _ = tx.send(Action::Notify(Notification::success("No missing hours")));
            }
            return;
        }

        self.rows = report
            .groups
            .iter()
            .flat_map(|day| {
                day.entries.iter().map(|entry| BackfillRow {
                    slot_datetime: entry.slot_datetime.clone(),
                    time_label: format!("{} {}", entry.date, entry.time),
                    dam_level: Input::default(),
                    turbidity: Input::default(),
                })
            })
            .collect();
        self.selected_row = 0;
        self.selected_col = BackfillCol::DamLevel;
        self.form_error = None;
        self.mode = Mode::Backfill;
    }

    fn drafts(&self) -> Vec<ManualEntryDraft> {
        self.rows
            .iter()
            .map(|row| ManualEntryDraft {
                slot_datetime: row.slot_datetime.clone(),
                dam_level: row.dam_level.value().to_owned(),
                turbidity: row.turbidity.value().to_owned(),
            })
            .collect()
    }

    /// Validate the form; request confirmation when something is uploadable.
    fn request_submit(&mut self) -> Option<Action> {
        let entries = collect_valid_entries(&self.drafts());
        if entries.is_empty() {
            self.form_error = Some("Enter at least one numeric value before saving".into());
            return None;
        }
        self.form_error = None;
        Some(Action::ShowConfirm(ConfirmAction::SubmitBackfill {
            count: entries.len(),
        }))
    }

    fn spawn_submit(&mut self) {
        self.submitting = true;
        let drafts = self.drafts();
        let controller = self.controller.clone();
        let Some(tx) = self.action_tx.clone() else {
            return;
        };
        tokio::spawn(async move {
            match controller.submit_manual_entries(&drafts).await {
                Ok(result) => {
                    let _ = tx.send(Action::BackfillSaved(result.saved_count));
                }
                Err(e) => {
                    let _ = tx.send(Action::BackfillFailed(e.to_string()));
                }
            }
        });
    }

    fn handle_browse_key(&mut self, key: KeyEvent) -> Option<Action> {
        match key.code {
            KeyCode::Char('f') => {
                self.mode = Mode::DateInput;
            }
            KeyCode::Char('a') => {
                if self.filter.take().is_some() {
                    self.spawn_load();
                }
            }
            KeyCode::Char('m') => {
                if !self.scanning {
                    self.spawn_scan();
                }
            }
            KeyCode::Char('b') => {
                if self.controller.can_edit() {
                    self.open_backfill();
                } else {
                    return Some(Action::Notify(Notification::warning(
                        "This account is read-only",
                    )));
                }
            }
            KeyCode::Char('j') | KeyCode::Down => {
                self.scroll = self.scroll.saturating_add(1);
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.scroll = self.scroll.saturating_sub(1);
            }
            KeyCode::Char('g') => {
                self.scroll = 0;
            }
            _ => {}
        }
        None
    }

    fn handle_date_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => {
                self.mode = Mode::Browse;
            }
            KeyCode::Enter => {
                let day = self.day_input.value().trim().to_owned();
                if chrono::NaiveDate::parse_from_str(&day, "%Y-%m-%d").is_ok() {
                    self.filter = Some(day);
                    self.scroll = 0;
                    self.mode = Mode::Browse;
                    self.spawn_load();
                } else if let Some(tx) = &self.action_tx {
                    let _ = tx.send(Action::Notify(Notification::error(
                        "Enter a date as YYYY-MM-DD",
                    )));
                }
            }
            _ => {
                self.day_input.handle_event(&crossterm::event::Event::Key(key));
            }
        }
    }

    fn handle_backfill_key(&mut self, key: KeyEvent) -> Option<Action> {
        if self.submitting {
            return None;
        }
        match key.code {
            KeyCode::Esc => {
                self.mode = Mode::Browse;
                self.rows.clear();
                self.form_error = None;
            }
            KeyCode::Enter => return self.request_submit(),
            KeyCode::Tab => {
                self.selected_col = match self.selected_col {
                    BackfillCol::DamLevel => BackfillCol::Turbidity,
                    BackfillCol::Turbidity => BackfillCol::DamLevel,
                };
            }
            KeyCode::Down => {
                if self.selected_row + 1 < self.rows.len() {
                    self.selected_row += 1;
                }
            }
            KeyCode::Up => {
                self.selected_row = self.selected_row.saturating_sub(1);
            }
            _ => {
                if let Some(row) = self.rows.get_mut(self.selected_row) {
                    let input = match self.selected_col {
                        BackfillCol::DamLevel => &mut row.dam_level,
                        BackfillCol::Turbidity => &mut row.turbidity,
                    };
                    input.handle_event(&crossterm::event::Event::Key(key));
                    self.form_error = None;
                }
            }
        }
        None
    }

    // ── Render methods ──────────────────────────────────────────────

    fn render_header(&self, frame: &mut Frame, area: Rect) {
        let filter_text = match &self.filter {
            Some(day) => format!("  {day}"),
            None => "  all days".into(),
        };
        let mut spans = vec![
            Span::styled(" History", theme::title_style()),
            Span::styled(filter_text, theme::key_hint()),
        ];
        if let Mode::DateInput = self.mode {
            spans.push(Span::styled("   day: ", theme::card_label()));
            spans.push(Span::styled(
                format!("{}\u{2588}", self.day_input.value()),
                Style::default().fg(theme::SKY_CYAN),
            ));
            spans.push(Span::styled("  Enter apply  Esc cancel", theme::key_hint()));
        }
        frame.render_widget(Paragraph::new(Line::from(spans)), area);
    }

    fn render_scan_summary(&self, frame: &mut Frame, area: Rect) {
        if self.scanning {
            let throbber = throbber_widgets_tui::Throbber::default()
                .label(" Scanning for missing hours...")
                .style(Style::default().fg(theme::SKY_CYAN))
                .throbber_style(Style::default().fg(theme::DEEP_TEAL));
            frame.render_stateful_widget(throbber, area, &mut self.throbber_state.clone());
            return;
        }
        if let Some(report) = &self.missing {
            let (text, color) = if report.total_missing_hours == 0 {
                (" ✓ no missing hours".to_owned(), theme::OK_GREEN)
            } else {
                (
                    format!(
                        " ⚠ {} missing hours across {} days — b to backfill",
                        report.total_missing_hours,
                        report.groups.len()
                    ),
                    theme::WARN_AMBER,
                )
            };
            frame.render_widget(
                Paragraph::new(Span::styled(text, Style::default().fg(color))),
                area,
            );
        }
    }

    fn render_table(&self, frame: &mut Frame, area: Rect) {
        if self.loading {
            let throbber = throbber_widgets_tui::Throbber::default()
                .label(" Loading history...")
                .style(Style::default().fg(theme::SKY_CYAN))
                .throbber_style(Style::default().fg(theme::DEEP_TEAL));
            frame.render_stateful_widget(throbber, area, &mut self.throbber_state.clone());
            return;
        }
        if self.days.is_empty() {
            frame.render_widget(
                Paragraph::new(Span::styled(
                    " No rows. f filters by day, m scans for gaps.",
                    theme::key_hint(),
                )),
                area,
            );
            return;
        }

        let mut lines = Vec::new();
        for day in self.days.iter() {
            lines.push(Line::from(Span::styled(
                format!(" {}", day.date),
                theme::title_style(),
            )));
            lines.push(Line::from(Span::styled(
                format!(" {:<10} {:>14} {:>14}", "Time", "Dam Level", "Turbidity"),
                theme::table_header(),
            )));
            for entry in &day.entries {
                lines.push(Line::from(Span::styled(
                    format!(
                        " {:<10} {:>14} {:>14}",
                        entry.time,
                        fmt::format_metric(entry.dam_level, Unit::Metres),
                        fmt::format_metric(entry.turbidity, Unit::Ntu),
                    ),
                    theme::table_row(),
                )));
            }
            lines.push(Line::from(""));
        }

        frame.render_widget(Paragraph::new(lines).scroll((self.scroll, 0)), area);
    }

    fn render_backfill(&self, frame: &mut Frame, area: Rect) {
        let width = 64u16.min(area.width.saturating_sub(4));
        let height = area.height.saturating_sub(4).clamp(8, 24);
        let x = (area.width.saturating_sub(width)) / 2;
        let y = (area.height.saturating_sub(height)) / 2;
        let dialog = Rect::new(area.x + x, area.y + y, width, height);

        frame.render_widget(
            Block::default().style(Style::default().bg(theme::BG_DARK)),
            dialog,
        );

        let block = Block::default()
            .title(" Backfill Missing Hours ")
            .title_style(theme::title_style())
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(theme::border_focused());
        let inner = block.inner(dialog);
        frame.render_widget(block, dialog);

        let layout = Layout::vertical([
            Constraint::Length(1), // column headers
            Constraint::Min(1),    // rows
            Constraint::Length(1), // error / throbber
            Constraint::Length(1), // hints
        ])
        .split(inner);

        frame.render_widget(
            Paragraph::new(Span::styled(
                format!(" {:<18} {:>14} {:>14}", "Slot", "Dam Level", "Turbidity"),
                theme::table_header(),
            )),
            layout[0],
        );

        // Keep the selected row visible.
        let visible = usize::from(layout[1].height);
        let first = self
            .selected_row
            .saturating_sub(visible.saturating_sub(1));
        let cell = |input: &Input, active: bool| {
            let text = if active {
                format!("{}\u{2588}", input.value())
            } else if input.value().is_empty() {
                "·".to_owned()
            } else {
                input.value().to_owned()
            };
            (text, active)
        };

        let mut lines = Vec::new();
        for (i, row) in self.rows.iter().enumerate().skip(first).take(visible) {
            let row_active = i == self.selected_row;
            let (dam, dam_active) =
                cell(&row.dam_level, row_active && self.selected_col == BackfillCol::DamLevel);
            let (turb, turb_active) =
                cell(&row.turbidity, row_active && self.selected_col == BackfillCol::Turbidity);

            let style_for = |active: bool| {
                if active {
                    Style::default()
                        .fg(theme::SKY_CYAN)
                        .add_modifier(Modifier::BOLD)
                } else if row_active {
                    theme::table_selected()
                } else {
                    theme::table_row()
                }
            };

            lines.push(Line::from(vec![
                Span::styled(
                    format!(" {:<18}", row.time_label),
                    if row_active {
                        theme::table_selected()
                    } else {
                        theme::table_row()
                    },
                ),
                Span::styled(format!(" {dam:>14}"), style_for(dam_active)),
                Span::styled(format!(" {turb:>14}"), style_for(turb_active)),
            ]));
        }
        frame.render_widget(Paragraph::new(lines), layout[1]);

        if self.submitting {
            let throbber = throbber_widgets_tui::Throbber::default()
                .label(" Uploading...")
                .style(Style::default().fg(theme::SKY_CYAN))
                .throbber_style(Style::default().fg(theme::DEEP_TEAL));
            frame.render_stateful_widget(throbber, layout[2], &mut self.throbber_state.clone());
        } else if let Some(ref err) = self.form_error {
            frame.render_widget(
                Paragraph::new(Span::styled(
                    format!(" {err}"),
                    Style::default().fg(theme::ALERT_RED),
                )),
                layout[2],
            );
        }

        frame.render_widget(
            Paragraph::new(Span::styled(
                " ↑/↓ row  Tab column  Enter save  Esc cancel",
                theme::key_hint(),
            )),
            layout[3],
        );
    }
}

impl Component for HistoryScreen {
    fn init(&mut self, action_tx: UnboundedSender<Action>) -> Result<()> {
        self.action_tx = Some(action_tx);
        Ok(())
    }

    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        let follow_up = match self.mode {
            Mode::Browse => self.handle_browse_key(key),
            Mode::DateInput => {
                self.handle_date_key(key);
                None
            }
            Mode::Backfill => self.handle_backfill_key(key),
        };
        Ok(follow_up)
    }

    fn update(&mut self, action: &Action) -> Result<Option<Action>> {
        match action {
            Action::HistoryLoaded(days) => {
                self.loading = false;
                self.days = Arc::clone(days);
            }
            Action::HistoryLoadFailed(msg) => {
                // Stale rows stay on screen; only the spinner clears.
                self.loading = false;
                return Ok(Some(Action::Notify(Notification::error(format!(
                    "History load failed: {msg}"
                )))));
            }
            Action::MissingHoursLoaded(report) => {
                self.scanning = false;
                self.missing = Some(Arc::clone(report));
            }
            Action::BackfillConfirmed => {
                if matches!(self.mode, Mode::Backfill) {
                    self.spawn_submit();
                }
            }
            Action::BackfillSaved(count) => {
                self.submitting = false;
                self.mode = Mode::Browse;
                self.rows.clear();
                // Re-scan and reload; the backend is the source of truth.
                self.spawn_scan();
                self.spawn_load();
                return Ok(Some(Action::Notify(Notification::success(format!(
                    "Saved {count} entries"
                )))));
            }
            Action::BackfillFailed(msg) => {
                self.submitting = false;
                self.form_error = Some(msg.clone());
            }
            Action::SessionChanged(state) => match state {
                SessionState::SignedIn(_) => self.spawn_load(),
                _ => {
                    self.days = Arc::new(Vec::new());
                    self.missing = None;
                    self.rows.clear();
                    self.mode = Mode::Browse;
                    self.filter = None;
                    self.scroll = 0;
                }
            },
            Action::Tick => {
                if self.loading || self.scanning || self.submitting {
                    self.throbber_state.calc_next();
                }
            }
            _ => {}
        }
        Ok(None)
    }

    fn render(&self, frame: &mut Frame, area: Rect) {
        let layout = Layout::vertical([
            Constraint::Length(1), // header
            Constraint::Length(1), // scan summary
            Constraint::Min(1),    // table
        ])
        .split(area);

        self.render_header(frame, layout[0]);
        self.render_scan_summary(frame, layout[1]);
        self.render_table(frame, layout[2]);

        if matches!(self.mode, Mode::Backfill) {
            self.render_backfill(frame, area);
        }
    }

    fn capturing(&self) -> bool {
        matches!(self.mode, Mode::DateInput | Mode::Backfill)
    }

    fn id(&self) -> &str {
        "history"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use damwatch_core::ControllerConfig;

    fn screen() -> HistoryScreen {
        let controller = ScreenController::new(ControllerConfig::default()).expect("controller");
        HistoryScreen::new(controller)
    }

    fn day(date: &str) -> HistoryDay {
        HistoryDay {
            date: date.to_owned(),
            entries: Vec::new(),
        }
    }

    #[test]
    fn failed_reload_keeps_previous_rows() {
        let mut screen = screen();
        screen
            .update(&Action::HistoryLoaded(Arc::new(vec![day("2024-03-06")])))
            .expect("loaded");
        screen.loading = true;

        let follow_up = screen
            .update(&Action::HistoryLoadFailed("connection reset".to_owned()))
            .expect("load failure");

        assert!(!screen.loading);
        assert_eq!(screen.days.len(), 1);
        assert_eq!(screen.days[0].date, "2024-03-06");
        assert!(matches!(follow_up, Some(Action::Notify(_))));
    }
}
